/// egui rendering: side/top panels, tables and charts.
pub mod panels;
pub mod plot;
