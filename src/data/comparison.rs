use std::collections::BTreeSet;
use std::fmt;

use super::filter::all_course_rows;
use super::model::{
    occupancy_label, round_one_decimal, CourseId, Dataset, HistoricalRecord, PredictionRecord,
};
use crate::error::ViewError;
use crate::selection::SelectionSet;

/// Shown instead of values that have no forecast.
pub const FORECAST_PLACEHOLDER: &str = "Previsão";

// ---------------------------------------------------------------------------
// Metric – the column being compared
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// `colocados` / `colocados_previsto`
    Placed,
    /// `nota_ultimo_colocado` / `nota_ultimo_colocado_prevista`
    Grade,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Placed, Metric::Grade];

    pub fn historical(self, record: &HistoricalRecord) -> f64 {
        match self {
            Metric::Placed => record.placed as f64,
            Metric::Grade => record.last_grade,
        }
    }

    pub fn predicted(self, prediction: &PredictionRecord) -> f64 {
        match self {
            Metric::Placed => prediction.predicted_placed,
            Metric::Grade => prediction.predicted_grade,
        }
    }

    pub fn chart_title(self) -> &'static str {
        match self {
            Metric::Placed => "Evolução do Número de Colocados",
            Metric::Grade => "Evolução da Nota do Último Colocado",
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            Metric::Placed => "Número de Colocados",
            Metric::Grade => "Nota",
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison chart
// ---------------------------------------------------------------------------

/// One course's line in the comparison chart.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseSeries {
    pub course_id: CourseId,
    pub name: String,
    /// Position among the drawn courses; selects the palette colour.
    /// Forecast segments reuse their course's colour and take no palette slot.
    pub draw_index: usize,
    /// (year, value), ascending by year.
    pub points: Vec<[f64; 2]>,
    /// From the last historical point to (forecast year, predicted value).
    pub forecast: Option<[[f64; 2]; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonChart {
    pub metric: Metric,
    pub series: Vec<CourseSeries>,
    pub forecast_year: i32,
}

impl ComparisonChart {
    /// One series per selected course, in selection order. Courses without
    /// historical rows are skipped.
    pub fn build(
        dataset: &Dataset,
        selection: &SelectionSet,
        metric: Metric,
        forecast_year: i32,
    ) -> Result<Self, ViewError> {
        if selection.is_empty() {
            return Err(ViewError::EmptyComparison);
        }

        let mut series = Vec::with_capacity(selection.len());
        for course_id in selection.iter() {
            let rows = all_course_rows(dataset, course_id);
            let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
                log::warn!("Course {course_id} is selected but has no historical rows");
                continue;
            };

            let last_point = [last.year as f64, metric.historical(last)];
            let forecast = dataset
                .prediction(course_id)
                .map(|p| [last_point, [forecast_year as f64, metric.predicted(p)]]);

            series.push(CourseSeries {
                course_id: course_id.clone(),
                name: first.course_name.clone(),
                draw_index: series.len(),
                points: rows
                    .iter()
                    .map(|r| [r.year as f64, metric.historical(r)])
                    .collect(),
                forecast,
            });
        }

        if series.is_empty() {
            return Err(ViewError::NoData);
        }
        Ok(ComparisonChart {
            metric,
            series,
            forecast_year,
        })
    }

    /// x position of the vertical marker: the last year before the forecast.
    pub fn cutoff_year(&self) -> f64 {
        (self.forecast_year - 1) as f64
    }

    pub fn cutoff_label(&self) -> String {
        format!("{FORECAST_PLACEHOLDER} {}", self.forecast_year)
    }
}

// ---------------------------------------------------------------------------
// Summary table
// ---------------------------------------------------------------------------

/// A summary value that either exists or is only forecast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryCell {
    Value(String),
    Forecast,
}

impl fmt::Display for SummaryCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryCell::Value(v) => write!(f, "{v}"),
            SummaryCell::Forecast => write!(f, "{FORECAST_PLACEHOLDER}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub course: String,
    pub year: i32,
    pub occupancy: SummaryCell,
    pub grade: f64,
    pub remaining_slots: SummaryCell,
}

/// Year-by-year summary of the selected courses.
///
/// Years are processed in the given order. The forecast year yields one row
/// per selected course with a prediction, with placeholders for occupancy and
/// remaining slots; any other year yields the historical rows of the selected
/// courses in table order.
pub fn comparison_summary(
    dataset: &Dataset,
    selection: &SelectionSet,
    years: &[i32],
    forecast_year: i32,
) -> Vec<SummaryRow> {
    let mut rows = Vec::new();
    for &year in years {
        if year == forecast_year {
            for course_id in selection.iter() {
                let (Some(prediction), Some(info)) =
                    (dataset.prediction(course_id), dataset.course_info(course_id))
                else {
                    continue;
                };
                rows.push(SummaryRow {
                    course: info.course_name.clone(),
                    year,
                    occupancy: SummaryCell::Forecast,
                    grade: round_one_decimal(prediction.predicted_grade),
                    remaining_slots: SummaryCell::Forecast,
                });
            }
        } else {
            rows.extend(
                dataset
                    .historical()
                    .iter()
                    .filter(|r| r.year == year && selection.contains(&r.course_id))
                    .map(|r| SummaryRow {
                        course: r.course_name.clone(),
                        year,
                        occupancy: SummaryCell::Value(occupancy_label(r.occupancy_rate)),
                        grade: round_one_decimal(r.last_grade),
                        remaining_slots: SummaryCell::Value(r.remaining_slots.to_string()),
                    }),
            );
        }
    }
    rows
}

/// Years offered by the summary year picker: the forecast year first when
/// any selected course has a prediction, then historical years descending.
pub fn summary_year_options(
    dataset: &Dataset,
    selection: &SelectionSet,
    forecast_year: i32,
) -> Vec<i32> {
    let historical: BTreeSet<i32> = dataset
        .historical()
        .iter()
        .filter(|r| selection.contains(&r.course_id))
        .map(|r| r.year)
        .filter(|&y| y != forecast_year)
        .collect();

    let has_forecast = selection.iter().any(|id| dataset.prediction(id).is_some());
    has_forecast
        .then_some(forecast_year)
        .into_iter()
        .chain(historical.into_iter().rev())
        .collect()
}

/// The most recent historical year of the selected courses.
pub fn default_summary_year(dataset: &Dataset, selection: &SelectionSet) -> Option<i32> {
    dataset
        .historical()
        .iter()
        .filter(|r| selection.contains(&r.course_id))
        .map(|r| r.year)
        .max()
}
