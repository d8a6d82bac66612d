use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::SeriesPalette;
use crate::data::comparison::{comparison_summary, ComparisonChart, Metric, SummaryRow};
use crate::data::evolution::{CourseEvolution, DetailRow};
use crate::data::filter::{Picks, Resolved};
use crate::selection::SelectionAction;
use crate::state::{AppState, Tab};
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("Arquivo", |ui: &mut Ui| {
            if ui.button("Abrir dados históricos…").clicked() {
                open_file_dialog(state, TableKind::Historical);
                ui.close_menu();
            }
            if ui.button("Abrir previsões…").clicked() {
                open_file_dialog(state, TableKind::Predictions);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Recarregar").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();

        ui.selectable_value(&mut state.tab, Tab::Evolution, "📈 Evolução do Curso");
        ui.selectable_value(&mut state.tab, Tab::Comparison, "🔍 Comparação de Cursos");

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} registros históricos, {} previsões",
                ds.len(),
                ds.prediction_count()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::YELLOW));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – selects
// ---------------------------------------------------------------------------

/// Render the left selection panel for the active tab.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filtros");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("Nenhum conjunto de dados carregado.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.tab {
            Tab::Evolution => {
                if let Some(resolved) = state.resolve_evolution() {
                    course_selects(ui, "evolution", &resolved, &mut state.evolution_picks);
                }
                ui.separator();
                year_range_controls(ui, state);
            }
            Tab::Comparison => {
                if let Some(resolved) = state.resolve_comparison() {
                    course_selects(ui, "comparison", &resolved, &mut state.comparison_picks);
                }
                ui.separator();
                comparison_list(ui, state);
            }
        });
}

/// University → faculty → course selects. Writes the user's choice into `picks`;
/// the next frame's resolution cascades it to the lower levels.
fn course_selects(ui: &mut Ui, salt: &str, resolved: &Resolved, picks: &mut Picks) {
    let width = ui.available_width();

    ui.strong("Selecione a Universidade");
    string_select(
        ui,
        (salt, "university"),
        width,
        &resolved.universities,
        &mut picks.university,
    );

    ui.strong("Selecione a Faculdade");
    string_select(
        ui,
        (salt, "faculty"),
        width,
        &resolved.faculties,
        &mut picks.faculty,
    );

    ui.strong("Selecione o Curso");
    let selected_text = resolved.course_name().unwrap_or("—").to_string();
    egui::ComboBox::from_id_salt((salt, "course"))
        .width(width)
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            for option in &resolved.courses {
                let is_selected = picks.course.as_ref() == Some(&option.id);
                if ui.selectable_label(is_selected, option.name.as_str()).clicked() {
                    picks.course = Some(option.id.clone());
                }
            }
        });
}

fn string_select(
    ui: &mut Ui,
    id: impl std::hash::Hash,
    width: f32,
    options: &[String],
    current: &mut Option<String>,
) {
    let selected_text = current.clone().unwrap_or_else(|| "—".to_string());
    egui::ComboBox::from_id_salt(id)
        .width(width)
        .selected_text(selected_text)
        .show_ui(ui, |ui: &mut Ui| {
            for option in options {
                let is_selected = current.as_deref() == Some(option.as_str());
                if ui.selectable_label(is_selected, option.as_str()).clicked() {
                    *current = Some(option.clone());
                }
            }
        });
}

fn year_range_controls(ui: &mut Ui, state: &mut AppState) {
    let (Some(ds), Some((mut from, mut to))) = (&state.dataset, state.year_range) else {
        return;
    };
    let Some((min, max)) = ds.year_bounds() else {
        return;
    };

    ui.strong("Período");
    let mut changed = false;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("De");
        changed |= ui
            .add(egui::DragValue::new(&mut from).range(min..=max))
            .changed();
        ui.label("até");
        changed |= ui
            .add(egui::DragValue::new(&mut to).range(min..=max))
            .changed();
    });
    if ui.small_button("Período completo").clicked() {
        (from, to) = (min, max);
        changed = true;
    }
    if changed {
        state.set_year_range(from, to);
    }
}

/// Add button, selected-course list with remove buttons, and clear button.
/// Changes are applied after the list is drawn, then a repaint is requested.
fn comparison_list(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = state.dataset.clone() else {
        return;
    };
    let picked = state.comparison_picks.course.clone();
    let selection = state.selection().clone();
    let mut action: Option<SelectionAction> = None;

    if let Some(course) = picked.filter(|id| !selection.contains(id)) {
        if ui.button("Adicionar Curso à Comparação").clicked() {
            action = Some(SelectionAction::Add(course));
        }
    }

    if !selection.is_empty() {
        ui.add_space(6.0);
        ui.strong("Cursos Selecionados para Comparação");
        for course_id in selection.iter() {
            let label = dataset
                .course_info(course_id)
                .map(|r| r.course_label())
                .unwrap_or_else(|| course_id.to_string());
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("✖").on_hover_text("Remover").clicked() {
                    action = Some(SelectionAction::Remove(course_id.clone()));
                }
                ui.label(label);
            });
        }
        ui.add_space(6.0);
        if ui.button("Limpar Todos os Cursos").clicked() {
            action = Some(SelectionAction::Clear);
        }
    }

    if let Some(action) = action {
        if state.apply_selection(action) {
            ui.ctx().request_repaint();
        }
    }
}

// ---------------------------------------------------------------------------
// Central panel – views
// ---------------------------------------------------------------------------

/// Render the central panel for the active tab.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(RichText::new("🎓 Painel de Análise de Cursos").size(28.0).strong());
    });
    ui.add_space(8.0);

    if let Some(err) = &state.load_error {
        ui.label(RichText::new(format!("❌ {err}")).color(Color32::RED));
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.tab {
            Tab::Evolution => {
                ui.heading("Analise o desempenho de um curso ao longo do tempo");
                evolution_view(ui, state);
            }
            Tab::Comparison => {
                ui.heading("Compare múltiplos cursos");
                comparison_view(ui, state);
            }
        });
}

fn notice(ui: &mut Ui, text: impl Into<String>) {
    ui.label(RichText::new(format!("ℹ {}", text.into())).color(Color32::LIGHT_BLUE));
}

fn evolution_view(ui: &mut Ui, state: &mut AppState) {
    let (Some(dataset), Some(course_id), Some(years)) = (
        state.dataset.clone(),
        state.evolution_picks.course.clone(),
        state.year_range(),
    ) else {
        return;
    };

    let view = match CourseEvolution::build(&dataset, &course_id, years, state.config.forecast_year) {
        Ok(view) => view,
        Err(e) => {
            notice(ui, e.to_string());
            return;
        }
    };

    ui.add_space(6.0);
    ui.heading(format!("📈 Análise de Evolução: {}", view.course_name));
    ui.label(format!(
        "Universidade: {}",
        view.university.as_deref().unwrap_or("N/A")
    ));
    ui.label(format!(
        "Faculdade: {}",
        view.faculty.as_deref().unwrap_or("N/A")
    ));

    ui.add_space(6.0);
    ui.strong("📊 Métricas Principais");
    metrics_row(ui, &view);

    ui.add_space(6.0);
    ui.columns(2, |cols| {
        plot::evolution_chart(
            &mut cols[0],
            "placed_plot",
            "Número de Colocados ao Longo do Tempo",
            "Número de Colocados",
            &view.placed_series,
        );
        plot::evolution_chart(
            &mut cols[1],
            "grade_plot",
            "Nota do Último Colocado",
            "Nota",
            &view.grade_series,
        );
    });

    egui::CollapsingHeader::new("📋 Dados Detalhados")
        .default_open(false)
        .show(ui, |ui: &mut Ui| detail_table(ui, &view.detail));
}

fn metric(ui: &mut Ui, label: &str, value: String) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.label(RichText::new(label).size(13.0));
        ui.label(RichText::new(value).size(24.0).strong());
    });
}

fn metrics_row(ui: &mut Ui, view: &CourseEvolution) {
    let m = &view.metrics;
    ui.columns(6, |cols| {
        metric(
            &mut cols[0],
            "Taxa Média de Ocupação",
            format!("{:.0}%", m.mean_occupancy_percent),
        );
        metric(
            &mut cols[1],
            "Nota Média do Último Colocado",
            format!("{:.1}", m.mean_grade),
        );
        metric(
            &mut cols[2],
            &format!("Nota do Último Colocado ({})", m.last_year),
            format!("{:.1}", m.last_grade),
        );
        metric(
            &mut cols[3],
            &format!("Alunos Colocados ({})", m.last_year),
            m.last_placed.to_string(),
        );
        if let Some(f) = &m.forecast {
            metric(
                &mut cols[4],
                &format!("Previsão Nota do Último Colocado {}", f.year),
                format!("{:.1}", f.grade),
            );
            metric(
                &mut cols[5],
                &format!("Previsão Alunos Colocados {}", f.year),
                f.placed.to_string(),
            );
        }
    });
}

fn detail_table(ui: &mut Ui, rows: &[DetailRow]) {
    const HEADERS: [&str; 6] = [
        "Ano",
        "Vagas Iniciais",
        "Alunos Colocados",
        "Taxa de Ocupação",
        "Nota do Último Colocado",
        "Vagas Restantes",
    ];

    ui.push_id("detail_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .columns(Column::auto().at_least(90.0), HEADERS.len())
            .header(22.0, |mut header| {
                for title in HEADERS {
                    header.col(|ui: &mut Ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for row in rows {
                    body.row(20.0, |mut r| {
                        let cells = [
                            row.year.to_string(),
                            row.initial_slots.to_string(),
                            row.placed.to_string(),
                            row.occupancy.clone(),
                            format!("{:.1}", row.grade),
                            row.remaining_slots.to_string(),
                        ];
                        for cell in cells {
                            r.col(|ui: &mut Ui| {
                                ui.label(cell);
                            });
                        }
                    });
                }
            });
    });
}

fn comparison_view(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = state.dataset.clone() else {
        return;
    };
    let forecast_year = state.config.forecast_year;
    let selection = state.selection().clone();

    let charts: Result<Vec<ComparisonChart>, _> = Metric::ALL
        .into_iter()
        .map(|metric| ComparisonChart::build(&dataset, &selection, metric, forecast_year))
        .collect();
    let charts = match charts {
        Ok(charts) => charts,
        Err(e) => {
            notice(ui, e.to_string());
            return;
        }
    };

    ui.add_space(6.0);
    ui.heading("🔍 Comparação de Cursos");
    ui.strong("📈 Evolução Histórica dos Cursos Selecionados");

    let palette = SeriesPalette::default();
    ui.columns(charts.len(), |cols| {
        for (col, chart) in cols.iter_mut().zip(&charts) {
            plot::comparison_chart(col, chart, &palette);
        }
    });

    ui.add_space(6.0);
    ui.strong("📋 Resumo da Comparação");
    ui.label("Selecione os Anos para o Resumo");

    let options = state.summary_year_options();
    let picked = state.summary_years();
    let mut toggled: Option<i32> = None;
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for year in &options {
            let mut checked = picked.contains(year);
            if ui.checkbox(&mut checked, year.to_string()).changed() {
                toggled = Some(*year);
            }
        }
    });
    if let Some(year) = toggled {
        state.toggle_summary_year(year);
        ui.ctx().request_repaint();
    }

    if picked.is_empty() {
        notice(
            ui,
            "Por favor, selecione pelo menos um ano para visualizar o resumo.",
        );
        return;
    }

    let rows = comparison_summary(&dataset, &selection, &picked, forecast_year);
    summary_table(ui, &rows);
}

fn summary_table(ui: &mut Ui, rows: &[SummaryRow]) {
    const HEADERS: [&str; 5] = ["Curso", "Ano", "Ocupação %", "Nota Mínima", "Vagas Restantes"];

    ui.push_id("summary_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .max_scroll_height(250.0)
            .column(Column::remainder().at_least(160.0))
            .columns(Column::auto().at_least(90.0), HEADERS.len() - 1)
            .header(22.0, |mut header| {
                for title in HEADERS {
                    header.col(|ui: &mut Ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|mut body| {
                for row in rows {
                    body.row(20.0, |mut r| {
                        let cells = [
                            row.course.clone(),
                            row.year.to_string(),
                            row.occupancy.to_string(),
                            format!("{:.1}", row.grade),
                            row.remaining_slots.to_string(),
                        ];
                        for cell in cells {
                            r.col(|ui: &mut Ui| {
                                ui.label(cell);
                            });
                        }
                    });
                }
            });
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub enum TableKind {
    Historical,
    Predictions,
}

pub fn open_file_dialog(state: &mut AppState, kind: TableKind) {
    let title = match kind {
        TableKind::Historical => "Abrir dados históricos",
        TableKind::Predictions => "Abrir previsões",
    };
    let file = rfd::FileDialog::new()
        .set_title(title)
        .add_filter("Tabelas suportadas", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    let Some(path) = file else {
        return;
    };
    log::info!("Using {kind:?} table {}", path.display());
    match kind {
        TableKind::Historical => state.set_historical_path(path),
        TableKind::Predictions => state.set_predictions_path(path),
    }
}
