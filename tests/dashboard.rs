use std::fs;

use course_dashboard::config::DashboardConfig;
use course_dashboard::data::comparison::{comparison_summary, ComparisonChart, Metric, SummaryCell};
use course_dashboard::data::evolution::CourseEvolution;
use course_dashboard::data::model::CourseId;
use course_dashboard::error::ViewError;
use course_dashboard::selection::SelectionAction;
use course_dashboard::state::AppState;
use tempfile::TempDir;

const HEADER: &str = "course_id,curso,nome_universidade,nome_faculdade,ano,vagas_iniciais,colocados,taxa_ocupacao,nota_ultimo_colocado,vagas_sobrantes";
const ISEG: &str = "Universidade de Lisboa,Instituto Superior de Economia e Gestão";

fn fixture_state(dir: &TempDir) -> AppState {
    let mut historical = format!("{HEADER}\n");
    for (i, year) in (2020..=2024).enumerate() {
        let placed = [10, 12, 11, 13, 14][i];
        let rate = [0.5, 0.6, 0.55, 0.65, 0.7][i];
        let grade = [12.1, 12.4, 12.0, 13.2, 13.5][i];
        historical.push_str(&format!(
            "C1,Economia,{ISEG},{year},20,{placed},{rate},{grade},{}\n",
            20 - placed
        ));
    }
    for year in 2022..=2024 {
        historical.push_str(&format!("C2,Gestão,{ISEG},{year},20,15,0.75,14.0,5\n"));
    }
    historical.push_str("C3,Medicina,Universidade de Coimbra,Faculdade de Medicina,2024,100,100,1.0,18.9,0\n");

    let historical_path = dir.path().join("cleaned_data.csv");
    let predictions_path = dir.path().join("predictions_2025.csv");
    fs::write(&historical_path, historical).unwrap();
    fs::write(
        &predictions_path,
        "course_id,colocados_previsto,nota_ultimo_colocado_prevista\nC1,15.7,14.24\n",
    )
    .unwrap();

    let config = DashboardConfig {
        historical_path,
        predictions_path,
        ..DashboardConfig::default()
    };
    let mut state = AppState::new(config);
    assert!(state.refresh_dataset());
    state
}

#[test]
fn test_evolution_flow() {
    let dir = TempDir::new().unwrap();
    let mut state = fixture_state(&dir);

    let resolved = state.resolve_evolution().unwrap();
    assert_eq!(resolved.universities, vec!["Universidade de Lisboa", "Universidade de Coimbra"]);
    assert_eq!(resolved.course_name(), Some("Economia"));

    let dataset = state.dataset.clone().unwrap();
    let course = resolved.picks.course.unwrap();
    let view = CourseEvolution::build(&dataset, &course, state.year_range().unwrap(), 2025).unwrap();
    assert_eq!(format!("{:.0}%", view.metrics.mean_occupancy_percent), "60%");
    assert_eq!(view.metrics.forecast.as_ref().unwrap().placed, 15);
    assert_eq!(view.detail.len(), 5);

    state.set_year_range(2023, 2024);
    let narrowed =
        CourseEvolution::build(&dataset, &course, state.year_range().unwrap(), 2025).unwrap();
    assert_eq!(narrowed.placed_series, vec![[2023.0, 13.0], [2024.0, 14.0]]);

    let missing = CourseEvolution::build(&dataset, &CourseId::from("C2"), 2020..=2021, 2025);
    assert_eq!(missing.unwrap_err(), ViewError::NoData);
}

#[test]
fn test_comparison_flow() {
    let dir = TempDir::new().unwrap();
    let mut state = fixture_state(&dir);
    let dataset = state.dataset.clone().unwrap();

    let ids: Vec<String> = state.selection().iter().map(|id| id.to_string()).collect();
    assert_eq!(ids, vec!["C1", "C2"]);

    assert!(state.apply_selection(SelectionAction::Add(CourseId::from("C3"))));
    assert!(!state.apply_selection(SelectionAction::Add(CourseId::from("C3"))));

    let chart =
        ComparisonChart::build(&dataset, state.selection(), Metric::Grade, 2025).unwrap();
    assert_eq!(chart.series.len(), 3);
    assert_eq!(chart.cutoff_label(), "Previsão 2025");
    assert_eq!(chart.series[0].forecast, Some([[2024.0, 13.5], [2025.0, 14.24]]));
    assert!(chart.series[1].forecast.is_none());
    assert_eq!(chart.series[2].draw_index, 2);

    assert_eq!(state.summary_year_options(), vec![2025, 2024, 2023, 2022, 2021, 2020]);
    state.toggle_summary_year(2025);
    let years = state.summary_years();
    assert_eq!(years, vec![2024, 2025]);

    let summary = comparison_summary(&dataset, state.selection(), &years, 2025);
    let courses: Vec<(&str, i32)> = summary.iter().map(|r| (r.course.as_str(), r.year)).collect();
    assert_eq!(
        courses,
        vec![("Economia", 2024), ("Gestão", 2024), ("Medicina", 2024), ("Economia", 2025)]
    );
    let forecast_row = summary.last().unwrap();
    assert_eq!(forecast_row.occupancy, SummaryCell::Forecast);
    assert_eq!(forecast_row.grade, 14.2);
    assert_eq!(summary[0].occupancy.to_string(), "70%");

    assert!(state.apply_selection(SelectionAction::Clear));
    let empty = ComparisonChart::build(&dataset, state.selection(), Metric::Placed, 2025);
    assert_eq!(empty.unwrap_err(), ViewError::EmptyComparison);
}

#[test]
fn test_reload_picks_up_new_files() {
    let dir = TempDir::new().unwrap();
    let mut state = fixture_state(&dir);
    assert_eq!(state.dataset.as_ref().unwrap().prediction_count(), 1);

    let other = dir.path().join("predictions.json");
    fs::write(
        &other,
        r#"[{"course_id": "C1", "colocados_previsto": 15, "nota_ultimo_colocado_prevista": 14.2},
            {"course_id": "C2", "colocados_previsto": 16, "nota_ultimo_colocado_prevista": 14.5}]"#,
    )
    .unwrap();
    state.set_predictions_path(other);
    assert_eq!(state.dataset.as_ref().unwrap().prediction_count(), 2);
    assert!(state.load_error.is_none());

    state.set_historical_path(dir.path().join("gone.csv"));
    assert!(state.dataset.is_none());
    assert!(state.load_error.is_some());
}
