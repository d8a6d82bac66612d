use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arrow::array::{ArrayRef, Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use course_dashboard::data::loader::{load_dataset, DataSources, DatasetCache};
use course_dashboard::data::model::{CourseId, Dataset, Table};
use course_dashboard::error::{LoadError, RowError};
use parquet::arrow::ArrowWriter;
use tempfile::TempDir;

const HISTORICAL_CSV: &str = "\
course_id,curso,nome_universidade,nome_faculdade,ano,vagas_iniciais,colocados,taxa_ocupacao,nota_ultimo_colocado,vagas_sobrantes
9001,Economia,Universidade de Lisboa,Instituto Superior de Economia e Gestão,2022,20,12,0.6,12.4,8
9001,Economia,Universidade de Lisboa,Instituto Superior de Economia e Gestão,2023,20,13,0.65,13.2,7
9002,Gestão,Universidade de Lisboa,Instituto Superior de Economia e Gestão,2023,30,30,1.0,15.1,0
";

const PREDICTIONS_CSV: &str = "\
course_id,colocados_previsto,nota_ultimo_colocado_prevista
9001,15.0,14.2
";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn csv_sources(dir: &TempDir) -> DataSources {
    DataSources {
        historical: write(dir.path(), "cleaned_data.csv", HISTORICAL_CSV),
        predictions: write(dir.path(), "predictions_2025.csv", PREDICTIONS_CSV),
    }
}

fn write_parquet(path: &Path, columns: Vec<(&str, ArrayRef)>) {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let batch = RecordBatch::try_new(
        Arc::new(Schema::new(fields)),
        columns.into_iter().map(|(_, array)| array).collect(),
    )
    .unwrap();

    let file = fs::File::create(path).unwrap();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

fn text(values: &[&str]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

fn floats(values: &[f64]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

fn ints(values: &[i32]) -> ArrayRef {
    Arc::new(Int32Array::from(values.to_vec()))
}

fn summarize(dataset: &Dataset) -> Vec<(String, i32, i64, f64)> {
    dataset
        .historical()
        .iter()
        .map(|r| (r.course_id.to_string(), r.year, r.placed, r.last_grade))
        .collect()
}

#[test]
fn test_load_csv() {
    let dir = TempDir::new().unwrap();
    let dataset = load_dataset(&csv_sources(&dir)).unwrap();

    assert_eq!(dataset.len(), 3);
    assert!(dataset.report().is_clean());
    assert_eq!(dataset.year_bounds(), Some((2022, 2023)));

    let first = &dataset.historical()[0];
    assert_eq!(first.course_name, "Economia");
    assert_eq!(first.university.as_deref(), Some("Universidade de Lisboa"));
    assert_eq!(first.remaining_slots, 8);

    let prediction = dataset.prediction(&CourseId::from("9001")).unwrap();
    assert_eq!(prediction.predicted_placed_count(), 15);
    assert!(dataset.prediction(&CourseId::from("9002")).is_none());
}

#[test]
fn test_all_formats_load_the_same_rows() {
    let dir = TempDir::new().unwrap();
    let from_csv = load_dataset(&csv_sources(&dir)).unwrap();

    // Numeric ids and float years, as pandas writes them.
    let historical_json = write(
        dir.path(),
        "cleaned_data.json",
        r#"[
          {"course_id": 9001, "curso": "Economia", "nome_universidade": "Universidade de Lisboa",
           "nome_faculdade": "Instituto Superior de Economia e Gestão", "ano": 2022.0,
           "vagas_iniciais": 20, "colocados": 12, "taxa_ocupacao": 0.6,
           "nota_ultimo_colocado": 12.4, "vagas_sobrantes": 8},
          {"course_id": 9001, "curso": "Economia", "nome_universidade": "Universidade de Lisboa",
           "nome_faculdade": "Instituto Superior de Economia e Gestão", "ano": 2023.0,
           "vagas_iniciais": 20, "colocados": 13, "taxa_ocupacao": 0.65,
           "nota_ultimo_colocado": 13.2, "vagas_sobrantes": 7},
          {"course_id": 9002, "curso": "Gestão", "nome_universidade": "Universidade de Lisboa",
           "nome_faculdade": "Instituto Superior de Economia e Gestão", "ano": 2023.0,
           "vagas_iniciais": 30, "colocados": 30, "taxa_ocupacao": 1.0,
           "nota_ultimo_colocado": 15.1, "vagas_sobrantes": 0}
        ]"#,
    );
    let predictions_json = write(
        dir.path(),
        "predictions_2025.json",
        r#"[{"course_id": "9001", "colocados_previsto": 15.0, "nota_ultimo_colocado_prevista": 14.2}]"#,
    );
    let from_json = load_dataset(&DataSources {
        historical: historical_json,
        predictions: predictions_json,
    })
    .unwrap();

    let historical_parquet = dir.path().join("cleaned_data.parquet");
    let uni = "Universidade de Lisboa";
    let fac = "Instituto Superior de Economia e Gestão";
    write_parquet(
        &historical_parquet,
        vec![
            ("course_id", text(&["9001", "9001", "9002"])),
            ("curso", text(&["Economia", "Economia", "Gestão"])),
            ("nome_universidade", text(&[uni, uni, uni])),
            ("nome_faculdade", text(&[fac, fac, fac])),
            ("ano", ints(&[2022, 2023, 2023])),
            ("vagas_iniciais", ints(&[20, 20, 30])),
            ("colocados", ints(&[12, 13, 30])),
            ("taxa_ocupacao", floats(&[0.6, 0.65, 1.0])),
            ("nota_ultimo_colocado", floats(&[12.4, 13.2, 15.1])),
            ("vagas_sobrantes", ints(&[8, 7, 0])),
        ],
    );
    let predictions_parquet = dir.path().join("predictions_2025.parquet");
    write_parquet(
        &predictions_parquet,
        vec![
            ("course_id", text(&["9001"])),
            ("colocados_previsto", floats(&[15.0])),
            ("nota_ultimo_colocado_prevista", floats(&[14.2])),
        ],
    );
    let from_parquet = load_dataset(&DataSources {
        historical: historical_parquet,
        predictions: predictions_parquet,
    })
    .unwrap();

    for other in [&from_json, &from_parquet] {
        assert_eq!(summarize(other), summarize(&from_csv));
        assert_eq!(other.historical(), from_csv.historical());
        assert_eq!(other.prediction_count(), 1);
        assert!(other.report().is_clean());
    }
}

#[test]
fn test_missing_file_is_missing_input() {
    let dir = TempDir::new().unwrap();
    let mut sources = csv_sources(&dir);
    sources.predictions = dir.path().join("predictions_2025.parquet");

    let err = load_dataset(&sources).unwrap_err();
    assert!(matches!(err, LoadError::MissingInput { ref path } if path == &sources.predictions));
    assert!(err.to_string().contains("não encontrado"));
}

#[test]
fn test_missing_column_is_malformed() {
    let dir = TempDir::new().unwrap();
    let mut sources = csv_sources(&dir);
    sources.historical = write(
        dir.path(),
        "partial.csv",
        "course_id,curso,ano\n9001,Economia,2022\n",
    );

    match load_dataset(&sources).unwrap_err() {
        LoadError::Malformed { message, .. } => {
            assert!(message.contains("missing column(s)"));
            assert!(message.contains("vagas_sobrantes"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let mut sources = csv_sources(&dir);
    sources.historical = write(dir.path(), "cleaned_data.xlsx", "");

    let err = load_dataset(&sources).unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
}

#[test]
fn test_bad_rows_are_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let mut sources = csv_sources(&dir);
    sources.historical = write(
        dir.path(),
        "dirty.csv",
        "\
course_id,curso,nome_universidade,nome_faculdade,ano,vagas_iniciais,colocados,taxa_ocupacao,nota_ultimo_colocado,vagas_sobrantes
9001,Economia,,,2022,20,12,0.6,12.4,8
9001,Economia,,,2023,20,12.5,0.6,12.9,8
9001,Economia,,,2022,20,11,0.55,12.0,9
9002,Gestão,,,2023,30,30,1.0,,0
",
    );
    sources.predictions = write(
        dir.path(),
        "dirty_predictions.csv",
        "course_id,colocados_previsto,nota_ultimo_colocado_prevista\n9001,15,14.2\n9001,16,14.0\n",
    );

    let dataset = load_dataset(&sources).unwrap();
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.historical()[0].university, None);
    assert_eq!(dataset.prediction_count(), 1);

    let reasons: Vec<(Table, usize, RowError)> = dataset
        .report()
        .rejections
        .iter()
        .map(|r| (r.table, r.row, r.reason.clone()))
        .collect();
    assert_eq!(reasons.len(), 4);
    assert!(reasons.contains(&(
        Table::Historical,
        2,
        RowError::NotInteger {
            column: "colocados",
            value: 12.5
        }
    )));
    assert!(reasons.contains(&(
        Table::Historical,
        3,
        RowError::DuplicateYear {
            course_id: CourseId::from("9001"),
            year: 2022
        }
    )));
    assert!(reasons.contains(&(
        Table::Historical,
        4,
        RowError::Missing("nota_ultimo_colocado")
    )));
    assert!(reasons.contains(&(
        Table::Predictions,
        2,
        RowError::DuplicatePrediction(CourseId::from("9001"))
    )));
}

#[test]
fn test_non_numeric_cell_rejects_only_its_row() {
    let dir = TempDir::new().unwrap();
    let mut sources = csv_sources(&dir);
    sources.historical = write(
        dir.path(),
        "placeholders.csv",
        "\
course_id,curso,nome_universidade,nome_faculdade,ano,vagas_iniciais,colocados,taxa_ocupacao,nota_ultimo_colocado,vagas_sobrantes
C1,Economia,U,F,2022,20,12,0.6,12.4,8
C1,Economia,U,F,2023,20,n/d,0.6,12.4,8
C2,true,U,F,2023,20,20,1.0,15.0,0
",
    );

    let dataset = load_dataset(&sources).unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.historical()[1].course_name, "true");

    let rejections = &dataset.report().rejections;
    assert_eq!(rejections.len(), 1);
    assert_eq!(rejections[0].table, Table::Historical);
    assert_eq!(rejections[0].row, 2);
    assert_eq!(rejections[0].reason, RowError::Missing("colocados"));
}

#[test]
fn test_cache_reuses_dataset_until_file_changes() {
    let dir = TempDir::new().unwrap();
    let sources = csv_sources(&dir);
    let mut cache = DatasetCache::new();
    assert!(!cache.is_loaded());

    let first = cache.get_or_load(&sources).unwrap();
    let second = cache.get_or_load(&sources).unwrap();
    assert!(cache.is_loaded());
    assert!(Arc::ptr_eq(&first, &second));

    let trimmed: String = HISTORICAL_CSV.lines().take(2).map(|l| format!("{l}\n")).collect();
    fs::write(&sources.historical, trimmed).unwrap();
    let later = SystemTime::now() + Duration::from_secs(60);
    fs::File::options()
        .write(true)
        .open(&sources.historical)
        .unwrap()
        .set_modified(later)
        .unwrap();

    let reloaded = cache.get_or_load(&sources).unwrap();
    assert!(!Arc::ptr_eq(&first, &reloaded));
    assert_eq!(reloaded.len(), 1);
}

#[test]
fn test_cache_invalidate_and_path_change() {
    let dir = TempDir::new().unwrap();
    let sources = csv_sources(&dir);
    let mut cache = DatasetCache::new();
    let first = cache.get_or_load(&sources).unwrap();

    cache.invalidate();
    assert!(!cache.is_loaded());
    let again = cache.get_or_load(&sources).unwrap();
    assert!(!Arc::ptr_eq(&first, &again));

    let moved = DataSources {
        historical: write(dir.path(), "other.csv", HISTORICAL_CSV),
        predictions: sources.predictions.clone(),
    };
    let other = cache.get_or_load(&moved).unwrap();
    assert!(!Arc::ptr_eq(&again, &other));
    assert_eq!(other.historical(), again.historical());
}

#[test]
fn test_cache_missing_file() {
    let dir = TempDir::new().unwrap();
    let sources = DataSources {
        historical: dir.path().join("cleaned_data.csv"),
        predictions: dir.path().join("predictions_2025.csv"),
    };
    let err = DatasetCache::new().get_or_load(&sources).unwrap_err();
    assert!(matches!(err, LoadError::MissingInput { .. }));
}
