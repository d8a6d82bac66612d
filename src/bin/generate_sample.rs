use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use course_dashboard::data::model::{CourseId, HistoricalRecord, PredictionRecord};
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

const YEARS: std::ops::RangeInclusive<i32> = 2018..=2024;
const FORECAST_YEAR: i32 = 2025;

/// (university, faculty, courses)
const CATALOGUE: &[(&str, &str, &[&str])] = &[
    (
        "Universidade de Lisboa",
        "Instituto Superior de Economia e Gestão",
        &["Economia", "Gestão", "Finanças", "Matemática Aplicada à Economia e à Gestão"],
    ),
    (
        "Universidade de Lisboa",
        "Instituto Superior Técnico",
        &["Engenharia Informática e de Computadores", "Engenharia Aeroespacial"],
    ),
    (
        "Universidade do Porto",
        "Faculdade de Economia",
        &["Economia", "Gestão"],
    ),
    (
        "Universidade de Coimbra",
        "Faculdade de Medicina",
        &["Medicina"],
    ),
];

fn generate(rng: &mut SimpleRng) -> (Vec<HistoricalRecord>, Vec<PredictionRecord>) {
    let mut historical = Vec::new();
    let mut predictions = Vec::new();
    let mut next_id = 1000;

    for &(university, faculty, courses) in CATALOGUE {
        for &course in courses {
            next_id += 1;
            let course_id = CourseId::new(next_id.to_string());
            let slots = (rng.uniform(40.0, 220.0) / 5.0).round() as i64 * 5;
            let mut grade = rng.uniform(12.0, 18.0);
            let mut last = None;

            for year in YEARS {
                let rate = rng.uniform(0.75, 1.0);
                let placed = ((slots as f64) * rate).round() as i64;
                grade = (grade + rng.uniform(-0.4, 0.5)).clamp(9.5, 19.5);
                let record = HistoricalRecord {
                    course_id: course_id.clone(),
                    course_name: course.to_string(),
                    university: Some(university.to_string()),
                    faculty: Some(faculty.to_string()),
                    year,
                    initial_slots: slots,
                    placed,
                    occupancy_rate: placed as f64 / slots as f64,
                    last_grade: (grade * 100.0).round() / 100.0,
                    remaining_slots: slots - placed,
                };
                last = Some((record.placed, record.last_grade));
                historical.push(record);
            }

            // Roughly one course in five has no forecast.
            let Some((placed, grade)) = last else { continue };
            if rng.next_f64() < 0.2 {
                continue;
            }
            predictions.push(PredictionRecord {
                course_id,
                predicted_placed: (placed as f64 * rng.uniform(0.95, 1.05)).round(),
                predicted_grade: ((grade + rng.uniform(-0.3, 0.3)) * 100.0).round() / 100.0,
            });
        }
    }
    (historical, predictions)
}

fn write_csv<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

fn historical_batch(rows: &[HistoricalRecord]) -> Result<RecordBatch> {
    let text = |f: fn(&HistoricalRecord) -> Option<&str>| -> ArrayRef {
        Arc::new(rows.iter().map(f).collect::<StringArray>())
    };
    let int = |f: fn(&HistoricalRecord) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let float = |f: fn(&HistoricalRecord) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("course_id", DataType::Utf8, false),
        Field::new("curso", DataType::Utf8, false),
        Field::new("nome_universidade", DataType::Utf8, true),
        Field::new("nome_faculdade", DataType::Utf8, true),
        Field::new("ano", DataType::Int64, false),
        Field::new("vagas_iniciais", DataType::Int64, false),
        Field::new("colocados", DataType::Int64, false),
        Field::new("taxa_ocupacao", DataType::Float64, false),
        Field::new("nota_ultimo_colocado", DataType::Float64, false),
        Field::new("vagas_sobrantes", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema,
        vec![
            text(|r| Some(r.course_id.as_str())),
            text(|r| Some(r.course_name.as_str())),
            text(|r| r.university.as_deref()),
            text(|r| r.faculty.as_deref()),
            int(|r| r.year as i64),
            int(|r| r.initial_slots),
            int(|r| r.placed),
            float(|r| r.occupancy_rate),
            float(|r| r.last_grade),
            int(|r| r.remaining_slots),
        ],
    )?;
    Ok(batch)
}

fn predictions_batch(rows: &[PredictionRecord]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("course_id", DataType::Utf8, false),
        Field::new("colocados_previsto", DataType::Float64, false),
        Field::new("nota_ultimo_colocado_prevista", DataType::Float64, false),
    ]));
    let ids: StringArray = rows.iter().map(|p| Some(p.course_id.as_str())).collect();
    let placed = Float64Array::from(rows.iter().map(|p| p.predicted_placed).collect::<Vec<_>>());
    let grade = Float64Array::from(rows.iter().map(|p| p.predicted_grade).collect::<Vec<_>>());

    let batch = RecordBatch::try_new(
        schema,
        vec![Arc::new(ids), Arc::new(placed), Arc::new(grade)],
    )?;
    Ok(batch)
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let (historical, predictions) = generate(&mut rng);

    let predictions_csv = format!("predictions_{FORECAST_YEAR}.csv");
    let predictions_parquet = format!("predictions_{FORECAST_YEAR}.parquet");

    write_csv(Path::new("cleaned_data.csv"), &historical)?;
    write_csv(Path::new(&predictions_csv), &predictions)?;
    let historical_batch = historical_batch(&historical)?;
    write_parquet(Path::new("cleaned_data.parquet"), &historical_batch)?;
    write_parquet(Path::new(&predictions_parquet), &predictions_batch(&predictions)?)?;

    let preview = historical_batch.slice(0, historical_batch.num_rows().min(YEARS.count()));
    println!("{}", pretty_format_batches(&[preview])?);
    println!(
        "Wrote {} historical rows ({} courses) and {} predictions",
        historical.len(),
        historical.len() / YEARS.count(),
        predictions.len()
    );
    Ok(())
}
