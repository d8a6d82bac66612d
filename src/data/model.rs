use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::RowError;

// ---------------------------------------------------------------------------
// CourseId – stable identifier of a course
// ---------------------------------------------------------------------------

/// Opaque course identifier. Course names collide across universities, the
/// identifier never does.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(String);

impl CourseId {
    pub fn new(id: impl Into<String>) -> Self {
        CourseId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CourseId {
    fn from(id: &str) -> Self {
        CourseId::new(id)
    }
}

impl From<String> for CourseId {
    fn from(id: String) -> Self {
        CourseId(id)
    }
}

// ---------------------------------------------------------------------------
// HistoricalRecord – one row per (course, year)
// ---------------------------------------------------------------------------

/// A validated row of the historical table. Serialises back to the input
/// column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalRecord {
    pub course_id: CourseId,
    #[serde(rename = "curso")]
    pub course_name: String,
    #[serde(rename = "nome_universidade")]
    pub university: Option<String>,
    #[serde(rename = "nome_faculdade")]
    pub faculty: Option<String>,
    #[serde(rename = "ano")]
    pub year: i32,
    #[serde(rename = "vagas_iniciais")]
    pub initial_slots: i64,
    #[serde(rename = "colocados")]
    pub placed: i64,
    /// Fraction in `0..=1`.
    #[serde(rename = "taxa_ocupacao")]
    pub occupancy_rate: f64,
    /// Admission grade of the last placed student.
    #[serde(rename = "nota_ultimo_colocado")]
    pub last_grade: f64,
    #[serde(rename = "vagas_sobrantes")]
    pub remaining_slots: i64,
}

impl HistoricalRecord {
    /// `curso (universidade - faculdade)`, used by the comparison list.
    pub fn course_label(&self) -> String {
        format!(
            "{} ({} - {})",
            self.course_name,
            self.university.as_deref().unwrap_or("N/A"),
            self.faculty.as_deref().unwrap_or("N/A"),
        )
    }
}

// ---------------------------------------------------------------------------
// PredictionRecord – one row per course for the forecast year
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub course_id: CourseId,
    #[serde(rename = "colocados_previsto")]
    pub predicted_placed: f64,
    #[serde(rename = "nota_ultimo_colocado_prevista")]
    pub predicted_grade: f64,
}

impl PredictionRecord {
    /// Predicted placed students as a whole count (truncated).
    pub fn predicted_placed_count(&self) -> i64 {
        self.predicted_placed.trunc() as i64
    }
}

// ---------------------------------------------------------------------------
// Raw rows – every field optional, validated into records
// ---------------------------------------------------------------------------

/// Historical row as read from disk, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHistoricalRow {
    #[serde(default, deserialize_with = "lenient_text")]
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub curso: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nome_universidade: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nome_faculdade: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub ano: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vagas_iniciais: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub colocados: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub taxa_ocupacao: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub nota_ultimo_colocado: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub vagas_sobrantes: Option<f64>,
}

/// Prediction row as read from disk, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPredictionRow {
    #[serde(default, deserialize_with = "lenient_text")]
    pub course_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub colocados_previsto: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub nota_ultimo_colocado_prevista: Option<f64>,
}

/// Identifiers and names may be written as numbers (JSON, pandas exports).
/// CSV cells reading `true`/`false` arrive as booleans.
#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<TextOrNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|v| {
        let text = match v {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Integer(i) => i.to_string(),
            TextOrNumber::Float(f) if f.is_finite() && f.fract() == 0.0 => {
                format!("{}", f as i64)
            }
            TextOrNumber::Float(f) => f.to_string(),
            TextOrNumber::Bool(b) => b.to_string(),
        };
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }))
}

/// A numeric cell that may hold placeholder text such as `n/d`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Numbers pass through, numeric text is parsed, anything else becomes
/// `None` so the row is rejected during validation instead of failing the file.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrText>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        NumberOrText::Number(n) => Some(n),
        NumberOrText::Text(s) => s.trim().parse::<f64>().ok(),
        NumberOrText::Other(_) => None,
    }))
}

fn required_text(value: Option<String>, column: &'static str) -> Result<String, RowError> {
    value.ok_or(RowError::Missing(column))
}

fn required_number(value: Option<f64>, column: &'static str) -> Result<f64, RowError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(RowError::Missing(column)),
    }
}

fn required_integer(value: Option<f64>, column: &'static str) -> Result<i64, RowError> {
    let v = required_number(value, column)?;
    if v.fract() != 0.0 {
        return Err(RowError::NotInteger { column, value: v });
    }
    Ok(v as i64)
}

fn required_year(value: Option<f64>) -> Result<i32, RowError> {
    let year = required_integer(value, "ano")?;
    i32::try_from(year).map_err(|_| RowError::NotInteger {
        column: "ano",
        value: year as f64,
    })
}

impl TryFrom<RawHistoricalRow> for HistoricalRecord {
    type Error = RowError;

    fn try_from(raw: RawHistoricalRow) -> Result<Self, RowError> {
        Ok(HistoricalRecord {
            course_id: CourseId(required_text(raw.course_id, "course_id")?),
            course_name: required_text(raw.curso, "curso")?,
            university: raw.nome_universidade,
            faculty: raw.nome_faculdade,
            year: required_year(raw.ano)?,
            initial_slots: required_integer(raw.vagas_iniciais, "vagas_iniciais")?,
            placed: required_integer(raw.colocados, "colocados")?,
            occupancy_rate: required_number(raw.taxa_ocupacao, "taxa_ocupacao")?,
            last_grade: required_number(raw.nota_ultimo_colocado, "nota_ultimo_colocado")?,
            remaining_slots: required_integer(raw.vagas_sobrantes, "vagas_sobrantes")?,
        })
    }
}

impl TryFrom<RawPredictionRow> for PredictionRecord {
    type Error = RowError;

    fn try_from(raw: RawPredictionRow) -> Result<Self, RowError> {
        Ok(PredictionRecord {
            course_id: CourseId(required_text(raw.course_id, "course_id")?),
            predicted_placed: required_number(raw.colocados_previsto, "colocados_previsto")?,
            predicted_grade: required_number(
                raw.nota_ultimo_colocado_prevista,
                "nota_ultimo_colocado_prevista",
            )?,
        })
    }
}

// ---------------------------------------------------------------------------
// LoadReport – rows rejected during validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Historical,
    Predictions,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::Historical => write!(f, "historical"),
            Table::Predictions => write!(f, "predictions"),
        }
    }
}

/// A skipped row. `row` is 1-based and does not count the header.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRejection {
    pub table: Table,
    pub row: usize,
    pub reason: RowError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub rejections: Vec<RowRejection>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejections.is_empty()
    }

    fn reject(&mut self, table: Table, row: usize, reason: RowError) {
        log::warn!("Rejected {table} row {row}: {reason}");
        self.rejections.push(RowRejection { table, row, reason });
    }
}

// ---------------------------------------------------------------------------
// Dataset – both validated tables
// ---------------------------------------------------------------------------

/// Read-only tables shared by every view. Historical rows keep file order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    historical: Vec<HistoricalRecord>,
    predictions: HashMap<CourseId, PredictionRecord>,
    report: LoadReport,
}

impl Dataset {
    /// Build from in-memory records, numbering rows by position.
    pub fn new(historical: Vec<HistoricalRecord>, predictions: Vec<PredictionRecord>) -> Self {
        Self::with_rejections(
            historical.into_iter().enumerate().map(|(i, r)| (i + 1, r)).collect(),
            predictions.into_iter().enumerate().map(|(i, r)| (i + 1, r)).collect(),
            Vec::new(),
        )
    }

    /// Build from numbered records, enforcing the cross-row invariants
    /// (one row per course and year, constant names per course, one
    /// prediction per course). Offending rows are skipped and reported;
    /// the first occurrence wins.
    pub fn with_rejections(
        historical: Vec<(usize, HistoricalRecord)>,
        predictions: Vec<(usize, PredictionRecord)>,
        rejections: Vec<RowRejection>,
    ) -> Self {
        let mut report = LoadReport { rejections };

        let mut kept: Vec<HistoricalRecord> = Vec::with_capacity(historical.len());
        let mut first_row: HashMap<CourseId, usize> = HashMap::new();
        let mut seen_years: HashSet<(CourseId, i32)> = HashSet::new();

        for (row, record) in historical {
            if let Some(&idx) = first_row.get(&record.course_id) {
                let first = &kept[idx];
                let column = if first.course_name != record.course_name {
                    Some("curso")
                } else if first.university != record.university {
                    Some("nome_universidade")
                } else if first.faculty != record.faculty {
                    Some("nome_faculdade")
                } else {
                    None
                };
                if let Some(column) = column {
                    let reason = RowError::InconsistentCourse {
                        course_id: record.course_id.clone(),
                        column,
                    };
                    report.reject(Table::Historical, row, reason);
                    continue;
                }
            }

            if !seen_years.insert((record.course_id.clone(), record.year)) {
                let reason = RowError::DuplicateYear {
                    course_id: record.course_id.clone(),
                    year: record.year,
                };
                report.reject(Table::Historical, row, reason);
                continue;
            }

            first_row
                .entry(record.course_id.clone())
                .or_insert(kept.len());
            kept.push(record);
        }

        let mut by_course: HashMap<CourseId, PredictionRecord> = HashMap::new();
        for (row, prediction) in predictions {
            if by_course.contains_key(&prediction.course_id) {
                let reason = RowError::DuplicatePrediction(prediction.course_id.clone());
                report.reject(Table::Predictions, row, reason);
                continue;
            }
            by_course.insert(prediction.course_id.clone(), prediction);
        }

        Dataset {
            historical: kept,
            predictions: by_course,
            report,
        }
    }

    pub fn historical(&self) -> &[HistoricalRecord] {
        &self.historical
    }

    pub fn prediction(&self, course_id: &CourseId) -> Option<&PredictionRecord> {
        self.predictions.get(course_id)
    }

    pub fn prediction_count(&self) -> usize {
        self.predictions.len()
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// First historical row of a course; carries its name, university and faculty.
    pub fn course_info(&self, course_id: &CourseId) -> Option<&HistoricalRecord> {
        self.historical.iter().find(|r| &r.course_id == course_id)
    }

    /// Smallest and largest year in the historical table.
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        let min = self.historical.iter().map(|r| r.year).min()?;
        let max = self.historical.iter().map(|r| r.year).max()?;
        Some((min, max))
    }

    /// Number of historical rows.
    pub fn len(&self) -> usize {
        self.historical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.historical.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Display rounding shared by the detail and summary tables
// ---------------------------------------------------------------------------

/// Occupancy fraction as a whole percentage, rounding half to even.
pub fn occupancy_percent(rate: f64) -> i64 {
    (rate * 100.0).round_ties_even() as i64
}

/// `"60%"`.
pub fn occupancy_label(rate: f64) -> String {
    format!("{}%", occupancy_percent(rate))
}

/// Round to one decimal place, half to even.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(id: &str, name: &str, year: i32, placed: i64, rate: f64, grade: f64) -> HistoricalRecord {
        HistoricalRecord {
            course_id: CourseId::from(id),
            course_name: name.to_string(),
            university: Some("Universidade de Lisboa".to_string()),
            faculty: Some("Instituto Superior de Economia e Gestão".to_string()),
            year,
            initial_slots: 20,
            placed,
            occupancy_rate: rate,
            last_grade: grade,
            remaining_slots: 20 - placed,
        }
    }

    pub fn prediction(id: &str, placed: f64, grade: f64) -> PredictionRecord {
        PredictionRecord {
            course_id: CourseId::from(id),
            predicted_placed: placed,
            predicted_grade: grade,
        }
    }

    /// C1 from 2020 to 2024 with a prediction, C2 from 2022 to 2024 without.
    pub fn sample_dataset() -> Dataset {
        let placed = [10, 12, 11, 13, 14];
        let rates = [0.5, 0.6, 0.55, 0.65, 0.7];
        let grades = [12.1, 12.4, 12.0, 13.2, 13.5];
        let mut historical: Vec<HistoricalRecord> = (0..5)
            .map(|i| record("C1", "Economia", 2020 + i as i32, placed[i], rates[i], grades[i]))
            .collect();
        for (i, year) in (2022..=2024).enumerate() {
            historical.push(record("C2", "Gestão", year, 15 + i as i64, 0.75, 14.0 + i as f64));
        }
        Dataset::new(historical, vec![prediction("C1", 15.0, 14.2)])
    }
}
