use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use super::model::{
    Dataset, HistoricalRecord, PredictionRecord, RawHistoricalRow, RawPredictionRow,
    RowRejection, Table,
};
use crate::error::{LoadError, RowError};

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Paths of the two input tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSources {
    pub historical: PathBuf,
    pub predictions: PathBuf,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load and validate both tables. Each file is dispatched by extension.
///
/// Supported formats:
/// * `.csv`     – header row with the column names, extra columns ignored
/// * `.json`    – `[{ "course_id": ..., "curso": ..., ... }, ...]`
/// * `.parquet` – any integer/float/string physical types
pub fn load_dataset(sources: &DataSources) -> Result<Dataset, LoadError> {
    let (historical, mut rejections) =
        validate_rows::<RawHistoricalRow, HistoricalRecord>(&sources.historical, Table::Historical)?;
    let (predictions, prediction_rejections) =
        validate_rows::<RawPredictionRow, PredictionRecord>(&sources.predictions, Table::Predictions)?;
    rejections.extend(prediction_rejections);

    let dataset = Dataset::with_rejections(historical, predictions, rejections);
    log::info!(
        "Loaded {} historical rows and {} predictions ({} rows rejected)",
        dataset.len(),
        dataset.prediction_count(),
        dataset.report().rejections.len()
    );
    Ok(dataset)
}

fn validate_rows<R, T>(
    path: &Path,
    table: Table,
) -> Result<(Vec<(usize, T)>, Vec<RowRejection>), LoadError>
where
    R: RawRow,
    T: TryFrom<R, Error = RowError>,
{
    let raw = read_rows::<R>(path)?;
    let mut records = Vec::with_capacity(raw.len());
    let mut rejections = Vec::new();

    for (i, row) in raw.into_iter().enumerate() {
        let row_no = i + 1;
        match T::try_from(row) {
            Ok(record) => records.push((row_no, record)),
            Err(reason) => {
                log::warn!("Rejected {table} row {row_no}: {reason}");
                rejections.push(RowRejection {
                    table,
                    row: row_no,
                    reason,
                });
            }
        }
    }
    Ok((records, rejections))
}

// ---------------------------------------------------------------------------
// Raw row sources
// ---------------------------------------------------------------------------

/// A row shape that can be read from any supported format.
pub trait RawRow: DeserializeOwned + Sized {
    /// Columns that must exist in the file header / schema.
    const COLUMNS: &'static [&'static str];

    /// Extract all rows of a Parquet record batch.
    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>>;
}

impl RawRow for RawHistoricalRow {
    const COLUMNS: &'static [&'static str] = &[
        "course_id",
        "curso",
        "nome_universidade",
        "nome_faculdade",
        "ano",
        "vagas_iniciais",
        "colocados",
        "taxa_ocupacao",
        "nota_ultimo_colocado",
        "vagas_sobrantes",
    ];

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let course_id = text_column(batch, "course_id")?;
        let curso = text_column(batch, "curso")?;
        let universidade = text_column(batch, "nome_universidade")?;
        let faculdade = text_column(batch, "nome_faculdade")?;
        let ano = number_column(batch, "ano")?;
        let vagas = number_column(batch, "vagas_iniciais")?;
        let colocados = number_column(batch, "colocados")?;
        let taxa = number_column(batch, "taxa_ocupacao")?;
        let nota = number_column(batch, "nota_ultimo_colocado")?;
        let sobrantes = number_column(batch, "vagas_sobrantes")?;

        Ok((0..batch.num_rows())
            .map(|row| RawHistoricalRow {
                course_id: course_id[row].clone(),
                curso: curso[row].clone(),
                nome_universidade: universidade[row].clone(),
                nome_faculdade: faculdade[row].clone(),
                ano: ano[row],
                vagas_iniciais: vagas[row],
                colocados: colocados[row],
                taxa_ocupacao: taxa[row],
                nota_ultimo_colocado: nota[row],
                vagas_sobrantes: sobrantes[row],
            })
            .collect())
    }
}

impl RawRow for RawPredictionRow {
    const COLUMNS: &'static [&'static str] = &[
        "course_id",
        "colocados_previsto",
        "nota_ultimo_colocado_prevista",
    ];

    fn from_batch(batch: &RecordBatch) -> Result<Vec<Self>> {
        let course_id = text_column(batch, "course_id")?;
        let placed = number_column(batch, "colocados_previsto")?;
        let grade = number_column(batch, "nota_ultimo_colocado_prevista")?;

        Ok((0..batch.num_rows())
            .map(|row| RawPredictionRow {
                course_id: course_id[row].clone(),
                colocados_previsto: placed[row],
                nota_ultimo_colocado_prevista: grade[row],
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Csv,
    Json,
    Parquet,
}

fn detect_format(path: &Path) -> Result<Format, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => Ok(Format::Csv),
        "json" => Ok(Format::Json),
        "parquet" | "pq" => Ok(Format::Parquet),
        _ => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Read every row of one table file without validating field values.
pub fn read_rows<R: RawRow>(path: &Path) -> Result<Vec<R>, LoadError> {
    if !path.exists() {
        return Err(LoadError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let result = match detect_format(path)? {
        Format::Csv => read_csv(path),
        Format::Json => read_json(path),
        Format::Parquet => read_parquet(path),
    };
    result.map_err(|e| LoadError::Malformed {
        path: path.to_path_buf(),
        message: format!("{e:#}"),
    })
}

fn check_columns<'a>(required: &[&str], present: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let present: Vec<&str> = present.into_iter().map(str::trim).collect();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !present.contains(col))
        .collect();
    if !missing.is_empty() {
        bail!("missing column(s): {}", missing.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn read_csv<R: RawRow>(path: &Path) -> Result<Vec<R>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .context("opening CSV")?;
    let headers = reader.headers().context("reading CSV headers")?.clone();
    check_columns(R::COLUMNS, headers.iter())?;

    reader
        .deserialize::<R>()
        .enumerate()
        .map(|(i, row)| row.with_context(|| format!("CSV row {}", i + 1)))
        .collect()
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
fn read_json<R: RawRow>(path: &Path) -> Result<Vec<R>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = match root {
        JsonValue::Array(records) => records,
        _ => bail!("Expected top-level JSON array"),
    };

    if let Some(first) = records.first() {
        let obj = first.as_object().context("Row 1 is not a JSON object")?;
        check_columns(R::COLUMNS, obj.keys().map(String::as_str))?;
    }

    records
        .into_iter()
        .enumerate()
        .map(|(i, rec)| {
            serde_json::from_value(rec).with_context(|| format!("JSON row {}", i + 1))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); column types are cast on read.
fn read_parquet<R: RawRow>(path: &Path) -> Result<Vec<R>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    check_columns(
        R::COLUMNS,
        builder.schema().fields().iter().map(|f| f.name().as_str()),
    )?;
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        rows.extend(R::from_batch(&batch)?);
    }
    Ok(rows)
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Parquet file missing '{name}' column"))
}

fn text_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    let text = cast(column(batch, name)?, &DataType::Utf8)
        .with_context(|| format!("column '{name}' cannot be read as text"))?;
    let text = text.as_string::<i32>();
    Ok((0..text.len())
        .map(|row| {
            if text.is_null(row) {
                return None;
            }
            let value = text.value(row).trim();
            (!value.is_empty()).then(|| value.to_string())
        })
        .collect())
}

fn number_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let numbers = cast(column(batch, name)?, &DataType::Float64)
        .with_context(|| format!("column '{name}' cannot be read as a number"))?;
    Ok(numbers.as_primitive::<Float64Type>().iter().collect())
}

// ---------------------------------------------------------------------------
// Memoized loader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    sources: DataSources,
    historical_modified: SystemTime,
    predictions_modified: SystemTime,
}

impl CacheKey {
    fn probe(sources: &DataSources) -> Result<Self, LoadError> {
        Ok(CacheKey {
            sources: sources.clone(),
            historical_modified: modified(&sources.historical)?,
            predictions_modified: modified(&sources.predictions)?,
        })
    }
}

fn modified(path: &Path) -> Result<SystemTime, LoadError> {
    let io_error = |source: std::io::Error| {
        if source.kind() == std::io::ErrorKind::NotFound {
            LoadError::MissingInput {
                path: path.to_path_buf(),
            }
        } else {
            LoadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    };
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(io_error)
}

/// Loads the dataset once and hands out the same `Arc` until a source path
/// or a file modification time changes.
#[derive(Debug, Default)]
pub struct DatasetCache {
    entry: Option<(CacheKey, Arc<Dataset>)>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, sources: &DataSources) -> Result<Arc<Dataset>, LoadError> {
        let key = CacheKey::probe(sources)?;
        if let Some((cached_key, dataset)) = &self.entry {
            if *cached_key == key {
                return Ok(Arc::clone(dataset));
            }
            log::debug!("Dataset sources changed, reloading");
        }

        let dataset = Arc::new(load_dataset(sources)?);
        self.entry = Some((key, Arc::clone(&dataset)));
        Ok(dataset)
    }

    /// Drop the cached dataset so the next call reads from disk.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.entry.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("a.CSV")).unwrap(), Format::Csv);
        assert_eq!(detect_format(Path::new("a.json")).unwrap(), Format::Json);
        assert_eq!(detect_format(Path::new("a.pq")).unwrap(), Format::Parquet);
        assert!(matches!(
            detect_format(Path::new("a.xlsx")),
            Err(LoadError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_check_columns_reports_missing() {
        let err = check_columns(&["course_id", "ano"], ["course_id", "curso"]).unwrap_err();
        assert_eq!(err.to_string(), "missing column(s): ano");
        assert!(check_columns(&["course_id"], [" course_id "]).is_ok());
    }

    #[test]
    fn test_missing_file() {
        let result = read_rows::<RawPredictionRow>(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(LoadError::MissingInput { .. })));

        let mut cache = DatasetCache::new();
        let sources = DataSources {
            historical: PathBuf::from("/definitely/not/here.csv"),
            predictions: PathBuf::from("/definitely/not/there.csv"),
        };
        assert!(matches!(
            cache.get_or_load(&sources),
            Err(LoadError::MissingInput { .. })
        ));
        assert!(!cache.is_loaded());
    }
}
