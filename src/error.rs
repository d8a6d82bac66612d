use std::path::PathBuf;

use thiserror::Error;

use crate::data::model::CourseId;

// ---------------------------------------------------------------------------
// Load errors – fatal for the current frame
// ---------------------------------------------------------------------------

/// Failure to turn the two input files into a [`Dataset`](crate::data::model::Dataset).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Arquivo '{}' não encontrado. Abra os conjuntos de dados pelo menu Arquivo.", path.display())]
    MissingInput { path: PathBuf },

    #[error("Formato não suportado: '{}' (use .csv, .json ou .parquet)", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Erro ao acessar '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unreadable or structurally invalid file. `message` carries the full
    /// context chain of the underlying failure.
    #[error("Arquivo '{}' inválido: {message}", path.display())]
    Malformed { path: PathBuf, message: String },
}

// ---------------------------------------------------------------------------
// Row errors – one rejected row, never fatal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("missing value in column '{0}'")]
    Missing(&'static str),

    #[error("column '{column}' expects an integer, got {value}")]
    NotInteger { column: &'static str, value: f64 },

    #[error("duplicate record for course {course_id} in {year}")]
    DuplicateYear { course_id: CourseId, year: i32 },

    #[error("course {course_id} has a different '{column}' than its first row")]
    InconsistentCourse {
        course_id: CourseId,
        column: &'static str,
    },

    #[error("duplicate prediction for course {0}")]
    DuplicatePrediction(CourseId),
}

// ---------------------------------------------------------------------------
// View errors – informational notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewError {
    #[error("Nenhum dado encontrado para o curso e período selecionados.")]
    NoData,

    #[error("Selecione cursos para comparar usando os filtros do painel lateral.")]
    EmptyComparison,
}
