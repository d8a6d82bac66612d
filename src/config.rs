use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::data::filter::Preferred;
use crate::data::loader::DataSources;

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Settings read from an optional TOML file; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub historical_path: PathBuf,
    pub predictions_path: PathBuf,
    /// Picked first in the university select when present in the data.
    pub default_university: String,
    /// Picked first in the faculty select when present in the data.
    pub default_faculty: String,
    /// Course names pre-selected for comparison (within the default
    /// university and faculty).
    pub default_courses: Vec<String>,
    pub forecast_year: i32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            historical_path: PathBuf::from("cleaned_data.csv"),
            predictions_path: PathBuf::from("predictions_2025.csv"),
            default_university: "Universidade de Lisboa".to_string(),
            default_faculty: "Instituto Superior de Economia e Gestão".to_string(),
            default_courses: vec!["Economia".to_string(), "Gestão".to_string()],
            forecast_year: 2025,
        }
    }
}

impl DashboardConfig {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: DashboardConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn sources(&self) -> DataSources {
        DataSources {
            historical: self.historical_path.clone(),
            predictions: self.predictions_path.clone(),
        }
    }

    pub fn preferred(&self) -> Preferred<'_> {
        Preferred {
            university: Some(self.default_university.as_str()),
            faculty: Some(self.default_faculty.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "course-dashboard", about = "Painel de Análise de Cursos", version)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Historical table (.csv, .json or .parquet)
    #[arg(long)]
    pub historical: Option<PathBuf>,

    /// Predictions table (.csv, .json or .parquet)
    #[arg(long)]
    pub predictions: Option<PathBuf>,
}

impl Cli {
    /// Config file (or defaults) with command-line paths applied on top.
    pub fn into_config(self) -> anyhow::Result<DashboardConfig> {
        let mut config = match &self.config {
            Some(path) => DashboardConfig::load_from_file(path)?,
            None => DashboardConfig::default(),
        };
        if let Some(path) = self.historical {
            config.historical_path = path;
        }
        if let Some(path) = self.predictions {
            config.predictions_path = path;
        }
        Ok(config)
    }
}
