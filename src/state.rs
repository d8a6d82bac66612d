use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::data::comparison::{default_summary_year, summary_year_options};
use crate::data::filter::{resolve, Picks, Resolved};
use crate::data::loader::DatasetCache;
use crate::data::model::Dataset;
use crate::selection::{SelectionAction, SelectionSet};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Evolution,
    Comparison,
}

/// The full session state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    cache: DatasetCache,

    /// Loaded dataset (None until both files could be read).
    pub dataset: Option<Arc<Dataset>>,

    /// Load failure shown instead of the views.
    pub load_error: Option<String>,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,

    pub tab: Tab,

    /// Picks of the evolution tab.
    pub evolution_picks: Picks,

    /// Picks of the comparison tab.
    pub comparison_picks: Picks,

    /// Inclusive year range of the evolution view.
    pub year_range: Option<(i32, i32)>,

    /// Courses chosen for comparison; filled with defaults on first use.
    selection: Option<SelectionSet>,

    /// Summary years in the order they were picked. `None` until the user
    /// touches the picker, meaning "most recent year".
    summary_years: Option<Vec<i32>>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::new(),
            dataset: None,
            load_error: None,
            status_message: None,
            tab: Tab::default(),
            evolution_picks: Picks::default(),
            comparison_picks: Picks::default(),
            year_range: None,
            selection: None,
            summary_years: None,
        }
    }

    /// Make sure the dataset reflects the files on disk. Cheap when nothing
    /// changed. Returns whether a dataset is available.
    pub fn refresh_dataset(&mut self) -> bool {
        match self.cache.get_or_load(&self.config.sources()) {
            Ok(dataset) => {
                let unchanged = self
                    .dataset
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &dataset));
                if !unchanged {
                    self.set_dataset(dataset);
                }
                self.load_error = None;
                true
            }
            Err(e) => {
                if self.load_error.is_none() {
                    log::error!("Failed to load data: {e}");
                }
                self.load_error = Some(e.to_string());
                self.dataset = None;
                false
            }
        }
    }

    /// Ingest a newly loaded dataset and reset the year range to its span.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.year_range = dataset.year_bounds();
        self.status_message = if dataset.is_empty() {
            log::warn!("Historical table has no valid rows");
            Some("Nenhum registro histórico válido".to_string())
        } else {
            (!dataset.report().is_clean()).then(|| {
                format!(
                    "{} linhas inválidas ignoradas",
                    dataset.report().rejections.len()
                )
            })
        };
        self.dataset = Some(dataset);
    }

    /// Force a re-read of both files.
    pub fn reload(&mut self) {
        self.cache.invalidate();
        self.refresh_dataset();
    }

    pub fn set_historical_path(&mut self, path: PathBuf) {
        self.config.historical_path = path;
        self.refresh_dataset();
    }

    pub fn set_predictions_path(&mut self, path: PathBuf) {
        self.config.predictions_path = path;
        self.refresh_dataset();
    }

    /// Resolve the evolution tab's selects and remember the result.
    pub fn resolve_evolution(&mut self) -> Option<Resolved> {
        let dataset = self.dataset.as_ref()?;
        let resolved = resolve(dataset, &self.evolution_picks, self.config.preferred());
        self.evolution_picks = resolved.picks.clone();
        Some(resolved)
    }

    /// Resolve the comparison tab's selects and remember the result.
    pub fn resolve_comparison(&mut self) -> Option<Resolved> {
        let dataset = self.dataset.as_ref()?;
        let resolved = resolve(dataset, &self.comparison_picks, self.config.preferred());
        self.comparison_picks = resolved.picks.clone();
        Some(resolved)
    }

    pub fn year_range(&self) -> Option<RangeInclusive<i32>> {
        self.year_range.map(|(from, to)| from..=to)
    }

    /// Update one end of the year range, keeping `from <= to`.
    pub fn set_year_range(&mut self, from: i32, to: i32) {
        self.year_range = Some((from.min(to), from.max(to)));
    }

    /// The comparison selection, created with the configured defaults the
    /// first time it is needed.
    pub fn selection(&mut self) -> &SelectionSet {
        let dataset = self.dataset.clone();
        let config = &self.config;
        self.selection.get_or_insert_with(|| match dataset {
            Some(ds) => SelectionSet::with_defaults(
                &ds,
                &config.default_university,
                &config.default_faculty,
                &config.default_courses,
            ),
            None => SelectionSet::new(),
        })
    }

    /// Apply a selection change. Returns whether a repaint is needed.
    pub fn apply_selection(&mut self, action: SelectionAction) -> bool {
        self.selection();
        match self.selection.as_mut() {
            Some(selection) => selection.apply(action),
            None => false,
        }
    }

    /// Year options of the summary table.
    pub fn summary_year_options(&mut self) -> Vec<i32> {
        let forecast_year = self.config.forecast_year;
        let Some(dataset) = self.dataset.clone() else {
            return Vec::new();
        };
        summary_year_options(&dataset, self.selection(), forecast_year)
    }

    /// Picked summary years in pick order, limited to the current options.
    pub fn summary_years(&mut self) -> Vec<i32> {
        let options = self.summary_year_options();
        if let Some(years) = &self.summary_years {
            return years
                .iter()
                .copied()
                .filter(|y| options.contains(y))
                .collect();
        }
        let Some(dataset) = self.dataset.clone() else {
            return Vec::new();
        };
        default_summary_year(&dataset, self.selection())
            .into_iter()
            .collect()
    }

    /// Add or remove one summary year.
    pub fn toggle_summary_year(&mut self, year: i32) {
        let mut years = self.summary_years();
        match years.iter().position(|&y| y == year) {
            Some(pos) => {
                years.remove(pos);
            }
            None => years.push(year),
        }
        self.summary_years = Some(years);
    }
}
