use std::ops::RangeInclusive;

use super::filter::course_rows;
use super::model::{occupancy_label, round_one_decimal, CourseId, Dataset, HistoricalRecord};
use crate::error::ViewError;

// ---------------------------------------------------------------------------
// Single-course view
// ---------------------------------------------------------------------------

/// Headline numbers of the single-course view.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseMetrics {
    /// Mean occupancy rate × 100.
    pub mean_occupancy_percent: f64,
    pub mean_grade: f64,
    /// Most recent year in the filtered range.
    pub last_year: i32,
    pub last_grade: f64,
    pub last_placed: i64,
    /// Absent when the course has no prediction.
    pub forecast: Option<ForecastMetrics>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastMetrics {
    pub year: i32,
    pub grade: f64,
    pub placed: i64,
}

/// One line of the detail table.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub year: i32,
    pub initial_slots: i64,
    pub placed: i64,
    /// `"70%"`
    pub occupancy: String,
    pub grade: f64,
    pub remaining_slots: i64,
}

impl DetailRow {
    fn from_record(r: &HistoricalRecord) -> Self {
        DetailRow {
            year: r.year,
            initial_slots: r.initial_slots,
            placed: r.placed,
            occupancy: occupancy_label(r.occupancy_rate),
            grade: round_one_decimal(r.last_grade),
            remaining_slots: r.remaining_slots,
        }
    }
}

/// Everything the evolution tab shows for one course.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseEvolution {
    pub course_id: CourseId,
    pub course_name: String,
    pub university: Option<String>,
    pub faculty: Option<String>,
    pub metrics: CourseMetrics,
    /// (year, placed students), ascending by year.
    pub placed_series: Vec<[f64; 2]>,
    /// (year, admission grade), ascending by year.
    pub grade_series: Vec<[f64; 2]>,
    pub detail: Vec<DetailRow>,
}

impl CourseEvolution {
    /// Build the view for `course_id` restricted to `years`.
    ///
    /// Returns [`ViewError::NoData`] when no row matches.
    pub fn build(
        dataset: &Dataset,
        course_id: &CourseId,
        years: RangeInclusive<i32>,
        forecast_year: i32,
    ) -> Result<Self, ViewError> {
        let rows = course_rows(dataset, course_id, &years);
        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            log::debug!("No rows for course {course_id} in {years:?}");
            return Err(ViewError::NoData);
        };

        let n = rows.len() as f64;
        let mean_occupancy = rows.iter().map(|r| r.occupancy_rate).sum::<f64>() / n;
        let mean_grade = rows.iter().map(|r| r.last_grade).sum::<f64>() / n;

        let forecast = dataset.prediction(course_id).map(|p| ForecastMetrics {
            year: forecast_year,
            grade: p.predicted_grade,
            placed: p.predicted_placed_count(),
        });

        Ok(CourseEvolution {
            course_id: course_id.clone(),
            course_name: first.course_name.clone(),
            university: first.university.clone(),
            faculty: first.faculty.clone(),
            metrics: CourseMetrics {
                mean_occupancy_percent: mean_occupancy * 100.0,
                mean_grade,
                last_year: last.year,
                last_grade: last.last_grade,
                last_placed: last.placed,
                forecast,
            },
            placed_series: rows.iter().map(|r| [r.year as f64, r.placed as f64]).collect(),
            grade_series: rows.iter().map(|r| [r.year as f64, r.last_grade]).collect(),
            detail: rows.iter().map(|r| DetailRow::from_record(r)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::sample_dataset;

    #[test]
    fn test_example_course_metrics() {
        let ds = sample_dataset();
        let view = CourseEvolution::build(&ds, &"C1".into(), 2020..=2024, 2025).unwrap();

        assert!((view.metrics.mean_occupancy_percent - 60.0).abs() < 1e-9);
        assert_eq!(format!("{:.0}%", view.metrics.mean_occupancy_percent), "60%");
        assert_eq!(view.metrics.last_year, 2024);
        assert_eq!(view.metrics.last_placed, 14);
        let forecast = view.metrics.forecast.as_ref().unwrap();
        assert_eq!(forecast.placed, 15);
        assert_eq!(forecast.grade, 14.2);
        assert_eq!(forecast.year, 2025);
    }

    #[test]
    fn test_series_ascending_by_year() {
        let ds = sample_dataset();
        let view = CourseEvolution::build(&ds, &"C1".into(), 2021..=2023, 2025).unwrap();
        assert_eq!(
            view.placed_series,
            vec![[2021.0, 12.0], [2022.0, 11.0], [2023.0, 13.0]]
        );
        assert_eq!(view.grade_series[0], [2021.0, 12.4]);
        assert_eq!(view.metrics.last_year, 2023);
    }

    #[test]
    fn test_no_prediction_omits_forecast() {
        let ds = sample_dataset();
        let view = CourseEvolution::build(&ds, &"C2".into(), 2020..=2024, 2025).unwrap();
        assert!(view.metrics.forecast.is_none());
        assert_eq!(view.course_name, "Gestão");
    }

    #[test]
    fn test_empty_range_is_no_data() {
        let ds = sample_dataset();
        assert_eq!(
            CourseEvolution::build(&ds, &"C1".into(), 2010..=2015, 2025),
            Err(ViewError::NoData)
        );
        assert_eq!(
            CourseEvolution::build(&ds, &"missing".into(), 2020..=2024, 2025),
            Err(ViewError::NoData)
        );
    }

    #[test]
    fn test_detail_rows() {
        let ds = sample_dataset();
        let view = CourseEvolution::build(&ds, &"C1".into(), 2020..=2024, 2025).unwrap();
        assert_eq!(view.detail.len(), 5);
        let last = &view.detail[4];
        assert_eq!(last.year, 2024);
        assert_eq!(last.initial_slots, 20);
        assert_eq!(last.placed, 14);
        assert_eq!(last.occupancy, "70%");
        assert_eq!(last.grade, 13.5);
        assert_eq!(last.remaining_slots, 6);
    }

    #[test]
    fn test_build_is_idempotent() {
        let ds = sample_dataset();
        let a = CourseEvolution::build(&ds, &"C1".into(), 2020..=2024, 2025);
        let b = CourseEvolution::build(&ds, &"C1".into(), 2020..=2024, 2025);
        assert_eq!(a, b);
    }
}
