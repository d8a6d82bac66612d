use std::collections::{BTreeSet, HashSet};
use std::ops::RangeInclusive;

use super::model::{CourseId, Dataset, HistoricalRecord};

// ---------------------------------------------------------------------------
// Picks: what the user has chosen in the three selects
// ---------------------------------------------------------------------------

/// University / faculty / course picks of one tab. Survives across frames so
/// a pick stays put while it is still a valid option.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Picks {
    pub university: Option<String>,
    pub faculty: Option<String>,
    pub course: Option<CourseId>,
}

/// Preferred university/faculty used when there is no valid previous pick.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preferred<'a> {
    pub university: Option<&'a str>,
    pub faculty: Option<&'a str>,
}

/// One entry of the course select: identifier → display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOption {
    pub id: CourseId,
    pub name: String,
}

/// Options of the three selects plus the picks they resolve to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolved {
    pub universities: Vec<String>,
    pub faculties: Vec<String>,
    pub courses: Vec<CourseOption>,
    pub picks: Picks,
}

impl Resolved {
    /// Display name of the picked course.
    pub fn course_name(&self) -> Option<&str> {
        let id = self.picks.course.as_ref()?;
        self.courses
            .iter()
            .find(|c| &c.id == id)
            .map(|c| c.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Option lists
// ---------------------------------------------------------------------------

fn distinct_descending<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let unique: BTreeSet<&str> = names.collect();
    unique.into_iter().rev().map(str::to_string).collect()
}

/// Distinct non-null university names, descending.
pub fn university_options(records: &[HistoricalRecord]) -> Vec<String> {
    distinct_descending(records.iter().filter_map(|r| r.university.as_deref()))
}

/// Distinct non-null faculty names of one university, descending.
pub fn faculty_options(records: &[HistoricalRecord], university: &str) -> Vec<String> {
    distinct_descending(
        records
            .iter()
            .filter(|r| r.university.as_deref() == Some(university))
            .filter_map(|r| r.faculty.as_deref()),
    )
}

/// Courses of one university and faculty, first occurrence per identifier,
/// ordered by name (ties keep table order).
pub fn course_options(
    records: &[HistoricalRecord],
    university: &str,
    faculty: &str,
) -> Vec<CourseOption> {
    let mut seen: HashSet<&CourseId> = HashSet::new();
    let mut options: Vec<CourseOption> = records
        .iter()
        .filter(|r| {
            r.university.as_deref() == Some(university) && r.faculty.as_deref() == Some(faculty)
        })
        .filter(|r| seen.insert(&r.course_id))
        .map(|r| CourseOption {
            id: r.course_id.clone(),
            name: r.course_name.clone(),
        })
        .collect();
    options.sort_by(|a, b| a.name.cmp(&b.name));
    options
}

/// Keep `previous` if it is still offered, else `preferred`, else the first option.
fn pick(options: &[String], previous: Option<&str>, preferred: Option<&str>) -> Option<String> {
    previous
        .filter(|p| options.iter().any(|o| o.as_str() == *p))
        .or_else(|| preferred.filter(|p| options.iter().any(|o| o.as_str() == *p)))
        .map(str::to_string)
        .or_else(|| options.first().cloned())
}

// ---------------------------------------------------------------------------
// Hierarchical resolution
// ---------------------------------------------------------------------------

/// Resolve university → faculty → course against the historical table.
///
/// Any level may end up with no options (e.g. a stale pick after the data
/// changed); its pick is then `None` and every level below is empty.
pub fn resolve(dataset: &Dataset, previous: &Picks, preferred: Preferred<'_>) -> Resolved {
    let records = dataset.historical();

    let universities = university_options(records);
    let university = pick(
        &universities,
        previous.university.as_deref(),
        preferred.university,
    );

    let faculties = university
        .as_deref()
        .map(|u| faculty_options(records, u))
        .unwrap_or_default();
    let faculty = pick(&faculties, previous.faculty.as_deref(), preferred.faculty);

    let courses = match (university.as_deref(), faculty.as_deref()) {
        (Some(u), Some(f)) => course_options(records, u, f),
        _ => Vec::new(),
    };
    let course = previous
        .course
        .as_ref()
        .filter(|id| courses.iter().any(|c| &c.id == *id))
        .cloned()
        .or_else(|| courses.first().map(|c| c.id.clone()));

    Resolved {
        universities,
        faculties,
        courses,
        picks: Picks {
            university,
            faculty,
            course,
        },
    }
}

// ---------------------------------------------------------------------------
// Row selection
// ---------------------------------------------------------------------------

/// Rows of one course within an inclusive year range, ascending by year.
pub fn course_rows<'a>(
    dataset: &'a Dataset,
    course_id: &CourseId,
    years: &RangeInclusive<i32>,
) -> Vec<&'a HistoricalRecord> {
    let mut rows: Vec<&HistoricalRecord> = dataset
        .historical()
        .iter()
        .filter(|r| &r.course_id == course_id && years.contains(&r.year))
        .collect();
    rows.sort_by_key(|r| r.year);
    rows
}

/// Every row of one course, ascending by year.
pub fn all_course_rows<'a>(dataset: &'a Dataset, course_id: &CourseId) -> Vec<&'a HistoricalRecord> {
    course_rows(dataset, course_id, &(i32::MIN..=i32::MAX))
}
