use std::collections::HashSet;

use crate::data::model::{CourseId, Dataset};

// ---------------------------------------------------------------------------
// Comparison selection set
// ---------------------------------------------------------------------------

/// Ordered, duplicate-free list of courses chosen for comparison.
///
/// Owned by the session; the comparison builder borrows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: Vec<CourseId>,
}

/// A pending change collected while the list is being drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionAction {
    Add(CourseId),
    Remove(CourseId),
    Clear,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first occurrence of each identifier.
    pub fn from_ids(ids: impl IntoIterator<Item = CourseId>) -> Self {
        let mut set = SelectionSet {
            ids: ids.into_iter().collect(),
        };
        set.dedup();
        set
    }

    /// Courses of `university` / `faculty` whose name is in `course_names`,
    /// in table order.
    pub fn with_defaults(
        dataset: &Dataset,
        university: &str,
        faculty: &str,
        course_names: &[String],
    ) -> Self {
        Self::from_ids(
            dataset
                .historical()
                .iter()
                .filter(|r| {
                    r.university.as_deref() == Some(university)
                        && r.faculty.as_deref() == Some(faculty)
                        && course_names.contains(&r.course_name)
                })
                .map(|r| r.course_id.clone()),
        )
    }

    /// Append `id` unless it is already selected. Returns whether it was added.
    pub fn add(&mut self, id: CourseId) -> bool {
        if self.contains(&id) {
            return false;
        }
        self.ids.push(id);
        self.dedup();
        true
    }

    /// Remove the entry equal to `id`. Returns whether one was removed.
    pub fn remove(&mut self, id: &CourseId) -> bool {
        let Some(pos) = self.ids.iter().position(|x| x == id) else {
            return false;
        };
        self.ids.remove(pos);
        self.dedup();
        true
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Apply a collected action. Returns whether the set changed.
    pub fn apply(&mut self, action: SelectionAction) -> bool {
        let changed = match action {
            SelectionAction::Add(id) => self.add(id),
            SelectionAction::Remove(id) => self.remove(&id),
            SelectionAction::Clear => {
                let was_empty = self.is_empty();
                self.clear();
                !was_empty
            }
        };
        if changed {
            log::debug!("Comparison selection is now {:?}", self.ids);
        }
        changed
    }

    pub fn contains(&self, id: &CourseId) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CourseId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn dedup(&mut self) {
        let mut seen = HashSet::with_capacity(self.ids.len());
        self.ids.retain(|id| seen.insert(id.clone()));
    }
}
