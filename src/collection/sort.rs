// ============================================================================
// Multi-key record sorting
// ============================================================================
//
// Each key names a property and a direction. Keys are compared in order; the
// first non-equal key decides. NULLs sort last ascending and first
// descending unless a key says otherwise.
//
// ============================================================================

use std::cmp::Ordering;

use crate::core::{Result, Value};

/// Where NULL values land relative to everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

impl NullOrdering {
    /// ASC → NULLS LAST, DESC → NULLS FIRST
    pub fn default_for_direction(descending: bool) -> Self {
        if descending {
            Self::NullsFirst
        } else {
            Self::NullsLast
        }
    }
}

/// One property of a multi-key sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub property: String,
    pub descending: bool,
    pub null_ordering: NullOrdering,
}

impl SortKey {
    pub fn new(property: impl Into<String>, descending: bool) -> Self {
        Self {
            property: property.into(),
            descending,
            null_ordering: NullOrdering::default_for_direction(descending),
        }
    }

    pub fn asc(property: impl Into<String>) -> Self {
        Self::new(property, false)
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self::new(property, true)
    }

    pub fn with_null_ordering(mut self, null_ordering: NullOrdering) -> Self {
        self.null_ordering = null_ordering;
        self
    }
}

/// Compares pre-extracted key values, one value per sort key.
pub struct RecordComparator<'a> {
    sort_keys: &'a [SortKey],
}

impl<'a> RecordComparator<'a> {
    pub fn new(sort_keys: &'a [SortKey]) -> Self {
        Self { sort_keys }
    }

    pub fn compare(&self, left: &[Value], right: &[Value]) -> Result<Ordering> {
        for (index, key) in self.sort_keys.iter().enumerate() {
            let ordering = compare_values(&left[index], &right[index], key)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }
        Ok(Ordering::Equal)
    }
}

fn compare_values(left: &Value, right: &Value, key: &SortKey) -> Result<Ordering> {
    let ordering = match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match key.null_ordering {
            NullOrdering::NullsFirst => Ordering::Less,
            NullOrdering::NullsLast => Ordering::Greater,
        },
        (false, true) => match key.null_ordering {
            NullOrdering::NullsFirst => Ordering::Greater,
            NullOrdering::NullsLast => Ordering::Less,
        },
        (false, false) => left.compare(right)?,
    };

    // null placement is absolute, direction only flips real comparisons
    if key.descending && !(left.is_null() || right.is_null()) {
        Ok(ordering.reverse())
    } else {
        Ok(ordering)
    }
}

/// Stable sort of `entries` by their key values. The first comparison error
/// is returned and leaves the order unspecified.
pub fn sort_entries<T>(entries: &mut [(Vec<Value>, T)], sort_keys: &[SortKey]) -> Result<()> {
    if entries.is_empty() || sort_keys.is_empty() {
        return Ok(());
    }

    let comparator = RecordComparator::new(sort_keys);
    let mut failure = None;
    entries.sort_by(|(left, _), (right, _)| match comparator.compare(left, right) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
