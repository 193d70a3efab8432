use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Sentinel value meaning "unconstrained" for a dimension.
pub const ALL: &str = "All";

/// One filterable axis of the cascading form.
///
/// Dimensions form a strict dependency chain in the order
/// `scheme -> branch -> semester -> subject`: the valid option set of a
/// dimension may depend on the resolved ids of dimensions before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Scheme,
    Branch,
    Semester,
    Subject,
}

/// The fixed chain order.
pub const DIMENSIONS: [Dimension; 4] = [
    Dimension::Scheme,
    Dimension::Branch,
    Dimension::Semester,
    Dimension::Subject,
];

impl Dimension {
    /// Position in the chain, 0-based.
    pub fn index(self) -> usize {
        match self {
            Dimension::Scheme => 0,
            Dimension::Branch => 1,
            Dimension::Semester => 2,
            Dimension::Subject => 3,
        }
    }

    /// The next dimension in the chain, if any.
    pub fn next(self) -> Option<Dimension> {
        DIMENSIONS.get(self.index() + 1).copied()
    }

    /// Every dimension strictly after this one in the chain.
    pub fn downstream(self) -> &'static [Dimension] {
        &DIMENSIONS[self.index() + 1..]
    }

    /// Display label, e.g. for dropdown headers.
    pub fn label(self) -> &'static str {
        match self {
            Dimension::Scheme => "Scheme",
            Dimension::Branch => "Branch",
            Dimension::Semester => "Semester",
            Dimension::Subject => "Subject",
        }
    }

    /// Plural label used for the synthetic "All ..." option.
    pub fn label_plural(self) -> &'static str {
        match self {
            Dimension::Scheme => "Schemes",
            Dimension::Branch => "Branches",
            Dimension::Semester => "Semesters",
            Dimension::Subject => "Subjects",
        }
    }

    /// Lowercase key as used in query strings and page markup.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Scheme => "scheme",
            Dimension::Branch => "branch",
            Dimension::Semester => "semester",
            Dimension::Subject => "subject",
        }
    }

    /// Dimensions that must be selected (non-"All") before this one may be.
    ///
    /// Subject options are parameterized by both branch and semester; the
    /// other dimensions have no hard prerequisite.
    pub fn prerequisites(self) -> &'static [Dimension] {
        match self {
            Dimension::Subject => &[Dimension::Branch, Dimension::Semester],
            _ => &[],
        }
    }

    pub fn parse(key: &str) -> Option<Dimension> {
        match key {
            "scheme" | "schema" => Some(Dimension::Scheme),
            "branch" => Some(Dimension::Branch),
            "semester" | "sem" => Some(Dimension::Semester),
            "subject" => Some(Dimension::Subject),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Current state of one dimension: a display value plus the backend id it
/// resolved to. `id` is `Some` only if `value != "All"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub value: String,
    pub id: Option<String>,
}

impl Selection {
    /// The unconstrained state.
    pub fn all() -> Self {
        Selection {
            value: ALL.to_string(),
            id: None,
        }
    }

    pub fn is_all(&self) -> bool {
        self.value == ALL
    }
}

impl Default for Selection {
    fn default() -> Self {
        Selection::all()
    }
}

/// Rejected `set` calls. None of these mutate the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("empty value for dimension {0}")]
    EmptyValue(Dimension),

    #[error("id supplied for dimension {0} with value \"All\"")]
    IdOnAll(Dimension),

    #[error("cannot select {dimension} while {missing} is unset")]
    UnmetPrerequisite {
        dimension: Dimension,
        missing: Dimension,
    },
}

/// Holds the current `{value, id}` pair for each of the four dimensions.
///
/// The store is created unconstrained, mutated only through `set`/`reset`,
/// and enforces the chain invariant: setting a dimension resets everything
/// after it, so stale downstream selections never survive an upstream
/// change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionStore {
    slots: [Selection; 4],
}

impl SelectionStore {
    pub fn new() -> Self {
        SelectionStore::default()
    }

    /// Current state for a dimension. Never fails.
    pub fn get(&self, dimension: Dimension) -> &Selection {
        &self.slots[dimension.index()]
    }

    /// Overwrite the state for `dimension` and reset everything downstream.
    ///
    /// Setting the value `"All"` (with no id) is equivalent to `reset` plus
    /// the downstream cascade.
    ///
    /// # Errors
    /// Rejects, without mutating, an empty value, an id paired with `"All"`,
    /// or a concrete value for a dimension whose prerequisites are still
    /// unconstrained.
    pub fn set(
        &mut self,
        dimension: Dimension,
        value: &str,
        id: Option<&str>,
    ) -> Result<(), SelectionError> {
        if value.is_empty() {
            return Err(SelectionError::EmptyValue(dimension));
        }
        if value == ALL && id.is_some() {
            return Err(SelectionError::IdOnAll(dimension));
        }
        if value != ALL {
            for &prereq in dimension.prerequisites() {
                if self.get(prereq).is_all() {
                    return Err(SelectionError::UnmetPrerequisite {
                        dimension,
                        missing: prereq,
                    });
                }
            }
        }

        self.slots[dimension.index()] = Selection {
            value: value.to_string(),
            id: id.map(str::to_string),
        };
        for &d in dimension.downstream() {
            self.reset(d);
        }
        Ok(())
    }

    /// Set a dimension back to `{value: "All", id: None}`.
    pub fn reset(&mut self, dimension: Dimension) {
        self.slots[dimension.index()] = Selection::all();
    }

    /// Reset every dimension; the explicit "clear filters" action.
    pub fn reset_all(&mut self) {
        for &d in DIMENSIONS.iter() {
            self.reset(d);
        }
    }

    /// Dimensions currently constraining the document set.
    pub fn active_dimensions(&self) -> Vec<Dimension> {
        DIMENSIONS
            .iter()
            .copied()
            .filter(|&d| !self.get(d).is_all())
            .collect()
    }

    /// The four current `{value, id}` pairs, in chain order.
    pub fn summary(&self) -> Vec<(Dimension, Selection)> {
        DIMENSIONS
            .iter()
            .map(|&d| (d, self.get(d).clone()))
            .collect()
    }
}
