use serde::{Deserialize, Serialize};

/// Identifier of the entity undergoing a change (for example a user id).
///
/// Always strictly positive. Wraps the database key so it cannot be mixed
/// up with unrelated integers such as counts or versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(i64);

impl SubjectId {
    /// Creates a subject ID, returning `None` unless `id` is positive.
    pub fn new(id: i64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    /// Returns the underlying integer key.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SubjectId> for i64 {
    fn from(id: SubjectId) -> Self {
        id.0
    }
}

impl TryFrom<i64> for SubjectId {
    type Error = i64;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id).ok_or(id)
    }
}
