//! Errors and diagnostics reported by the index core.
//!
//! Only two conditions are errors: a uniqueness conflict on insert and a
//! poisoned partition lock. Missing keys are not errors (deletes report
//! `Ok(false)`, lookups return an empty cursor) and structural damage is
//! reported by [`IndexCheck`] from an explicit consistency check.

use std::fmt;

use crate::types::{RowId, Value};

/// An insert found a live entry with an equal key in a unique index.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueViolation {
    /// Name of the index that rejected the insert.
    pub index_name: String,
    /// Key values of the rejected row, in index column order.
    pub key: Vec<Value>,
    /// Row already holding the key.
    pub existing_row: RowId,
}

impl fmt::Display for UniqueViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unique constraint violation on index {}: key (", self.index_name)?;
        for (i, value) in self.key.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ") already held by {}", self.existing_row)
    }
}

impl std::error::Error for UniqueViolation {}

/// Errors that can occur during index operations.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexError {
    /// Insert rejected by a uniqueness constraint.
    UniqueViolation(UniqueViolation),
    /// The storage partition lock was poisoned by a panicking writer.
    LockPoisoned,
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniqueViolation(e) => write!(f, "{e}"),
            Self::LockPoisoned => write!(f, "index store lock poisoned"),
        }
    }
}

impl std::error::Error for IndexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::UniqueViolation(e) => Some(e),
            Self::LockPoisoned => None,
        }
    }
}

impl From<UniqueViolation> for IndexError {
    fn from(e: UniqueViolation) -> Self {
        Self::UniqueViolation(e)
    }
}

/// Outcome of a structural consistency check.
///
/// Callers decide how severe a non-`Ok` result is; [`IndexCheck::code`] gives
/// the stable integer form for logs and system tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCheck {
    /// No inconsistency found.
    Ok,
    /// Two neighbouring entries are out of key order.
    Order,
    /// A parent/child link does not point back.
    Link,
    /// A node's stored height or balance is wrong.
    Balance,
    /// The reachable entry count differs from the recorded count.
    Count,
    /// A unique index holds two live entries with equal keys.
    DuplicateLiveKey,
}

impl IndexCheck {
    /// Integer diagnostic code (0 means consistent).
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Order => 1,
            Self::Link => 2,
            Self::Balance => 3,
            Self::Count => 4,
            Self::DuplicateLiveKey => 5,
        }
    }

    /// Returns true when no inconsistency was found.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl fmt::Display for IndexCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ok => "consistent",
            Self::Order => "entries out of order",
            Self::Link => "broken node link",
            Self::Balance => "unbalanced node",
            Self::Count => "entry count mismatch",
            Self::DuplicateLiveKey => "duplicate live key in unique index",
        };
        write!(f, "{text} (code {})", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_display() {
        let e = IndexError::from(UniqueViolation {
            index_name: "pk_users".to_string(),
            key: vec![Value::Integer(1), Value::from("a")],
            existing_row: RowId(4),
        });
        assert_eq!(
            e.to_string(),
            "unique constraint violation on index pk_users: key (1, 'a') already held by row#4"
        );
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn test_check_codes() {
        assert_eq!(IndexCheck::Ok.code(), 0);
        assert!(IndexCheck::Ok.is_ok());
        assert_eq!(IndexCheck::DuplicateLiveKey.code(), 5);
        assert_eq!(IndexCheck::Link.to_string(), "broken node link (code 2)");
    }
}
