//! Probe operators and range bounds used to position cursors.

use std::fmt;

use crate::types::Value;

/// Comparison applied to the last matched column of a probe.
///
/// Inequalities are interpreted in index order: on a descending column,
/// `Greater` selects the entries that follow the probe in the index, which
/// are the smaller values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`; a null probe matches nothing.
    Equal,
    /// `IS NOT DISTINCT FROM`; a null probe matches null keys.
    NotDistinct,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `<`
    Smaller,
    /// `<=`
    SmallerEqual,
}

impl CompareOp {
    /// Returns true for the two equality operators.
    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, Self::Equal | Self::NotDistinct)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Equal => "=",
            Self::NotDistinct => "IS NOT DISTINCT FROM",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
            Self::Smaller => "<",
            Self::SmallerEqual => "<=",
        };
        f.write_str(text)
    }
}

/// One end of a range on a key column.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBound {
    pub value: Value,
    pub inclusive: bool,
}

impl RangeBound {
    #[must_use]
    pub fn inclusive(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            inclusive: true,
        }
    }

    #[must_use]
    pub fn exclusive(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            inclusive: false,
        }
    }
}

/// Range condition on one key column, bounds given in index order.
///
/// `lower` is the bound nearer the start of the index. For a descending
/// column that is the larger value. Entries with a null in a constrained
/// column never satisfy the condition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RangeCondition {
    pub lower: Option<RangeBound>,
    pub upper: Option<RangeBound>,
}

impl RangeCondition {
    /// No bound at all (still excludes nulls).
    #[must_use]
    pub const fn unbounded() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// Single value range `[value, value]`.
    #[must_use]
    pub fn equal(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            lower: Some(RangeBound::inclusive(value.clone())),
            upper: Some(RangeBound::inclusive(value)),
        }
    }

    #[must_use]
    pub fn with_lower(mut self, bound: RangeBound) -> Self {
        self.lower = Some(bound);
        self
    }

    #[must_use]
    pub fn with_upper(mut self, bound: RangeBound) -> Self {
        self.upper = Some(bound);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_display() {
        assert_eq!(CompareOp::GreaterEqual.to_string(), ">=");
        assert_eq!(CompareOp::NotDistinct.to_string(), "IS NOT DISTINCT FROM");
        assert!(CompareOp::NotDistinct.is_equality());
        assert!(!CompareOp::Smaller.is_equality());
    }

    #[test]
    fn test_range_builders() {
        let range = RangeCondition::unbounded()
            .with_lower(RangeBound::exclusive(3_i64))
            .with_upper(RangeBound::inclusive(9_i64));
        assert_eq!(range.lower, Some(RangeBound { value: Value::Integer(3), inclusive: false }));
        assert_eq!(range.upper.map(|b| b.inclusive), Some(true));
        assert_eq!(RangeCondition::equal("x").lower, Some(RangeBound::inclusive("x")));
    }
}
