//! Typed payload filters.

use serde::{Deserialize, Serialize};

/// A single payload field condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldCondition {
    /// Exact keyword match on a string field.
    Keyword {
        /// Payload field key.
        key: String,
        /// Value to match.
        value: String,
    },
    /// Exact match on an integer field (or membership for integer arrays).
    Integer {
        /// Payload field key.
        key: String,
        /// Value to match.
        value: i64,
    },
    /// Exact match on a boolean field.
    Bool {
        /// Payload field key.
        key: String,
        /// Value to match.
        value: bool,
    },
}

/// A conjunctive payload filter: every condition must match.
///
/// An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    must: Vec<FieldCondition>,
}

impl Filter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the filter has no conditions.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Returns the conjunctive conditions.
    pub fn conditions(&self) -> &[FieldCondition] {
        &self.must
    }

    /// Adds an exact keyword match condition.
    pub fn must_match_keyword(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push(FieldCondition::Keyword {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Adds an exact integer match condition.
    pub fn must_match_integer(mut self, key: impl Into<String>, value: i64) -> Self {
        self.must.push(FieldCondition::Integer {
            key: key.into(),
            value,
        });
        self
    }

    /// Adds an exact boolean match condition.
    pub fn must_match_bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.must.push(FieldCondition::Bool {
            key: key.into(),
            value,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_conditions() {
        let filter = Filter::new();
        assert!(filter.is_empty());
        assert!(filter.conditions().is_empty());
    }

    #[test]
    fn conditions_are_conjunctive_and_ordered() {
        let filter = Filter::new()
            .must_match_bool("metadata.contains_financial_info", true)
            .must_match_integer("metadata.years_mentioned", 2022)
            .must_match_keyword("metadata.source", "report.pdf");

        assert_eq!(filter.conditions().len(), 3);
        assert_eq!(
            filter.conditions()[1],
            FieldCondition::Integer {
                key: "metadata.years_mentioned".to_string(),
                value: 2022,
            }
        );
    }
}
