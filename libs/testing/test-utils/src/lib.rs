//! Shared test utilities for domain testing
//!
//! This crate provides reusable test infrastructure for the domain crates:
//! - `TestDataBuilder`: Deterministic fixture records in the record store's wire shape
//! - `assertions`: Custom assertion helpers
//!
//! # Usage
//!
//! ```rust
//! use test_utils::TestDataBuilder;
//!
//! let builder = TestDataBuilder::from_test_name("my_test");
//! let task = builder.task(1, "pending");
//! assert_eq!(task["status"], "pending");
//! ```

use chrono::{Duration, NaiveDate};
use serde_json::{Value, json};

/// Builder for test data with deterministic values
///
/// This ensures tests are reproducible by deriving every generated value
/// from a seed.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(7);
    /// assert_eq!(builder.name("deal", "main"), "test-deal-7-main");
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// A date within the next four weeks, fixed per seed and offset
    pub fn date(&self, offset: u64) -> String {
        let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default();
        let days = ((self.seed.wrapping_add(offset)) % 28) as i64;
        (base + Duration::days(days)).format("%Y-%m-%d").to_string()
    }

    /// Task record with the given status
    pub fn task(&self, id: i64, status: &str) -> Value {
        json!({
            "Id": id,
            "title": self.name("task", &id.to_string()),
            "description": "Generated task",
            "status": status,
            "priority": "medium",
            "dueDate": self.date(id as u64),
        })
    }

    /// Deal record at `stage`; `contact_id` is written as a bare reference
    pub fn deal(&self, id: i64, stage: &str, contact_id: Option<i64>, value: f64) -> Value {
        json!({
            "Id": id,
            "title": self.name("deal", &id.to_string()),
            "contactId": contact_id,
            "value": value,
            "probability": 50,
            "stage": stage,
            "status": "New",
            "expectedClose": self.date(id as u64),
        })
    }

    /// Contact record
    pub fn contact(&self, id: i64, name: &str, status: &str) -> Value {
        json!({
            "Id": id,
            "Name": name,
            "email": format!("{}@example.com", self.name("contact", &id.to_string())),
            "company": "Example Co",
            "status": status,
        })
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert a collection length with a nice error message
    pub fn assert_len<T>(items: &[T], expected: usize, context: &str) {
        assert_eq!(
            items.len(),
            expected,
            "{}: expected {} items, got {}",
            context,
            expected,
            items.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.task(1, "pending"), builder2.task(1, "pending"));
        assert_eq!(builder1.name("deal", "test"), builder2.name("deal", "test"));
    }

    #[test]
    fn test_data_builder_from_name() {
        let builder1 = TestDataBuilder::from_test_name("my_test");
        let builder2 = TestDataBuilder::from_test_name("my_test");

        assert_eq!(builder1.date(3), builder2.date(3));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        // Different test names should generate different data
        assert_ne!(builder1.name("task", "a"), builder2.name("task", "a"));
    }

    #[test]
    fn test_deal_without_contact() {
        let deal = TestDataBuilder::new(1).deal(4, "lead", None, 10.0);
        assert!(deal["contactId"].is_null());
        assert_eq!(deal["stage"], "lead");
    }
}
