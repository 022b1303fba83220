//! Conditional-update predicates.
//!
//! The queue lease's claim step is naturally expressed as a Mongo
//! `$or`/`$exists` query:
//!
//! ```text
//! '$or': [
//!     {'runner_id': self.runner_id},
//!     {'runner_id': {'$exists': False}},
//! ]
//! ```
//!
//! `ConditionSpec` generalizes that shape into something the document store
//! can evaluate without knowing anything about queues specifically, so the
//! same compare-and-set primitive is reusable for any collection.

use serde_json::Value;

#[derive(Debug, Clone)]
pub enum ConditionSpec {
    Any,
    FieldAbsent(String),
    FieldEquals(String, Value),
    FieldLessThan(String, Value),
    Or(Vec<ConditionSpec>),
    And(Vec<ConditionSpec>),
}

impl ConditionSpec {
    pub fn evaluate(&self, doc: &Value) -> bool {
        match self {
            ConditionSpec::Any => true,
            ConditionSpec::FieldAbsent(field) => {
                doc.get(field).is_none() || doc.get(field) == Some(&Value::Null)
            }
            ConditionSpec::FieldEquals(field, expected) => doc.get(field) == Some(expected),
            ConditionSpec::FieldLessThan(field, bound) => {
                match (doc.get(field).and_then(Value::as_str), bound.as_str()) {
                    (Some(a), Some(b)) => a < b,
                    _ => false,
                }
            }
            ConditionSpec::Or(specs) => specs.iter().any(|s| s.evaluate(doc)),
            ConditionSpec::And(specs) => specs.iter().all(|s| s.evaluate(doc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_absent_matches_missing_and_null() {
        let cond = ConditionSpec::FieldAbsent("runner_id".into());
        assert!(cond.evaluate(&json!({})));
        assert!(cond.evaluate(&json!({"runner_id": null})));
        assert!(!cond.evaluate(&json!({"runner_id": "r1"})));
    }

    #[test]
    fn or_of_equals_and_absent_models_queue_claim() {
        let cond = ConditionSpec::Or(vec![
            ConditionSpec::FieldEquals("runner_id".into(), json!("r1")),
            ConditionSpec::FieldAbsent("runner_id".into()),
        ]);
        assert!(cond.evaluate(&json!({})));
        assert!(cond.evaluate(&json!({"runner_id": "r1"})));
        assert!(!cond.evaluate(&json!({"runner_id": "r2"})));
    }

    #[test]
    fn field_less_than_compares_rfc3339_timestamps_lexically() {
        let cond = ConditionSpec::FieldLessThan(
            "ttl_timestamp".into(),
            json!("2030-01-01T00:00:00Z"),
        );
        assert!(cond.evaluate(&json!({"ttl_timestamp": "2020-01-01T00:00:00Z"})));
        assert!(!cond.evaluate(&json!({"ttl_timestamp": "2031-01-01T00:00:00Z"})));
    }
}
