//! Error types for dispatch and delivery.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// A response payload that the messaging API reported as not delivered.
/// Carries the raw decoded body so the failure is visible to the
/// unit-of-work boundary.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("message delivery failed: {body}")]
    Failed { body: Value },
}

/// One trigger's failure, attributed by name.
#[derive(Debug, Error)]
#[error("trigger `{trigger}` failed: {source}")]
pub struct TriggerError {
    pub trigger: String,
    #[source]
    pub source: anyhow::Error,
}

/// Aggregate of trigger failures from a single dispatch. The dispatcher
/// runs every activated trigger even when an earlier one fails, so a single
/// bad trigger cannot suppress the rest.
#[derive(Debug)]
pub struct DispatchError {
    pub failures: Vec<TriggerError>,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} trigger(s) failed: ", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for DispatchError {}
