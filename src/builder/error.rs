//! Build errors for the machine builder.

use crate::config::ConfigViolation;
use crate::machine::{TableError, TableViolation};
use thiserror::Error;

/// Errors that can occur when building a machine.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid configuration: {}", join(.0))]
    InvalidConfig(Vec<ConfigViolation>),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("Transition table failed audit: {}", join(.0))]
    TableAudit(Vec<TableViolation>),
}

fn join<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
