use thiserror::Error;

/// Errors raised while building or querying a plan graph
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Raw room label missing from the category table
    #[error("unknown room category for label {label:?}")]
    UnknownCategory { label: String },

    /// Polygon rejected before it reaches the adjacency builder
    #[error("invalid geometry for {entity}: {reason}")]
    InvalidGeometry { entity: String, reason: String },

    #[error("unknown room: {0}")]
    UnknownRoom(String),

    /// Both rooms exist but no path connects them
    #[error("no path from {from} to {to}")]
    NotFound { from: String, to: String },

    /// Path enumeration from `from` stopped after `limit` recorded paths
    #[error("more than {limit} shortest paths from {from}")]
    PathLimit { from: String, limit: usize },
}

pub type Result<T> = std::result::Result<T, PlanError>;
