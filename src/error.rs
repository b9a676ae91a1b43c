use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Event store failure, passed through untouched.
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}

impl EngineError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Outcome of a store-backed analysis: either computed data, or an explicit
/// "nothing matched" the caller can map to its own not-found response.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis<T> {
    Data(T),
    Empty,
}

impl<T> Analysis<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Analysis::Empty)
    }

    pub fn data(self) -> Option<T> {
        match self {
            Analysis::Data(v) => Some(v),
            Analysis::Empty => None,
        }
    }
}
