use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// Input text is not JSON or does not have the graph shape
    #[error("Malformed graph input: {0}")]
    MalformedInput(String),

    /// Naming rules could not be compiled
    #[error("Invalid naming rules: {0}")]
    InvalidRules(String),
}

impl GraphError {
    /// Stable machine-readable code used in error responses
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedInput(_) => "malformed_input",
            Self::InvalidRules(_) => "invalid_rules",
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedInput(err.to_string())
    }
}
