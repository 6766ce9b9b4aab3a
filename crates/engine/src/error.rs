use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Graph(#[from] chunk_graph::GraphError),

    #[error("No graph loaded; send initFromText first")]
    NotLoaded,

    #[error("Engine worker failed: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Stable code carried by error responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Graph(err) => err.code(),
            Self::NotLoaded => "not_loaded",
            Self::Internal(_) | Self::Other(_) => "internal",
        }
    }
}
