use portal_core::error::CoreError;
use portal_gamma::GammaError;
use portal_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Provider(#[from] GammaError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The job reached `failed`; carries its error string.
    #[error("{0}")]
    Terminal(String),
}

impl PipelineError {
    /// Timeouts are budgeted like other upstream failures but logged apart.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Provider(e) => e.is_timeout(),
            Self::Core(CoreError::Timeout(_)) => true,
            _ => false,
        }
    }
}
