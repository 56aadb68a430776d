use thiserror::Error;

/// Failure to bring a viewer instance up. The page stays usable and a later
/// open retries construction.
#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("required page element #{0} is missing")]
    MissingElement(&'static str),
    #[error("creating window: {0}")]
    Window(String),
    #[error("creating drawing surface: {0}")]
    Surface(String),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("requesting GPU device: {0}")]
    Device(String),
}
