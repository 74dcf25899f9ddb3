// Error type for the blur pipeline.
// Every variant states *where* things went wrong. The recursion stop signal is
// not in here: it is `host::DrawFlow::Stop`, a normal return value.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A parameter setter got a value it can never accept (e.g. downsample <= 0).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The blur engine could not be created (platform/driver problem).
    #[error("Blur engine unavailable: {0}")]
    ResourceUnavailable(String),

    /// A capture/output buffer could not be allocated.
    #[error("Buffer allocation failed for {width}x{height}")]
    AllocationFailure { width: usize, height: usize },

    /// Loading or parsing a config file failed.
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type for backdrop-blur operations
pub type Result<T> = std::result::Result<T, Error>;
