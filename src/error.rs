//! Command Error Types

use derive_more::{Display, Error};

/// A command error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for command operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("could not load configuration")]
    Config,
    /// The configured backend or database could not be opened.
    #[display("could not open {_0}")]
    Setup(#[error(not(source))] &'static str),
    #[display("storage backend `{_0}` is not available in this build")]
    Unsupported(#[error(not(source))] &'static str),
    #[display("could not create result table {_0}")]
    Table(#[error(not(source))] String),
    #[display("container not found: {_0}")]
    ContainerNotFound(#[error(not(source))] String),
    #[display("could not check container {_0}")]
    Container(#[error(not(source))] String),
    #[display("could not upload {_0}")]
    Upload(#[error(not(source))] String),
    #[display("scan failed")]
    Scan,
    #[display("export failed")]
    Export,
    #[display("could not write output")]
    Output,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Setup(_) | Self::Container(_) | Self::Upload(_) | Self::Scan)
    }
}
