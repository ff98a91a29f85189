use thiserror::Error;

/// Failures of an export attempt. None of these touch renderer state.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The visual document is not available (never rendered or unmounted).
    #[error("export target unavailable: {0}")]
    TargetUnavailable(String),

    /// The print context could not be created.
    #[error("{0}")]
    ContextUnavailable(String),

    #[error("rasterization failed: {0}")]
    Raster(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Config(String),

    /// The generative-model call itself failed; no partial report exists.
    #[error("Failed to generate material analysis report: {0}")]
    UpstreamCall(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Export(#[from] ExportError),
}

pub type Result<T, E = ReportError> = std::result::Result<T, E>;
