use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum IsoError {
    #[error("invalid evolutionary track: {0}")]
    #[diagnostic(help("supported tracks: PAR12+CS_37, PAR12+CS_35, PAR12+CS_07, PAR12+CPR16, PAR12+No"))]
    InvalidTrack(String),

    #[error("invalid photometric system: {0}")]
    #[diagnostic(help("run `cmd-iso systems` to list the systems the service offers"))]
    InvalidPhotometricSystem(String),

    #[error("invalid IMF: {0}")]
    InvalidImf(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid form field: {0}")]
    InvalidField(String),

    #[error("missing config file cmd-iso.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("CMD request failed: {0}")]
    Http(String),

    #[error("CMD returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Photometric system {0} still not available among YBC tables.")]
    UnsupportedPhotometricSystem(String),

    #[error("CMD rejected the request: {0}")]
    Rejected(String),

    #[error("failed to decode isochrone payload: {0}")]
    Decode(String),

    #[error("response has {headers} isochrone blocks but the age grid has {ages} values")]
    #[diagnostic(help("the service output format may have changed"))]
    BlockCountMismatch { headers: usize, ages: usize },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
