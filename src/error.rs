use thiserror::Error;

/// Errors that abort a whole pipeline invocation.
///
/// Row-level anomalies are never errors; they are absorbed by the coercion
/// and defaulting rules in the loader.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no sheet matching the monthly report naming convention was found")]
    NoMatchingSheets,

    #[error("workbook cannot be read: {0}")]
    SourceUnreadable(#[from] calamine::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("environment variable {name} is not set")]
    Config { name: &'static str },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("table store returned status {status}: {body}")]
    Api { status: u16, body: String },
}
