use thiserror::Error;

/// Failures that halt an action before or during export/upload.
///
/// Unrecognized lines and unparsable amounts are not errors; they are
/// dropped or coerced where they occur.
#[derive(Error, Debug)]
pub enum ExtratoError {
    #[error("no recognizable tables found in {0}")]
    NoTables(String),

    #[error("column 'valor' not found in CSV (columns: {0})")]
    MissingValorColumn(String),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("remote list rejected item: status {status}: {body}")]
    UploadRejected { status: u16, body: String },

    /// Raised by OCR engines asked for a page past the end of the document.
    #[error("page {0} is past the end of the document")]
    PageOutOfRange(usize),

    #[error("token request failed: {0}")]
    Token(String),
}
