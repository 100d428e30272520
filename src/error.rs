//! Error types for the dossier builder

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the dossier builder
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source PDF is corrupt, unreadable or has no pages
    #[error("Cannot read PDF {}: {reason}", .path.display())]
    PdfRead { path: PathBuf, reason: String },

    /// Source PDF needs a password to be opened
    #[error("PDF is password-protected: {}", .path.display())]
    PdfEncrypted { path: PathBuf },

    /// Not a single document survived discovery and watermarking
    #[error("No PDF documents could be processed under {}", .root.display())]
    NoPdfFound { root: PathBuf },

    /// The final file could not be created or written
    #[error("Cannot write output {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// generation.json exists but is not valid
    #[error("Invalid configuration file {}: {source}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The source root cannot be listed
    #[error("Cannot read source folder {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Merged page count disagrees with the resolved layout
    #[error("Page accounting mismatch: layout expects {expected} pages, merged document has {actual}")]
    PageCountMismatch { expected: usize, actual: usize },

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Whether this failure only concerns one input document.
    ///
    /// Such failures are logged and the document is left out; every other
    /// variant aborts the run.
    pub fn is_document_local(&self) -> bool {
        matches!(self, Error::PdfRead { .. } | Error::PdfEncrypted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_local_errors() {
        let read = Error::PdfRead {
            path: PathBuf::from("a.pdf"),
            reason: "truncated".to_string(),
        };
        let encrypted = Error::PdfEncrypted { path: PathBuf::from("b.pdf") };
        let fatal = Error::NoPdfFound { root: PathBuf::from("docs") };

        assert!(read.is_document_local());
        assert!(encrypted.is_document_local());
        assert!(!fatal.is_document_local());
    }

    #[test]
    fn test_error_messages_name_the_file() {
        let err = Error::PdfEncrypted { path: PathBuf::from("Alice/CNI.pdf") };
        assert!(err.to_string().contains("Alice/CNI.pdf"));

        let err = Error::PdfRead {
            path: PathBuf::from("Bob/Bail-2024.pdf"),
            reason: "invalid xref".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("Bob/Bail-2024.pdf"));
        assert!(message.contains("invalid xref"));
    }
}
