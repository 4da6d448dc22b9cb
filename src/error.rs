//! Error types for the document engine.
//!
//! Fatal failures are represented by [`Error`] and returned to the caller.
//! Non-fatal issues (a part that could not be fully parsed, a clamped
//! out-of-range value) are represented by [`Warning`] values accumulated on
//! the returned document, so a damaged input still yields a usable model.

/// Result type alias for document engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal error categories.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input is not a ZIP archive or not a recognizable OOXML package
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// Input is not a PDF (bad header, unreadable xref, broken trailer)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Invalid PDF header (expected '%PDF-M.N')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Referenced object not found in the cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Document is encrypted and the supplied password does not authenticate
    #[error("Encryption error: {0}")]
    Encrypted(String),

    /// A caller-supplied value violates a format invariant and cannot be repaired
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// XML is malformed beyond recovery
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error from the underlying source or sink
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error
    #[error("UTF-8 decoding error: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::InvalidPackage(e.to_string())
    }
}

/// Classification of a non-fatal warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A part or page could not be fully interpreted; processing continued
    PartialParse,
    /// A value violated a format invariant and was clamped to the nearest legal value
    Constraint,
}

/// A non-fatal issue attached to a returned document.
///
/// Warnings never abort processing; they record what was skipped or repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// What kind of issue this is
    pub kind: WarningKind,
    /// The part or page the issue was found in (e.g. "word/document.xml", "page 3")
    pub part: String,
    /// Human-readable description
    pub message: String,
}

impl Warning {
    /// Record a partial-parse warning for a part or page.
    pub fn partial(part: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::PartialParse,
            part: part.into(),
            message: message.into(),
        }
    }

    /// Record a clamped-value warning.
    pub fn constraint(part: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::Constraint,
            part: part.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.part, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_header_error() {
        let err = Error::InvalidHeader("NotAPDF".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Invalid PDF header"));
        assert!(msg.contains("NotAPDF"));
    }

    #[test]
    fn test_object_not_found_error() {
        let err = Error::ObjectNotFound(10, 0);
        assert!(format!("{}", err).contains("10 0 R"));
    }

    #[test]
    fn test_invalid_object_type_error() {
        let err = Error::InvalidObjectType {
            expected: "Dictionary".to_string(),
            found: "Array".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Dictionary"));
        assert!(msg.contains("Array"));
    }

    #[test]
    fn test_warning_display() {
        let w = Warning::partial("word/styles.xml", "unknown style element");
        assert_eq!(format!("{}", w), "[word/styles.xml] unknown style element");
        assert_eq!(w.kind, WarningKind::PartialParse);
    }

    #[test]
    fn test_constraint_warning_kind() {
        let w = Warning::constraint("word/document.xml", "negative indent clamped to 0");
        assert_eq!(w.kind, WarningKind::Constraint);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
        assert_send_sync::<Warning>();
    }
}
