use std::error::Error as StdError;
use std::fmt;

use mwqm_core_common::{AttributeError, TableError};

/// A position within a source file, such as a CSV record.
///
/// All indices are 1-based where possible to align with human expectations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number in the source (1-based)
    pub line: Option<u64>,
    /// Byte offset from the start of the source
    pub byte_offset: Option<u64>,
    /// Logical record number reported by the parser
    pub record: Option<u64>,
    /// Feature index within a collection (0-based, as stored)
    pub feature: Option<u64>,
}

impl SourcePosition {
    /// Returns true when the position does not contain any location metadata.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line.is_none()
            && self.byte_offset.is_none()
            && self.record.is_none()
            && self.feature.is_none()
    }

    /// Position of a feature inside a collection.
    #[must_use]
    pub fn feature(index: usize) -> Self {
        Self {
            feature: Some(index as u64),
            ..Self::default()
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();

        if let Some(line) = self.line {
            parts.push(format!("line {line}"));
        }
        if let Some(record) = self.record {
            parts.push(format!("record {record}"));
        }
        if let Some(byte) = self.byte_offset {
            parts.push(format!("byte {byte}"));
        }
        if let Some(feature) = self.feature {
            parts.push(format!("feature {feature}"));
        }

        if parts.is_empty() {
            write!(f, "unknown position")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors that can occur when reading or writing tabular and vector formats.
#[derive(Debug)]
pub enum FormatReadError {
    /// An underlying I/O failure occurred.
    Io {
        /// The originating error.
        source: std::io::Error,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// Parsing failed for the input source.
    Parse {
        /// Human readable description of the failure.
        message: String,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
        /// Optional context describing what was being read.
        context: Option<String>,
    },
    /// The parsed data does not fit the in-memory table shape.
    Shape {
        /// The originating error.
        source: TableError,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
    },
    /// A value cannot be encoded in the output format.
    Encode {
        /// The originating error.
        source: AttributeError,
        /// Optional position describing where the failure occurred.
        position: Option<SourcePosition>,
    },
}

impl FormatReadError {
    fn fmt_context(context: Option<&str>) -> String {
        context
            .map(|c| format!(" while reading {c}"))
            .unwrap_or_default()
    }

    fn fmt_position(position: Option<&SourcePosition>) -> String {
        position.map(|pos| format!(" at {pos}")).unwrap_or_default()
    }

    /// Shorthand for a [`FormatReadError::Parse`] without position.
    #[must_use]
    pub fn parse(message: impl Into<String>, context: impl Into<String>) -> Self {
        FormatReadError::Parse {
            message: message.into(),
            position: None,
            context: Some(context.into()),
        }
    }

    /// Attach additional context to the error, returning the updated error.
    #[must_use]
    pub fn with_additional_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        match &mut self {
            FormatReadError::Io {
                context: existing, ..
            }
            | FormatReadError::Parse {
                context: existing, ..
            } => match existing {
                Some(existing) if !existing.is_empty() => {
                    existing.push_str("; ");
                    existing.push_str(&context);
                },
                _ => *existing = Some(context),
            },
            FormatReadError::Shape { .. } | FormatReadError::Encode { .. } => {},
        }
        self
    }
}

impl fmt::Display for FormatReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatReadError::Io { source, context } => {
                write!(
                    f,
                    "I/O error{}: {source}",
                    Self::fmt_context(context.as_deref())
                )
            },
            FormatReadError::Parse {
                message,
                position,
                context,
            } => write!(
                f,
                "Parse error{}{}: {message}",
                Self::fmt_context(context.as_deref()),
                Self::fmt_position(position.as_ref())
            ),
            FormatReadError::Shape { source, position } => write!(
                f,
                "Table shape error{}: {source}",
                Self::fmt_position(position.as_ref())
            ),
            FormatReadError::Encode { source, position } => write!(
                f,
                "Encode error{}: {source}",
                Self::fmt_position(position.as_ref())
            ),
        }
    }
}

impl StdError for FormatReadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            FormatReadError::Io { source, .. } => Some(source),
            FormatReadError::Shape { source, .. } => Some(source),
            FormatReadError::Encode { source, .. } => Some(source),
            FormatReadError::Parse { .. } => None,
        }
    }
}

impl From<std::io::Error> for FormatReadError {
    fn from(source: std::io::Error) -> Self {
        FormatReadError::Io {
            source,
            context: None,
        }
    }
}

/// Result type alias that uses [`FormatReadError`].
pub type FormatResult<T> = Result<T, FormatReadError>;
