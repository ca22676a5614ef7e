//! Errors raised while parsing and processing delimited text.
use std::{fmt, io};

use thiserror::Error as ThisError;

use crate::{LogicalPosition, PhysicalPosition};

/// Direction in which a value exceeded the range of its target type.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Sign {
    /// The value is above the maximum.
    Positive,
    /// The value is below the minimum.
    Negative,
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sign::Positive => "above the maximum",
            Sign::Negative => "below the minimum",
        })
    }
}

/// A column identified either by its index or by its header name.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Column {
    /// Zero-based column index.
    Index(usize),
    /// Header name, rendered for display.
    Name(String),
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Column::Index(index) => write!(f, "{index}"),
            Column::Name(name) => f.write_str(name),
        }
    }
}

/// The different kinds of [`Error`].
#[derive(ThisError, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input is not well-formed delimited text.
    #[error("{msg}")]
    Parse {
        /// Description of the problem.
        msg: String,
    },
    /// A required column is missing from a record.
    #[error("field {column} not found")]
    FieldNotFound {
        /// The missing column.
        column: Column,
    },
    /// A field could not be converted to its target type.
    #[error("cannot convert {value} to {target}")]
    FieldInvalidFormat {
        /// The rendered field contents.
        value: String,
        /// Name of the target type.
        target: &'static str,
    },
    /// An empty field could not be converted to its target type.
    #[error("cannot convert an empty field to {target}")]
    FieldEmpty {
        /// Name of the target type.
        target: &'static str,
    },
    /// A numeric field does not fit its target type.
    #[error("{value} is {sign} of {target}")]
    FieldOutOfRange {
        /// The rendered field contents.
        value: String,
        /// Name of the target type.
        target: &'static str,
        /// Whether the value is too large or too small.
        sign: Sign,
    },
    /// The key field of a record extraction is missing from the header.
    #[error("no field named {key} in the header")]
    RecordExtraction {
        /// The rendered key.
        key: String,
    },
    /// An IO error of the input.
    #[error("IO error during parsing: {}", .0)]
    Io(#[source] io::Error),
    /// An error raised by a handler.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
    /// An error wrapped with additional context.
    #[error("{context}: {source}")]
    Nested {
        /// What was being done when the error occurred.
        context: String,
        /// The wrapped error.
        #[source]
        source: Error,
    },
}

/// An error with optional source positions.
///
/// The kind is boxed together with the positions, keeping `Result<_, Error>` small.
pub struct Error(Box<Inner>);

#[derive(Debug)]
struct Inner {
    kind: ErrorKind,
    physical: Option<PhysicalPosition>,
    logical: Option<LogicalPosition>,
}

/// Result type using [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Creates an error of the given kind without positions.
    #[cold]
    pub fn new(kind: ErrorKind) -> Self {
        Self(Box::new(Inner {
            kind,
            physical: None,
            logical: None,
        }))
    }

    /// Creates a [`ErrorKind::Parse`] error.
    #[cold]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse { msg: msg.into() })
    }

    /// Wraps an arbitrary error raised by a handler.
    #[cold]
    pub fn custom(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::new(ErrorKind::Custom(err.into()))
    }

    /// Wraps `source` with a description of what was being done.
    #[cold]
    pub fn nested(context: impl Into<String>, source: Error) -> Self {
        Self::new(ErrorKind::Nested {
            context: context.into(),
            source,
        })
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }

    /// Returns the kind of the innermost error, looking through [`ErrorKind::Nested`].
    pub fn root_kind(&self) -> &ErrorKind {
        let mut kind = &self.0.kind;
        while let ErrorKind::Nested { source, .. } = kind {
            kind = &source.0.kind;
        }
        kind
    }

    /// Consumes the error, returning its kind.
    pub fn into_kind(self) -> ErrorKind {
        self.0.kind
    }

    /// Returns the position in the raw input, if known.
    pub fn physical_position(&self) -> Option<PhysicalPosition> {
        self.0.physical
    }

    /// Returns the record and field position, if known.
    pub fn logical_position(&self) -> Option<LogicalPosition> {
        self.0.logical
    }

    /// Sets the physical position.
    pub fn with_physical_position(mut self, position: PhysicalPosition) -> Self {
        self.0.physical = Some(position);
        self
    }

    /// Sets the logical position.
    pub fn with_logical_position(mut self, position: LogicalPosition) -> Self {
        self.0.logical = Some(position);
        self
    }

    /// Fills in positions that are not yet known.
    pub fn enrich(&mut self, physical: PhysicalPosition, logical: LogicalPosition) {
        self.0.physical.get_or_insert(physical);
        self.0.logical.get_or_insert(logical);
    }

    /// Returns `true` for errors of the input.
    pub fn is_io(&self) -> bool {
        matches!(self.0.kind, ErrorKind::Io(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(position) = self.0.physical {
            write!(f, "{position}: ")?;
        } else if let Some(position) = self.0.logical {
            write!(f, "{position}: ")?;
        }
        fmt::Display::fmt(&self.0.kind, f)
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.0.kind)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}
