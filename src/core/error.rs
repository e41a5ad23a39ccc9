//! Purpose: Define the crate-wide error type for decode and transport failures.
//! Exports: `Error`, `ErrorKind`.
//! Role: Single failure taxonomy shared by codecs, record decoders, and pagination.
//! Invariants: Every decode failure names the offending field or tag where one exists.
//! Invariants: Kinds are stable; callers may match on them for recovery decisions.

use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Bad asset grammar, code length, or issuer key.
    InvalidAsset,
    /// A checksummed id carried a version byte other than the expected one.
    VersionMismatch,
    /// A checksummed id failed checksum verification.
    ChecksumMismatch,
    /// A string decoded as neither a plain account id nor a muxed account.
    InvalidMuxedAccount,
    /// A claim predicate with a bad key set, arity, or numeric field.
    InvalidPredicate,
    /// A discriminator tag with no registered decoder.
    UnknownVariant,
    /// A structurally malformed record field (wrong type, missing, bad encoding).
    Malformed,
    /// A next/prev fetch whose body could not be decoded as the expected page.
    Pagination,
    /// An HTTP-layer failure surfaced by the transport.
    Transport,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    field: Option<String>,
    tag: Option<String>,
    record: Option<usize>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            field: None,
            tag: None,
            record: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn record(&self) -> Option<usize> {
        self.record
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_record(mut self, record: usize) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(field) = &self.field {
            write!(f, " (field: {field})")?;
        }
        if let Some(tag) = &self.tag {
            write!(f, " (tag: {tag})")?;
        }
        if let Some(record) = self.record {
            write!(f, " (record: {record})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}
