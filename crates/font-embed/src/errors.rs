use core::{fmt, ops};

/// Kind of an [`EmbedError`]. Each kind corresponds to a distinct failure class of
/// [`Embedder::make_embedding_font()`](crate::Embedder::make_embedding_font()).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// I/O error on the source stream.
    SourceStream,
    /// I/O error on the destination stream.
    DestinationStream,
    /// I/O error on one of the scratch streams.
    TempStream,
    /// Malformed PFB segment header.
    BadPfbSegment,
    /// Malformed `POST` resource in a Macintosh resource fork.
    BadPostResource,
    /// Resource fork contains neither `POST` nor `sfnt` resources.
    MissingResource,
    /// Source signature is not recognized.
    UnknownFontType,
    /// Malformed sfnt table directory.
    BadSfnt,
    /// Source is a TrueType Collection, which is not supported.
    TrueTypeCollection,
    /// Embedding specification is invalid (conflicting flags, missing `.notdef`, out-of-range
    /// name index, duplicate `cmap` code, etc.).
    BadSpec,
    /// Failed parsing a Type 1 or CID-keyed Type 1 font.
    Type1Parse,
    /// Failed parsing a CFF font.
    CffParse,
    /// Failed parsing a TrueType font.
    TrueTypeParse,
    /// Failed writing the CFF table.
    CffWrite,
    /// Failed writing an SVG font.
    SvgWrite,
    /// Failed assembling the sfnt container.
    SfntWrite,
    /// Requested functionality is not implemented (e.g., URL embedding).
    NotImplemented,
    /// Internal invariant violation.
    Internal,
    /// Memory allocation failure.
    OutOfMemory,
}

impl ErrorKind {
    /// Returns a static human-readable description of this error kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SourceStream => "source stream error",
            Self::DestinationStream => "destination stream error",
            Self::TempStream => "temporary stream error",
            Self::BadPfbSegment => "bad PFB segment header",
            Self::BadPostResource => "bad POST resource",
            Self::MissingResource => "no POST or sfnt resource in resource fork",
            Self::UnknownFontType => "unrecognized font type",
            Self::BadSfnt => "malformed sfnt",
            Self::TrueTypeCollection => "TrueType Collections are not supported",
            Self::BadSpec => "bad embedding specification",
            Self::Type1Parse => "Type 1 font parse error",
            Self::CffParse => "CFF parse error",
            Self::TrueTypeParse => "TrueType parse error",
            Self::CffWrite => "CFF write error",
            Self::SvgWrite => "SVG write error",
            Self::SfntWrite => "sfnt write error",
            Self::NotImplemented => "not implemented",
            Self::Internal => "internal error",
            Self::OutOfMemory => "out of memory",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned by [`Embedder::make_embedding_font()`](crate::Embedder::make_embedding_font()).
#[derive(Debug)]
pub struct EmbedError {
    kind: ErrorKind,
    detail: Option<String>,
}

impl fmt::Display for EmbedError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, formatter)?;
        if let Some(detail) = &self.detail {
            write!(formatter, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for EmbedError {}

impl From<ErrorKind> for EmbedError {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, detail: None }
    }
}

impl EmbedError {
    /// Creates an error with the specified kind and detail message. Can be used by
    /// [`TableHandler`](crate::TableHandler) implementations.
    pub fn new(kind: ErrorKind, detail: impl fmt::Display) -> Self {
        Self {
            kind,
            detail: Some(detail.to_string()),
        }
    }

    pub(crate) fn bad_spec(detail: impl fmt::Display) -> Self {
        Self::new(ErrorKind::BadSpec, detail)
    }

    pub(crate) fn internal(detail: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Internal, detail)
    }

    /// Gets the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Gets the detailed error message, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

/// Kind of a low-level [`ParseError`].
#[derive(Debug)]
pub(crate) enum ParseErrorKind {
    /// Unexpected end of the font data.
    UnexpectedEof,
    /// Offset inferred from the font data is out of bounds.
    OffsetOutOfBounds(usize),
    /// Range inferred from the font data is out of bounds.
    RangeOutOfBounds {
        range: ops::Range<usize>,
        len: usize,
    },
    /// Unexpected version in a header.
    UnexpectedVersion(u32),
    /// Unexpected format of a structure (e.g., charset or FDSelect).
    UnexpectedFormat(u8),
    /// Missing required table or dictionary entry.
    Missing(&'static str),
    /// Invalid charstring or dictionary operator.
    InvalidOperator(u16),
    /// Charstring operand stack underflow.
    StackUnderflow,
    /// Charstring operand stack overflow.
    StackOverflow,
    /// Subroutine nesting limit exceeded.
    NestingTooDeep,
    /// Subroutine index out of range.
    InvalidSubr(i32),
    /// Malformed PostScript token.
    InvalidToken,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::OffsetOutOfBounds(val) => {
                write!(formatter, "offset ({val}) inferred from font data is out of bounds")
            }
            Self::RangeOutOfBounds { range, len } => {
                write!(
                    formatter,
                    "range ({range:?}) inferred from font data is out of bounds (..{len})"
                )
            }
            Self::UnexpectedVersion(val) => write!(formatter, "unexpected version ({val:#x})"),
            Self::UnexpectedFormat(val) => write!(formatter, "unexpected format ({val})"),
            Self::Missing(what) => write!(formatter, "missing {what}"),
            Self::InvalidOperator(op) => write!(formatter, "invalid operator ({op})"),
            Self::StackUnderflow => formatter.write_str("operand stack underflow"),
            Self::StackOverflow => formatter.write_str("operand stack overflow"),
            Self::NestingTooDeep => formatter.write_str("subroutine nesting too deep"),
            Self::InvalidSubr(idx) => write!(formatter, "invalid subroutine index ({idx})"),
            Self::InvalidToken => formatter.write_str("malformed PostScript token"),
        }
    }
}

/// Low-level error produced by binary and PostScript parsing. Converted to an [`EmbedError`]
/// with the collaborator-specific [`ErrorKind`] at the parser boundary.
#[derive(Debug)]
pub(crate) struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) offset: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.offset > 0 {
            write!(formatter, "{}: ", self.offset)?;
        }
        fmt::Display::fmt(&self.kind, formatter)
    }
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, offset: usize) -> Self {
        Self { kind, offset }
    }

    pub(crate) fn missing(what: &'static str) -> Self {
        Self::new(ParseErrorKind::Missing(what), 0)
    }

    pub(crate) fn into_embed(self, kind: ErrorKind) -> EmbedError {
        EmbedError::new(kind, self)
    }
}

/// Appends `len` zero bytes to `buffer` and returns the appended part. Allocation failure
/// is reported as [`ErrorKind::OutOfMemory`] rather than aborting.
pub(crate) fn extend_zeroed(buffer: &mut Vec<u8>, len: usize) -> Result<&mut [u8], EmbedError> {
    buffer
        .try_reserve(len)
        .map_err(|err| EmbedError::new(ErrorKind::OutOfMemory, err))?;
    let start = buffer.len();
    buffer.resize(start + len, 0);
    Ok(&mut buffer[start..])
}
