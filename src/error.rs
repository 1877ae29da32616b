use std::{error, fmt, io, string};

/// Type alias for the result of tag operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Kinds of errors that may occur while performing metadata operations.
///
/// Every kind has a stable numeric [`code`](ErrorKind::code) and a stable
/// human readable [`message`](ErrorKind::message).
#[derive(Debug)]
pub enum ErrorKind {
    /// An argument was invalid for the called operation.
    InvalidArg,
    /// An allocation failed. Never constructed by this crate, the code is kept
    /// for compatibility with the stable code table.
    NoMemory,
    /// An IO error has occurred. Contains the original io::Error.
    Io(io::Error),
    /// The operation requires an open file.
    NotOpen,
    /// The context already has an open file.
    AlreadyOpen,
    /// The file was opened read-only and a mutating operation was called.
    ReadOnly,
    /// The reader does not contain a supported mp4 container.
    NotMp4,
    /// A box header is structurally invalid.
    BadBox,
    /// The box tree contradicts itself, e.g. a box size smaller than its head.
    Corrupt,
    /// The file ended before a read could be completed.
    Truncated,
    /// The file uses a feature this crate does not support.
    Unsupported,
    /// The file contains no metadata item list.
    NoTags,
    /// No tag with the requested name was found.
    TagNotFound,
    /// The caller provided buffer is too small for the tag value.
    TagTooLarge,
    /// There is not enough reusable space for an in-place write. Internal
    /// signal that escalates to a full rewrite, callers never observe it.
    NoSpace,
    /// A write operation failed.
    WriteFailed,
    /// A seek operation failed.
    SeekFailed,
    /// Renaming the rewritten file over the original failed.
    RenameFailed,
}

impl ErrorKind {
    /// Returns the stable numeric code of the error kind.
    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidArg => -1,
            Self::NoMemory => -2,
            Self::Io(_) => -3,
            Self::NotOpen => -4,
            Self::AlreadyOpen => -5,
            Self::ReadOnly => -6,
            Self::NotMp4 => -10,
            Self::BadBox => -11,
            Self::Corrupt => -12,
            Self::Truncated => -13,
            Self::Unsupported => -14,
            Self::NoTags => -20,
            Self::TagNotFound => -21,
            Self::TagTooLarge => -22,
            Self::NoSpace => -30,
            Self::WriteFailed => -31,
            Self::SeekFailed => -32,
            Self::RenameFailed => -33,
        }
    }

    /// Returns a stable human readable string describing the error kind.
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidArg => "Invalid argument",
            Self::NoMemory => "Out of memory",
            Self::Io(_) => "I/O error",
            Self::NotOpen => "File not open",
            Self::AlreadyOpen => "File already open",
            Self::ReadOnly => "File opened read-only",
            Self::NotMp4 => "Not a supported MP4 file",
            Self::BadBox => "Invalid box structure",
            Self::Corrupt => "File is corrupted",
            Self::Truncated => "Unexpected end of file",
            Self::Unsupported => "Unsupported format",
            Self::NoTags => "No tags found",
            Self::TagNotFound => "Tag not found",
            Self::TagTooLarge => "Tag data too large for buffer",
            Self::NoSpace => "Not enough space for in-place write",
            Self::WriteFailed => "Write operation failed",
            Self::SeekFailed => "Seek operation failed",
            Self::RenameFailed => "File rename failed",
        }
    }
}

/// Returns the stable human readable string for a numeric error code, or a
/// fallback for unknown codes.
pub fn strerror(code: i32) -> &'static str {
    match code {
        0 => "Success",
        -1 => "Invalid argument",
        -2 => "Out of memory",
        -3 => "I/O error",
        -4 => "File not open",
        -5 => "File already open",
        -6 => "File opened read-only",
        -10 => "Not a supported MP4 file",
        -11 => "Invalid box structure",
        -12 => "File is corrupted",
        -13 => "Unexpected end of file",
        -14 => "Unsupported format",
        -20 => "No tags found",
        -21 => "Tag not found",
        -22 => "Tag data too large for buffer",
        -30 => "Not enough space for in-place write",
        -31 => "Write operation failed",
        -32 => "Seek operation failed",
        -33 => "File rename failed",
        _ => "Unknown error",
    }
}

/// A structure able to represent any error that may occur while performing
/// metadata operations.
pub struct Error {
    /// The kind of error.
    pub kind: ErrorKind,
    /// A human readable string describing the error.
    pub description: String,
}

impl Error {
    /// Creates a new `Error` using the error kind and description.
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self { kind, description: description.into() }
    }

    /// Returns the stable numeric code of the contained error kind.
    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self {
                kind: ErrorKind::Truncated,
                description: "Unexpected end of file".to_owned(),
            },
            _ => Self { kind: ErrorKind::Io(err), description: String::new() },
        }
    }
}

impl From<string::FromUtf8Error> for Error {
    fn from(_: string::FromUtf8Error) -> Self {
        Self {
            kind: ErrorKind::Corrupt,
            description: "Data is not valid utf-8".to_owned(),
        }
    }
}

impl From<string::FromUtf16Error> for Error {
    fn from(_: string::FromUtf16Error) -> Self {
        Self {
            kind: ErrorKind::Corrupt,
            description: "Data is not valid utf-16".to_owned(),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            write!(f, "{:?}: {}", self.kind, self.description)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.kind.message())
        } else {
            write!(f, "{}: {}", self.kind.message(), self.description)
        }
    }
}
