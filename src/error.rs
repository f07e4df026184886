use std::fmt;

/// Custom Result type for sffkit operations, wrapping the custom [`Error`] type
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the sffkit library, encompassing all possible error cases
/// that can occur while decoding or encoding a flowgram archive.
#[derive(thiserror::Error, Debug)]
#[error(transparent)]
pub enum Error {
    /// Errors related to the common header section
    HeaderError(#[from] HeaderError),
    /// Errors related to the optional index block
    IndexError(#[from] IndexError),
    /// Errors that occur while decoding read records
    ReadError(#[from] ReadError),
    /// Errors that occur while writing an archive
    WriteError(#[from] WriteError),
    /// Errors from decoding accession names and their base-36 fields
    AccessionError(#[from] AccessionError),
    /// Standard I/O errors from the Rust standard library
    IoError(#[from] std::io::Error),
    /// UTF-8 encoding/decoding errors
    Utf8Error(#[from] std::str::Utf8Error),
}
impl Error {
    /// Returns true if this error signals a structurally malformed archive
    ///
    /// Format errors cover bad magic numbers (common header or index block),
    /// unsupported flowgram encodings and inconsistent section lengths.
    /// They are always fatal for the whole archive.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        match self {
            Self::HeaderError(_) | Self::IndexError(_) => true,
            Self::ReadError(e) => matches!(e, ReadError::InvalidReadHeaderLength { .. }),
            _ => false,
        }
    }

    /// Returns true if the stream ended in the middle of a section
    #[must_use]
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, Self::ReadError(ReadError::UnexpectedEndOfData { .. }))
    }

    /// Attaches a record index to an end-of-data error raised without one
    pub(crate) fn at_record(self, idx: usize) -> Self {
        match self {
            Self::ReadError(ReadError::UnexpectedEndOfData {
                section,
                record: None,
            }) => ReadError::UnexpectedEndOfData {
                section,
                record: Some(idx),
            }
            .into(),
            Self::ReadError(ReadError::InvalidReadHeaderLength {
                header_length,
                name_length,
                record: None,
            }) => ReadError::InvalidReadHeaderLength {
                header_length,
                name_length,
                record: Some(idx),
            }
            .into(),
            other => other,
        }
    }
}

/// The section of the archive being decoded when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    CommonHeader,
    IndexBlock,
    ReadHeader,
    ReadData,
}
impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CommonHeader => "common header",
            Self::IndexBlock => "index block",
            Self::ReadHeader => "read header",
            Self::ReadData => "read data",
        };
        f.write_str(name)
    }
}

/// Displays an optional record index as a trailing clause
struct RecordClause<'a>(&'a Option<usize>);
impl fmt::Display for RecordClause<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self.0 {
            Some(idx) => write!(f, " (record {idx})"),
            None => Ok(()),
        }
    }
}

/// Errors specific to processing and validating the common header
#[derive(thiserror::Error, Debug)]
pub enum HeaderError {
    /// The magic number in the header does not match `.sff`
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid magic number: {0:#010x}")]
    InvalidMagicNumber(u32),

    /// The flowgram format code is not one this library can decode
    ///
    /// # Arguments
    /// * `u8` - The unsupported format code
    #[error("Unsupported flowgram format code: {0}")]
    UnsupportedFlowgramFormat(u8),

    /// The declared header length cannot hold the fields it is said to contain
    #[error("Header length ({header_length}) is smaller than its contents ({required} bytes)")]
    InvalidHeaderLength { header_length: u16, required: usize },
}

/// Errors specific to the optional manifest index block
#[derive(thiserror::Error, Debug)]
pub enum IndexError {
    /// The magic number of the index block does not match `.mft`
    ///
    /// # Arguments
    /// * `u32` - The invalid magic number that was found
    #[error("Invalid index magic number: {0:#010x}")]
    InvalidMagicNumber(u32),

    /// The manifest is larger than the index length declared in the common header
    #[error("Manifest size ({xml_size}) exceeds the declared index length ({index_length})")]
    ManifestOverflow { xml_size: u32, index_length: u32 },
}

/// Errors that can occur while reading read records
#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    /// The file being read is not a regular file (e.g., it might be a directory or special file)
    #[error("File is not regular")]
    IncompatibleFile,

    /// The stream ended in the middle of a section
    ///
    /// This is fatal: the format has no resynchronisation marker.
    #[error("Unexpected end of data while reading {section}{}", RecordClause(.record))]
    UnexpectedEndOfData {
        section: Section,
        record: Option<usize>,
    },

    /// The read header length is too small to hold the fixed fields and the name
    #[error(
        "Read header length ({header_length}) is smaller than 16 + name length ({name_length}){}",
        RecordClause(.record)
    )]
    InvalidReadHeaderLength {
        header_length: u16,
        name_length: u16,
        record: Option<usize>,
    },

    /// Attempted to access a record index that is beyond the available range
    ///
    /// # Arguments
    /// * First `usize` - The requested record index
    /// * Second `usize` - The number of records in the archive
    #[error("Requested record index ({0}) is out of record range ({1})")]
    OutOfRange(usize, usize),

    /// A worker thread panicked during parallel processing
    #[error("A worker thread panicked during parallel processing")]
    WorkerPanicked,
}

/// Errors that can occur while writing an archive
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    /// The number of flowgram values does not match the header
    #[error("Flowgram has {got} values but the header declares {expected} flows per read")]
    FlowCountMismatch { expected: usize, got: usize },

    /// The per-base arrays disagree with the read header's base count
    #[error("Read declares {expected} bases but {field} has {got} entries")]
    BaseCountMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    /// A variable-length field does not fit in its length field
    #[error("{field} is too long ({len} bytes)")]
    FieldTooLong { field: &'static str, len: usize },

    /// A different number of records was written than the header declares
    #[error("Header declares {expected} reads but {written} were written")]
    RecordCountMismatch { expected: u32, written: u32 },
}

/// Errors from the base-36 accession codec
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AccessionError {
    /// A character outside `A-Z`/`0-9` was found
    #[error("Illegal base-36 character: {0:?}")]
    InvalidCharacter(char),

    /// The decoded value does not fit in 64 bits
    #[error("Base-36 value overflows: {0}")]
    Overflow(String),

    /// The name does not follow the 14-character accession convention
    #[error("Accession must be 14 ASCII characters, got {0:?}")]
    InvalidLength(String),

    /// The region field is not a two-digit decimal number
    #[error("Invalid accession region: {0:?}")]
    InvalidRegion(String),

    /// The timestamp cannot be represented in six base-36 characters
    #[error("Timestamp out of range: {0}")]
    TimestampOutOfRange(String),

    /// The coordinate pair cannot be represented in five base-36 characters
    #[error("Coordinates out of range: x={0} y={1}")]
    CoordinatesOutOfRange(u32, u32),
}

#[cfg(test)]
mod testing {
    use super::*;

    #[test]
    fn test_taxonomy() {
        let e: Error = HeaderError::InvalidMagicNumber(0).into();
        assert!(e.is_format_error());
        assert!(!e.is_unexpected_eof());

        let e: Error = ReadError::UnexpectedEndOfData {
            section: Section::ReadData,
            record: None,
        }
        .into();
        assert!(e.is_unexpected_eof());
        assert!(!e.is_format_error());
    }

    #[test]
    fn test_at_record() {
        let e: Error = ReadError::UnexpectedEndOfData {
            section: Section::ReadHeader,
            record: None,
        }
        .into();
        let e = e.at_record(3);
        assert_eq!(
            e.to_string(),
            "Unexpected end of data while reading read header (record 3)"
        );
    }
}
