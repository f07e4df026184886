//! Common header module for the sffkit library
//!
//! The common header occurs once at the start of every archive and governs the
//! decoding of every record that follows: it fixes the number of flows per read,
//! the nucleotide used in each flow, and the location of the optional index block.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder};
use log::warn;

use crate::error::{HeaderError, Result, Section, WriteError};
use crate::utils::{padded_len, read_section, write_padding};

/// Magic number: ".sff" in ASCII (big-endian byte order)
#[allow(clippy::unreadable_literal)]
pub const MAGIC: u32 = 0x2E736666;

/// The only version marker in circulation, the bytes `00 00 00 01`
pub const VERSION: [u8; 4] = [0, 0, 0, 1];

/// Flowgram format 1 stores each value as a `u16` holding `round(value * 100)`
pub const FLOWGRAM_FORMAT: u8 = 1;

/// Size of the fixed region of the common header in bytes
pub const SIZE_FIXED_HEADER: usize = 31;

/// The common header section of a flowgram archive
///
/// The fixed region is 31 bytes, followed by `flows_per_read` flow characters,
/// `key_length` key bases and zero padding up to `header_length`.
///
/// | Offset | Size | Name              | Type     |
/// | ------ | ---- | ----------------- | -------- |
/// | 0      | 4    | magic             | uint32   |
/// | 4      | 4    | version           | char[4]  |
/// | 8      | 8    | index_offset      | uint64   |
/// | 16     | 4    | index_length      | uint32   |
/// | 20     | 4    | number_of_reads   | uint32   |
/// | 24     | 2    | header_length     | uint16   |
/// | 26     | 2    | key_length        | uint16   |
/// | 28     | 2    | flows_per_read    | uint16   |
/// | 30     | 1    | flowgram_format   | uint8    |
///
/// All multi-byte fields are big-endian.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonHeader {
    /// Magic number to identify the file format
    ///
    /// 4 bytes
    pub magic: u32,

    /// Raw version marker
    ///
    /// 4 bytes
    pub version: [u8; 4],

    /// Byte offset of the index block, 0 if absent
    ///
    /// 8 bytes
    pub index_offset: u64,

    /// Byte length of the index block, 0 if absent
    ///
    /// 4 bytes
    pub index_length: u32,

    /// Number of read records stored in the archive
    ///
    /// 4 bytes
    pub number_of_reads: u32,

    /// Total length of this section including padding
    ///
    /// 2 bytes
    pub header_length: u16,

    /// Length of the key sequence
    ///
    /// 2 bytes
    pub key_length: u16,

    /// Number of flows recorded for every read
    ///
    /// 2 bytes
    pub flows_per_read: u16,

    /// Encoding of the flowgram values (only format 1 is defined)
    ///
    /// 1 byte
    pub flowgram_format_code: u8,

    /// Nucleotide used in each flow (`flows_per_read` bytes)
    pub flow_chars: Vec<u8>,

    /// Key sequence prefixing every read (`key_length` bytes)
    pub key_sequence: Vec<u8>,
}
impl CommonHeader {
    /// Creates a header for the given flow order and key
    ///
    /// The length fields are derived from the arguments and the index fields are
    /// left at zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the padded header does not fit in its 16-bit length field.
    pub fn new(flow_chars: &[u8], key_sequence: &[u8], number_of_reads: u32) -> Result<Self> {
        let too_long = |field, len| WriteError::FieldTooLong { field, len };
        let flows_per_read =
            u16::try_from(flow_chars.len()).map_err(|_| too_long("flow_chars", flow_chars.len()))?;
        let key_length = u16::try_from(key_sequence.len())
            .map_err(|_| too_long("key_sequence", key_sequence.len()))?;
        let total = expected_header_length(flow_chars.len(), key_sequence.len());
        let header_length = u16::try_from(total).map_err(|_| too_long("common header", total))?;
        Ok(Self {
            magic: MAGIC,
            version: VERSION,
            index_offset: 0,
            index_length: 0,
            number_of_reads,
            header_length,
            key_length,
            flows_per_read,
            flowgram_format_code: FLOWGRAM_FORMAT,
            flow_chars: flow_chars.to_vec(),
            key_sequence: key_sequence.to_vec(),
        })
    }

    /// Checks if the archive declares an index block
    #[must_use]
    pub fn has_index(&self) -> bool {
        self.index_offset != 0 && self.index_length != 0
    }

    /// Number of flows per read as a `usize`
    #[must_use]
    pub fn flows(&self) -> usize {
        usize::from(self.flows_per_read)
    }

    /// Absolute byte offset of the first read record
    #[must_use]
    pub fn data_offset(&self) -> u64 {
        u64::from(self.header_length)
    }

    /// Parses the 31-byte fixed region of the header
    ///
    /// The variable fields (`flow_chars`, `key_sequence`) are left empty.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic number is incorrect
    /// * The flowgram format code is not 1
    /// * The header length is too small for the flows and key it declares
    pub fn from_bytes(buffer: &[u8; SIZE_FIXED_HEADER]) -> Result<Self> {
        let magic = BigEndian::read_u32(&buffer[0..4]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagicNumber(magic).into());
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&buffer[4..8]);
        let index_offset = BigEndian::read_u64(&buffer[8..16]);
        let index_length = BigEndian::read_u32(&buffer[16..20]);
        let number_of_reads = BigEndian::read_u32(&buffer[20..24]);
        let header_length = BigEndian::read_u16(&buffer[24..26]);
        let key_length = BigEndian::read_u16(&buffer[26..28]);
        let flows_per_read = BigEndian::read_u16(&buffer[28..30]);
        let flowgram_format_code = buffer[30];
        if flowgram_format_code != FLOWGRAM_FORMAT {
            return Err(HeaderError::UnsupportedFlowgramFormat(flowgram_format_code).into());
        }

        let required = SIZE_FIXED_HEADER + usize::from(flows_per_read) + usize::from(key_length);
        if usize::from(header_length) < required {
            return Err(HeaderError::InvalidHeaderLength {
                header_length,
                required,
            }
            .into());
        }
        if usize::from(header_length) != padded_len(required) {
            warn!(
                "Header length {header_length} differs from the padded size {}",
                padded_len(required)
            );
        }

        Ok(Self {
            magic,
            version,
            index_offset,
            index_length,
            number_of_reads,
            header_length,
            key_length,
            flows_per_read,
            flowgram_format_code,
            flow_chars: Vec::new(),
            key_sequence: Vec::new(),
        })
    }

    /// Reads a header from a reader positioned at the start of the archive
    ///
    /// The magic number is validated as soon as its four bytes are available, so a
    /// foreign stream fails with a format error even when it is shorter than a header.
    /// The header padding is not consumed; readers seek to [`Self::data_offset`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The stream ends before the header is complete
    /// * The header data is invalid (see `from_bytes` for validation details)
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_FIXED_HEADER];
        read_section(reader, &mut buffer[..4], Section::CommonHeader)?;
        let magic = BigEndian::read_u32(&buffer[..4]);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagicNumber(magic).into());
        }
        read_section(reader, &mut buffer[4..], Section::CommonHeader)?;
        let mut header = Self::from_bytes(&buffer)?;

        header.flow_chars = vec![0u8; header.flows()];
        read_section(reader, &mut header.flow_chars, Section::CommonHeader)?;
        header.key_sequence = vec![0u8; usize::from(header.key_length)];
        read_section(reader, &mut header.key_sequence, Section::CommonHeader)?;
        Ok(header)
    }

    /// Writes the header, zero-filling the padding up to `header_length`
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the writer fails (typically an I/O error).
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_FIXED_HEADER];
        BigEndian::write_u32(&mut buffer[0..4], self.magic);
        buffer[4..8].copy_from_slice(&self.version);
        BigEndian::write_u64(&mut buffer[8..16], self.index_offset);
        BigEndian::write_u32(&mut buffer[16..20], self.index_length);
        BigEndian::write_u32(&mut buffer[20..24], self.number_of_reads);
        BigEndian::write_u16(&mut buffer[24..26], self.header_length);
        BigEndian::write_u16(&mut buffer[26..28], self.key_length);
        BigEndian::write_u16(&mut buffer[28..30], self.flows_per_read);
        buffer[30] = self.flowgram_format_code;
        writer.write_all(&buffer)?;
        writer.write_all(&self.flow_chars)?;
        writer.write_all(&self.key_sequence)?;

        let written = SIZE_FIXED_HEADER + self.flow_chars.len() + self.key_sequence.len();
        let mut remaining = usize::from(self.header_length).saturating_sub(written);
        while remaining > 0 {
            let step = remaining.min(8);
            write_padding(writer, step)?;
            remaining -= step;
        }
        Ok(())
    }
}

/// The header length mandated for the given flow and key lengths
#[must_use]
pub fn expected_header_length(flows_per_read: usize, key_length: usize) -> usize {
    padded_len(SIZE_FIXED_HEADER + flows_per_read + key_length)
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;
    use std::io::Cursor;

    fn flx_header() -> CommonHeader {
        CommonHeader::new(&b"TACG".repeat(100), b"TCAG", 10).unwrap()
    }

    #[test]
    fn test_header_length() {
        assert_eq!(expected_header_length(4, 4), 40);
        // 31 + 400 + 4 = 435 -> 440
        assert_eq!(flx_header().header_length, 440);
    }

    #[test]
    fn test_write_read() -> Result<()> {
        let header = flx_header();
        let mut buffer = Vec::new();
        header.write_bytes(&mut buffer)?;
        assert_eq!(buffer.len(), 440);
        assert!(buffer[435..].iter().all(|&b| b == 0));

        let mut cursor = Cursor::new(buffer);
        let parsed = CommonHeader::from_reader(&mut cursor)?;
        assert_eq!(parsed, header);
        assert!(!parsed.has_index());
        // padding is left for the caller to skip
        assert_eq!(cursor.position(), 435);
        Ok(())
    }

    #[test]
    fn test_invalid_magic() {
        let mut cursor = Cursor::new(b"BSEQ".to_vec());
        let err = CommonHeader::from_reader(&mut cursor).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_truncated_header() {
        let mut buffer = Vec::new();
        flx_header().write_bytes(&mut buffer).unwrap();
        buffer.truncate(100);
        let err = CommonHeader::from_reader(&mut Cursor::new(buffer)).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_unsupported_flowgram_format() {
        let mut header = flx_header();
        header.flowgram_format_code = 2;
        let mut buffer = Vec::new();
        header.write_bytes(&mut buffer).unwrap();
        let err = CommonHeader::from_reader(&mut Cursor::new(buffer)).unwrap_err();
        assert!(matches!(
            err,
            crate::Error::HeaderError(HeaderError::UnsupportedFlowgramFormat(2))
        ));
    }

    #[test]
    fn test_header_length_too_small() {
        let mut header = flx_header();
        header.header_length = 400;
        let mut buffer = Vec::new();
        header.write_bytes(&mut buffer).unwrap();
        let err = CommonHeader::from_reader(&mut Cursor::new(buffer)).unwrap_err();
        assert!(err.is_format_error());
    }
}
