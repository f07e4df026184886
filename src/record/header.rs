use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder};

use crate::error::{ReadError, Result, Section, WriteError};
use crate::utils::{padded_len, read_section, skip_bytes, write_padding};

/// Size of the fixed region of a read header in bytes
pub const SIZE_READ_HEADER: usize = 16;

/// The per-record header preceding every read data section
///
/// | Offset | Size | Name               | Type   |
/// | ------ | ---- | ------------------ | ------ |
/// | 0      | 2    | read_header_length | uint16 |
/// | 2      | 2    | name_length        | uint16 |
/// | 4      | 4    | base_count         | uint32 |
/// | 8      | 2    | clip_qual_left     | uint16 |
/// | 10     | 2    | clip_qual_right    | uint16 |
/// | 12     | 2    | clip_adapter_left  | uint16 |
/// | 14     | 2    | clip_adapter_right | uint16 |
///
/// followed by the name and zero padding up to `header_length`.
///
/// Clip positions are kept exactly as stored: 1-based, with 0 meaning "not
/// computed". See [`SffRecord`](crate::SffRecord) for the normalised bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadHeader {
    /// Length of this section including padding
    pub header_length: u16,
    /// Length of the read name
    pub name_length: u16,
    /// Number of called bases
    pub base_count: u32,
    /// First base after the quality clip on the left (1-based)
    pub clip_qual_left: u16,
    /// Last base before the quality clip on the right (1-based)
    pub clip_qual_right: u16,
    /// First base after the adapter clip on the left (1-based)
    pub clip_adapter_left: u16,
    /// Last base before the adapter clip on the right (1-based)
    pub clip_adapter_right: u16,
    /// Read name, usually a 14-character accession
    pub name: String,
}
impl ReadHeader {
    /// Creates an unclipped read header
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not fit in the 16-bit length fields.
    pub fn new(name: &str, base_count: u32) -> Result<Self> {
        let name_length = u16::try_from(name.len()).map_err(|_| WriteError::FieldTooLong {
            field: "name",
            len: name.len(),
        })?;
        let total = padded_len(SIZE_READ_HEADER + name.len());
        let header_length = u16::try_from(total).map_err(|_| WriteError::FieldTooLong {
            field: "read header",
            len: total,
        })?;
        Ok(Self {
            header_length,
            name_length,
            base_count,
            clip_qual_left: 0,
            clip_qual_right: 0,
            clip_adapter_left: 0,
            clip_adapter_right: 0,
            name: name.to_string(),
        })
    }

    /// Sets the quality clip positions (1-based, 0 for unset)
    #[must_use]
    pub fn with_quality_clip(mut self, left: u16, right: u16) -> Self {
        self.clip_qual_left = left;
        self.clip_qual_right = right;
        self
    }

    /// Sets the adapter clip positions (1-based, 0 for unset)
    #[must_use]
    pub fn with_adapter_clip(mut self, left: u16, right: u16) -> Self {
        self.clip_adapter_left = left;
        self.clip_adapter_right = right;
        self
    }

    /// Number of called bases as a `usize`
    #[must_use]
    pub fn bases(&self) -> usize {
        self.base_count as usize
    }

    /// Number of padding bytes after the name
    #[must_use]
    pub fn padding(&self) -> usize {
        usize::from(self.header_length)
            .saturating_sub(SIZE_READ_HEADER + usize::from(self.name_length))
    }

    /// Reads a read header, consuming its padding
    ///
    /// The padding bytes are skipped without being validated.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * `header_length` is smaller than `16 + name_length`
    /// * The stream ends before the header is complete
    /// * The name is not valid UTF-8
    pub fn from_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut buffer = [0u8; SIZE_READ_HEADER];
        read_section(reader, &mut buffer, Section::ReadHeader)?;
        let header_length = BigEndian::read_u16(&buffer[0..2]);
        let name_length = BigEndian::read_u16(&buffer[2..4]);
        let base_count = BigEndian::read_u32(&buffer[4..8]);
        let clip_qual_left = BigEndian::read_u16(&buffer[8..10]);
        let clip_qual_right = BigEndian::read_u16(&buffer[10..12]);
        let clip_adapter_left = BigEndian::read_u16(&buffer[12..14]);
        let clip_adapter_right = BigEndian::read_u16(&buffer[14..16]);

        // padding = header_length - 16 - name_length must not be negative
        if usize::from(header_length) < SIZE_READ_HEADER + usize::from(name_length) {
            return Err(ReadError::InvalidReadHeaderLength {
                header_length,
                name_length,
                record: None,
            }
            .into());
        }

        let mut name = vec![0u8; usize::from(name_length)];
        read_section(reader, &mut name, Section::ReadHeader)?;
        let name = std::str::from_utf8(&name)?.to_string();

        let header = Self {
            header_length,
            name_length,
            base_count,
            clip_qual_left,
            clip_qual_right,
            clip_adapter_left,
            clip_adapter_right,
            name,
        };
        skip_bytes(reader, header.padding(), Section::ReadHeader)?;
        Ok(header)
    }

    /// Writes the header followed by zero padding up to `header_length`
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the writer fails (typically an I/O error).
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_READ_HEADER];
        BigEndian::write_u16(&mut buffer[0..2], self.header_length);
        BigEndian::write_u16(&mut buffer[2..4], self.name_length);
        BigEndian::write_u32(&mut buffer[4..8], self.base_count);
        BigEndian::write_u16(&mut buffer[8..10], self.clip_qual_left);
        BigEndian::write_u16(&mut buffer[10..12], self.clip_qual_right);
        BigEndian::write_u16(&mut buffer[12..14], self.clip_adapter_left);
        BigEndian::write_u16(&mut buffer[14..16], self.clip_adapter_right);
        writer.write_all(&buffer)?;
        writer.write_all(self.name.as_bytes())?;
        let mut remaining = self.padding();
        while remaining > 0 {
            let step = remaining.min(8);
            write_padding(writer, step)?;
            remaining -= step;
        }
        Ok(())
    }
}
