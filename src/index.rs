//! Manifest index block
//!
//! An archive may carry one index block, located by the `index_offset` and
//! `index_length` fields of the common header. Its layout is an 8-byte magic and
//! version pair, the sizes of the XML manifest and of a trailing table, the manifest
//! itself and finally the table. The table maps accessions to record offsets in a
//! layout that is not documented, so it is kept as opaque bytes.

use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder};

use crate::error::{IndexError, Result, Section};
use crate::utils::{padded_len, read_section, write_padding};

/// Magic number: ".mft" in ASCII (big-endian byte order)
#[allow(clippy::unreadable_literal)]
pub const INDEX_MAGIC: u32 = 0x2E6D6674;

/// Version written for new manifest blocks, the ASCII bytes `1.00`
pub const INDEX_VERSION: [u8; 4] = *b"1.00";

/// Size of the magic, version and two size fields in bytes
pub const SIZE_INDEX_PREAMBLE: usize = 16;

/// The optional index block of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexBlock {
    /// Magic number (`.mft`)
    pub magic: u32,
    /// Raw version marker
    pub version: [u8; 4],
    /// XML manifest text
    pub manifest: String,
    /// Undecoded accession/offset table following the manifest
    pub data: Vec<u8>,
}
impl IndexBlock {
    /// Creates a manifest-only index block
    #[must_use]
    pub fn new(manifest: &str) -> Self {
        Self {
            magic: INDEX_MAGIC,
            version: INDEX_VERSION,
            manifest: manifest.to_string(),
            data: Vec::new(),
        }
    }

    /// Size of the XML manifest in bytes
    #[must_use]
    pub fn xml_size(&self) -> usize {
        self.manifest.len()
    }

    /// Size of the opaque table in bytes
    #[must_use]
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Length of the block as written by [`Self::write_bytes`], padding included
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        padded_len(SIZE_INDEX_PREAMBLE + self.xml_size() + self.data_size())
    }

    /// Reads an index block from a reader positioned at `index_offset`
    ///
    /// `index_length` is the length declared in the common header; a manifest that
    /// cannot fit in it is rejected rather than read.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic number is not `.mft`
    /// * The manifest is larger than the declared index length
    /// * The stream ends before the block is complete
    /// * The manifest is not valid UTF-8
    pub fn from_reader<R: Read>(reader: &mut R, index_length: u32) -> Result<Self> {
        let mut buffer = [0u8; SIZE_INDEX_PREAMBLE];
        read_section(reader, &mut buffer, Section::IndexBlock)?;
        let magic = BigEndian::read_u32(&buffer[0..4]);
        if magic != INDEX_MAGIC {
            return Err(IndexError::InvalidMagicNumber(magic).into());
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&buffer[4..8]);
        let xml_size = BigEndian::read_u32(&buffer[8..12]);
        let data_size = BigEndian::read_u32(&buffer[12..16]);
        if u64::from(xml_size) + SIZE_INDEX_PREAMBLE as u64 > u64::from(index_length) {
            return Err(IndexError::ManifestOverflow {
                xml_size,
                index_length,
            }
            .into());
        }

        let mut xml = vec![0u8; xml_size as usize];
        read_section(reader, &mut xml, Section::IndexBlock)?;
        let manifest = std::str::from_utf8(&xml)?.to_string();

        let mut data = vec![0u8; data_size as usize];
        read_section(reader, &mut data, Section::IndexBlock)?;

        Ok(Self {
            magic,
            version,
            manifest,
            data,
        })
    }

    /// Writes the block followed by zero padding to an 8-byte boundary
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the writer fails (typically an I/O error).
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut buffer = [0u8; SIZE_INDEX_PREAMBLE];
        BigEndian::write_u32(&mut buffer[0..4], self.magic);
        buffer[4..8].copy_from_slice(&self.version);
        BigEndian::write_u32(&mut buffer[8..12], self.xml_size() as u32);
        BigEndian::write_u32(&mut buffer[12..16], self.data_size() as u32);
        writer.write_all(&buffer)?;
        writer.write_all(self.manifest.as_bytes())?;
        writer.write_all(&self.data)?;
        let unpadded = SIZE_INDEX_PREAMBLE + self.xml_size() + self.data_size();
        write_padding(writer, self.encoded_len() - unpadded)
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;
    use std::io::Cursor;

    const MANIFEST: &str = "<manifest><run>R_2008_03_14</run></manifest>";

    #[test]
    fn test_manifest_roundtrip() -> Result<()> {
        let mut index = IndexBlock::new(MANIFEST);
        index.data = vec![7; 20];
        let mut buffer = Vec::new();
        index.write_bytes(&mut buffer)?;
        assert_eq!(buffer.len(), index.encoded_len());
        assert_eq!(buffer.len() % 8, 0);

        let parsed = IndexBlock::from_reader(&mut Cursor::new(buffer), index.encoded_len() as u32)?;
        assert_eq!(parsed.manifest, MANIFEST);
        assert_eq!(parsed.data, vec![7; 20]);
        assert_eq!(&parsed.version, b"1.00");
        Ok(())
    }

    #[test]
    fn test_invalid_magic() {
        let mut index = IndexBlock::new(MANIFEST);
        index.magic = 0x2E737274; // ".srt"
        let mut buffer = Vec::new();
        index.write_bytes(&mut buffer).unwrap();
        let err = IndexBlock::from_reader(&mut Cursor::new(buffer), 1024).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_manifest_overflow() {
        let index = IndexBlock::new(MANIFEST);
        let mut buffer = Vec::new();
        index.write_bytes(&mut buffer).unwrap();
        let err = IndexBlock::from_reader(&mut Cursor::new(buffer), 20).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_truncated_manifest() {
        let index = IndexBlock::new(MANIFEST);
        let mut buffer = Vec::new();
        index.write_bytes(&mut buffer).unwrap();
        buffer.truncate(24);
        let err = IndexBlock::from_reader(&mut Cursor::new(buffer), 1024).unwrap_err();
        assert!(err.is_unexpected_eof());
    }
}
