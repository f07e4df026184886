use std::io::{ErrorKind, Read, Write};

use crate::error::{Error, ReadError, Result, Section};

/// Every section of an archive is padded to a multiple of this many bytes
pub const ALIGNMENT: usize = 8;

/// Rounds a section length up to the next multiple of eight
#[must_use]
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(ALIGNMENT) * ALIGNMENT
}

/// Number of padding bytes following a read data section
///
/// The data section holds `2 * flows` bytes of flowgram values followed by three
/// per-base arrays, so the padding is `(8 - ((2f + 3b) mod 8)) mod 8`.
#[must_use]
pub fn data_padding(flows_per_read: usize, base_count: usize) -> usize {
    let rem = (2 * flows_per_read + 3 * base_count) % ALIGNMENT;
    if rem == 0 {
        0
    } else {
        ALIGNMENT - rem
    }
}

/// Total byte size of a read data section, padding included
#[must_use]
pub fn data_len(flows_per_read: usize, base_count: usize) -> usize {
    2 * flows_per_read + 3 * base_count + data_padding(flows_per_read, base_count)
}

/// Fills `buffer` from the reader, turning a short read into [`ReadError::UnexpectedEndOfData`]
pub(crate) fn read_section<R: Read>(reader: &mut R, buffer: &mut [u8], section: Section) -> Result<()> {
    reader.read_exact(buffer).map_err(|e| eof_error(e, section))
}

/// Consumes `n` bytes without inspecting them
pub(crate) fn skip_bytes<R: Read>(reader: &mut R, n: usize, section: Section) -> Result<()> {
    let mut scratch = [0u8; 64];
    let mut remaining = n;
    while remaining > 0 {
        let step = remaining.min(scratch.len());
        read_section(reader, &mut scratch[..step], section)?;
        remaining -= step;
    }
    Ok(())
}

/// Writes `n` zero bytes
pub(crate) fn write_padding<W: Write>(writer: &mut W, n: usize) -> Result<()> {
    writer.write_all(&[0u8; ALIGNMENT][..n])?;
    Ok(())
}

pub(crate) fn eof_error(e: std::io::Error, section: Section) -> Error {
    if e.kind() == ErrorKind::UnexpectedEof {
        ReadError::UnexpectedEndOfData {
            section,
            record: None,
        }
        .into()
    } else {
        e.into()
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_padded_len() {
        assert_eq!(padded_len(0), 0);
        assert_eq!(padded_len(18), 24);
        assert_eq!(padded_len(39), 40);
        assert_eq!(padded_len(40), 40);
    }

    #[test]
    fn test_data_padding() {
        // 2*4 + 3*4 = 20 -> 4 bytes to reach 24
        assert_eq!(data_padding(4, 4), 4);
        // 2*400 + 3*0 = 800 is already aligned
        assert_eq!(data_padding(400, 0), 0);
        // 2*400 + 3*1 = 803 -> 5 bytes
        assert_eq!(data_padding(400, 1), 5);
        for f in 0..20 {
            for b in 0..20 {
                assert_eq!(data_len(f, b) % ALIGNMENT, 0);
                assert!(data_padding(f, b) < ALIGNMENT);
            }
        }
    }

    #[test]
    fn test_short_read_is_eof() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        let mut buf = [0u8; 4];
        let err = read_section(&mut cursor, &mut buf, Section::ReadData).unwrap_err();
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_skip_bytes() -> anyhow::Result<()> {
        let mut cursor = Cursor::new(vec![0u8; 200]);
        skip_bytes(&mut cursor, 130, Section::ReadData)?;
        assert_eq!(cursor.position(), 130);
        assert!(skip_bytes(&mut cursor, 71, Section::ReadData).is_err());
        Ok(())
    }
}
