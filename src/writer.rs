//! Archive writer
//!
//! [`SffWriter`] produces conforming archives: the common header, then one read
//! header and read data section per record with every padding region zero-filled,
//! then an optional index block. Attaching an index patches `index_offset` and
//! `index_length` in the header, so the writer needs a seekable sink.

use std::io::{Seek, SeekFrom, Write};

use crate::error::{Result, WriteError};
use crate::header::CommonHeader;
use crate::index::IndexBlock;
use crate::record::SffRecord;

/// Writes records to a seekable sink in archive order
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use sffkit::{CommonHeader, ReadData, ReadHeader, Result, SffRecord, SffWriter};
///
/// # fn main() -> Result<()> {
/// let header = CommonHeader::new(b"TACG", b"TCAG", 1)?;
/// let mut writer = SffWriter::new(Cursor::new(Vec::new()), header)?;
///
/// let record = SffRecord::new(
///     ReadHeader::new("AB", 4)?,
///     ReadData::new(
///         vec![1.0, 2.0, 0.5, 0.75],
///         vec![1, 0, 2, 1],
///         b"ACGT".to_vec(),
///         vec![30, 31, 32, 33],
///     ),
/// );
/// writer.write_record(&record)?;
///
/// let bytes = writer.finish(None)?.into_inner();
/// assert_eq!(bytes.len(), 40 + 24 + 24);
/// # Ok(())
/// # }
/// ```
pub struct SffWriter<W: Write + Seek> {
    /// Inner writer
    inner: W,

    /// Header of the archive, patched on `finish` when an index is attached
    header: CommonHeader,

    /// Position of the common header in the sink
    start: u64,

    /// Bytes written since `start`
    position: u64,

    /// Number of records written
    records_written: u32,
}
impl<W: Write + Seek> SffWriter<W> {
    /// Creates a writer and writes the common header
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(mut inner: W, header: CommonHeader) -> Result<Self> {
        let start = inner.stream_position()?;
        header.write_bytes(&mut inner)?;
        Ok(Self {
            inner,
            position: u64::from(header.header_length),
            header,
            start,
            records_written: 0,
        })
    }

    #[must_use]
    pub fn header(&self) -> &CommonHeader {
        &self.header
    }

    /// Number of records written so far
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written as usize
    }

    /// Writes one record
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The flowgram does not hold `flows_per_read` values
    /// * A per-base array disagrees with the read header's base count
    /// * Writing to the sink fails
    pub fn write_record(&mut self, record: &SffRecord) -> Result<()> {
        record
            .data
            .validate(self.header.flows(), record.header.bases())?;
        record.header.write_bytes(&mut self.inner)?;
        record.data.write_bytes(&mut self.inner)?;
        self.position += record.encoded_len() as u64;
        self.records_written += 1;
        Ok(())
    }

    /// Writes the optional index block and returns the sink
    ///
    /// With an index, the block is appended after the records and the common
    /// header is rewritten in place with the block's offset and length.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of records written differs from the header's
    /// `number_of_reads`, or if writing to the sink fails.
    pub fn finish(mut self, index: Option<&IndexBlock>) -> Result<W> {
        if self.records_written != self.header.number_of_reads {
            return Err(WriteError::RecordCountMismatch {
                expected: self.header.number_of_reads,
                written: self.records_written,
            }
            .into());
        }
        if let Some(index) = index {
            self.header.index_offset = self.position;
            self.header.index_length = u32::try_from(index.encoded_len()).map_err(|_| {
                WriteError::FieldTooLong {
                    field: "index block",
                    len: index.encoded_len(),
                }
            })?;
            index.write_bytes(&mut self.inner)?;
            self.inner.seek(SeekFrom::Start(self.start))?;
            self.header.write_bytes(&mut self.inner)?;
            self.inner.seek(SeekFrom::End(0))?;
        }
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Returns a mutable reference to the underlying sink
    pub fn by_ref(&mut self) -> &mut W {
        &mut self.inner
    }
}

#[cfg(test)]
mod testing {

    use std::{fs::File, io::BufWriter, io::Cursor};

    use super::*;
    use crate::error::Error;
    use crate::record::{ReadData, ReadHeader};
    use crate::SffReader;

    fn record(name: &str, flows: usize) -> Result<SffRecord> {
        Ok(SffRecord::new(
            ReadHeader::new(name, 5)?.with_quality_clip(2, 4),
            ReadData::new(
                vec![1.0; flows],
                vec![1, 1, 0, 2, 1],
                b"TTGCA".to_vec(),
                vec![38, 37, 36, 35, 34],
            ),
        ))
    }

    #[test]
    fn test_header_only() -> Result<()> {
        let header = CommonHeader::new(b"TACG", b"TCAG", 0)?;
        let writer = SffWriter::new(Cursor::new(Vec::new()), header)?;
        let bytes = writer.finish(None)?.into_inner();
        assert_eq!(bytes.len(), 40);
        Ok(())
    }

    #[test]
    fn test_record_lengths() -> Result<()> {
        let header = CommonHeader::new(b"TACG", b"TCAG", 2)?;
        let mut writer = SffWriter::new(Cursor::new(Vec::new()), header)?;
        writer.write_record(&record("READ1", 4)?)?;
        writer.write_record(&record("READ2", 4)?)?;
        assert_eq!(writer.records_written(), 2);
        let bytes = writer.finish(None)?.into_inner();
        // 40 + 2 * (24 + 24)
        assert_eq!(bytes.len(), 136);
        Ok(())
    }

    #[test]
    fn test_flow_count_mismatch() -> Result<()> {
        let header = CommonHeader::new(b"TACG", b"TCAG", 1)?;
        let mut writer = SffWriter::new(Cursor::new(Vec::new()), header)?;
        let err = writer.write_record(&record("READ1", 5)?).unwrap_err();
        assert!(matches!(
            err,
            Error::WriteError(WriteError::FlowCountMismatch {
                expected: 4,
                got: 5
            })
        ));
        assert_eq!(writer.records_written(), 0);
        Ok(())
    }

    #[test]
    fn test_record_count_mismatch() -> Result<()> {
        let header = CommonHeader::new(b"TACG", b"TCAG", 3)?;
        let mut writer = SffWriter::new(Cursor::new(Vec::new()), header)?;
        writer.write_record(&record("READ1", 4)?)?;
        let err = writer.finish(None).err();
        assert!(matches!(
            err,
            Some(Error::WriteError(WriteError::RecordCountMismatch {
                expected: 3,
                written: 1
            }))
        ));
        Ok(())
    }

    #[test]
    fn test_index_patching() -> Result<()> {
        let header = CommonHeader::new(b"TACG", b"TCAG", 1)?;
        let mut writer = SffWriter::new(Cursor::new(Vec::new()), header)?;
        writer.write_record(&record("READ1", 4)?)?;
        let index = IndexBlock::new("<manifest/>");
        let bytes = writer.finish(Some(&index))?.into_inner();
        assert_eq!(bytes.len(), 88 + index.encoded_len());

        let reader = SffReader::new(Cursor::new(bytes))?;
        assert_eq!(reader.header().index_offset, 88);
        assert_eq!(reader.header().index_length as usize, index.encoded_len());
        assert_eq!(reader.manifest(), Some("<manifest/>"));
        Ok(())
    }

    #[test]
    fn test_to_path() -> Result<()> {
        let path = "test_writer_to_path.sff";
        let inner = File::create(path).map(BufWriter::new)?;
        let header = CommonHeader::new(b"TACG", b"TCAG", 1)?;
        let mut writer = SffWriter::new(inner, header)?;
        writer.write_record(&record("READ1", 4)?)?;
        writer.finish(Some(&IndexBlock::new("<manifest/>")))?;

        let mut reader = SffReader::from_path(path)?;
        let decoded = reader.next_record();
        assert!(matches!(decoded, Some(Ok(_))));
        assert!(reader.next_record().is_none());

        // delete file
        std::fs::remove_file(path)?;

        Ok(())
    }
}
