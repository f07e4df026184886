//! Streaming archive reader
//!
//! [`SffReader`] decodes an archive in a single forward pass: the common header
//! once, the index block if one is declared, then exactly `number_of_reads`
//! records in file order. A record's start is only known once every record before
//! it has been consumed, so the reader owns its stream and the current offset.
//!
//! Any decode failure is fatal. The failing call returns the error and the reader
//! yields nothing afterwards; records already returned stay valid.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::{debug, trace};

use crate::error::Result;
use crate::header::CommonHeader;
use crate::index::IndexBlock;
use crate::record::SffRecord;

/// Lifecycle of an [`SffReader`]
///
/// Transitions are strictly forward. Rewinding means opening a new reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReaderState {
    /// Nothing has been read
    Unopened,
    /// The common header is decoded
    HeaderParsed,
    /// The index block is decoded (only reached when the archive has one)
    IndexParsed,
    /// At least one record has been requested
    Streaming,
    /// Every declared record was returned, or decoding failed
    Exhausted,
}

/// A sequential reader over any seekable byte source
///
/// # Examples
///
/// ```no_run
/// use sffkit::{Result, SffReader};
///
/// fn main() -> Result<()> {
///     let mut reader = SffReader::from_path("./data/reads.sff")?;
///     println!("{} reads", reader.num_records());
///     for record in reader.records() {
///         let record = record?;
///         println!("{}", record.fasta());
///     }
///     Ok(())
/// }
/// ```
pub struct SffReader<R: Read + Seek> {
    /// The underlying byte source
    reader: R,

    /// Archive-wide header
    header: CommonHeader,

    /// Index block, if the header declares one
    index: Option<IndexBlock>,

    /// Current lifecycle state
    state: ReaderState,

    /// Number of records decoded so far
    n_processed: usize,

    /// Absolute byte offset of the next record
    offset: u64,
}

impl SffReader<BufReader<File>> {
    /// Opens the archive at `path` behind a buffered file handle
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its header or index block
    /// is invalid (see [`SffReader::new`]).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> SffReader<R> {
    /// Creates a reader from a source positioned anywhere
    ///
    /// The common header is decoded from offset 0, the index block (if any) from
    /// `index_offset`, and the source is left at `header_length`, the start of the
    /// first record. The header padding is never read.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The magic number or another header field is invalid
    /// * The index block is malformed
    /// * The source ends before the header or index block is complete
    pub fn new(reader: R) -> Result<Self> {
        let mut this = Self {
            reader,
            header: CommonHeader::default(),
            index: None,
            state: ReaderState::Unopened,
            n_processed: 0,
            offset: 0,
        };
        this.open()?;
        Ok(this)
    }

    fn open(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.header = CommonHeader::from_reader(&mut self.reader)?;
        self.state = ReaderState::HeaderParsed;
        debug!(
            "Parsed common header: {} reads, {} flows per read, key {:?}, header length {}",
            self.header.number_of_reads,
            self.header.flows_per_read,
            String::from_utf8_lossy(&self.header.key_sequence),
            self.header.header_length,
        );

        if self.header.has_index() {
            self.reader.seek(SeekFrom::Start(self.header.index_offset))?;
            let index = IndexBlock::from_reader(&mut self.reader, self.header.index_length)?;
            debug!(
                "Parsed index block at offset {}: manifest {} bytes, table {} bytes",
                self.header.index_offset,
                index.xml_size(),
                index.data_size(),
            );
            self.index = Some(index);
            self.state = ReaderState::IndexParsed;
        }

        self.offset = self.header.data_offset();
        self.reader.seek(SeekFrom::Start(self.offset))?;
        Ok(())
    }

    /// The archive's common header
    #[must_use]
    pub fn header(&self) -> &CommonHeader {
        &self.header
    }

    /// The index block, if the archive declares one
    #[must_use]
    pub fn index(&self) -> Option<&IndexBlock> {
        self.index.as_ref()
    }

    /// The XML manifest text, if the archive has an index block
    #[must_use]
    pub fn manifest(&self) -> Option<&str> {
        self.index.as_ref().map(|index| index.manifest.as_str())
    }

    /// Number of records declared by the header
    #[must_use]
    pub fn num_records(&self) -> usize {
        self.header.number_of_reads as usize
    }

    /// Number of records decoded so far
    #[must_use]
    pub fn n_processed(&self) -> usize {
        self.n_processed
    }

    /// Absolute byte offset of the next record
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Decodes the next record
    ///
    /// # Returns
    ///
    /// * `Some(Ok(SffRecord))` - The next record in file order
    /// * `Some(Err(Error))` - Decoding failed; the reader is now exhausted
    /// * `None` - Every declared record was returned, or an earlier call failed
    pub fn next_record(&mut self) -> Option<Result<SffRecord>> {
        if self.state == ReaderState::Exhausted {
            return None;
        }
        if self.n_processed >= self.num_records() {
            debug!("Archive exhausted after {} records", self.n_processed);
            self.state = ReaderState::Exhausted;
            return None;
        }
        self.state = ReaderState::Streaming;

        match SffRecord::from_reader(&mut self.reader, self.header.flows()) {
            Ok(record) => {
                trace!(
                    "Decoded record {} ({}, {} bases) at offset {}",
                    self.n_processed,
                    record.name(),
                    record.len(),
                    self.offset
                );
                self.offset += record.encoded_len() as u64;
                self.n_processed += 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.state = ReaderState::Exhausted;
                Some(Err(e.at_record(self.n_processed)))
            }
        }
    }

    /// Iterates over the remaining records
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self }
    }

    /// Consumes the reader and returns the underlying source
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn remaining(&self) -> usize {
        if self.state == ReaderState::Exhausted {
            0
        } else {
            self.num_records() - self.n_processed
        }
    }
}

impl<R: Read + Seek> Iterator for SffReader<R> {
    type Item = Result<SffRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining()))
    }
}

/// Borrowing iterator returned by [`SffReader::records`]
pub struct Records<'a, R: Read + Seek> {
    reader: &'a mut SffReader<R>,
}

impl<R: Read + Seek> Iterator for Records<'_, R> {
    type Item = Result<SffRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_record()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.reader.size_hint()
    }
}

/// Opens the archive at `path` for sequential reading
///
/// # Errors
///
/// Returns an error if the file cannot be opened or its header is invalid.
pub fn open<P: AsRef<Path>>(path: P) -> Result<SffReader<BufReader<File>>> {
    SffReader::from_path(path)
}

#[cfg(test)]
mod testing {
    use super::*;
    use crate::error::{Error, ReadError, Section};
    use crate::record::{ReadData, ReadHeader};
    use crate::{IndexBlock, SffWriter};
    use anyhow::Result;
    use std::io::Cursor;

    fn make_record(i: usize, flows: usize) -> SffRecord {
        let n = 3 + i % 11;
        let header = ReadHeader::new(&format!("READ{i}"), n as u32)
            .unwrap()
            .with_quality_clip(2, 0);
        let data = ReadData::new(
            (0..flows).map(|f| (f % 4) as f64).collect(),
            vec![1; n],
            b"ACGT".repeat(n / 4 + 1)[..n].to_vec(),
            vec![20; n],
        );
        SffRecord::new(header, data)
    }

    fn build_archive(n: usize, manifest: Option<&str>) -> Result<Vec<u8>> {
        let header = CommonHeader::new(b"TACGTACGTACG", b"TCAG", n as u32)?;
        let mut writer = SffWriter::new(Cursor::new(Vec::new()), header)?;
        for i in 0..n {
            writer.write_record(&make_record(i, 12))?;
        }
        let index = manifest.map(IndexBlock::new);
        Ok(writer.finish(index.as_ref())?.into_inner())
    }

    #[test]
    fn test_states() -> Result<()> {
        let mut reader = SffReader::new(Cursor::new(build_archive(2, None)?))?;
        assert_eq!(reader.state(), ReaderState::HeaderParsed);
        reader.next_record().unwrap()?;
        assert_eq!(reader.state(), ReaderState::Streaming);
        reader.next_record().unwrap()?;
        assert!(reader.next_record().is_none());
        assert_eq!(reader.state(), ReaderState::Exhausted);
        assert!(reader.next_record().is_none());
        Ok(())
    }

    #[test]
    fn test_record_count_and_alignment() -> Result<()> {
        let mut reader = SffReader::new(Cursor::new(build_archive(25, None)?))?;
        let data_offset = reader.header().data_offset();
        let mut count = 0;
        while let Some(record) = reader.next_record() {
            let record = record?;
            assert_eq!(record.flowgram_values().len(), 12);
            assert_eq!((reader.offset() - data_offset) % 8, 0);
            count += 1;
        }
        assert_eq!(count, 25);
        assert_eq!(reader.n_processed(), 25);
        let position = reader.into_inner().stream_position()?;
        assert_eq!((position - data_offset) % 8, 0);
        Ok(())
    }

    #[test]
    fn test_records_match_written() -> Result<()> {
        let reader = SffReader::new(Cursor::new(build_archive(10, None)?))?;
        for (i, record) in reader.enumerate() {
            assert_eq!(record?, make_record(i, 12));
        }
        Ok(())
    }

    #[test]
    fn test_manifest() -> Result<()> {
        let manifest = "<manifest><run>R_2008_03_14</run></manifest>";
        let mut reader = SffReader::new(Cursor::new(build_archive(4, Some(manifest))?))?;
        assert_eq!(reader.state(), ReaderState::IndexParsed);
        assert_eq!(reader.manifest(), Some(manifest));
        // the index sits after the records and does not disturb iteration
        assert_eq!(reader.records().count(), 4);

        let reader = SffReader::new(Cursor::new(build_archive(4, None)?))?;
        assert!(reader.manifest().is_none());
        Ok(())
    }

    #[test]
    fn test_half_declared_index_is_ignored() -> Result<()> {
        // an index needs both a nonzero offset and a nonzero length
        for (offset, length) in [(4096u64, 0u32), (0, 64)] {
            let mut bytes = build_archive(3, None)?;
            bytes[8..16].copy_from_slice(&offset.to_be_bytes());
            bytes[16..20].copy_from_slice(&length.to_be_bytes());

            let mut reader = SffReader::new(Cursor::new(bytes))?;
            assert!(!reader.header().has_index());
            assert_eq!(reader.state(), ReaderState::HeaderParsed);
            assert!(reader.index().is_none());
            assert!(reader.manifest().is_none());
            for (i, record) in reader.records().enumerate() {
                assert_eq!(record?, make_record(i, 12));
            }
            assert_eq!(reader.n_processed(), 3);
        }
        Ok(())
    }

    #[test]
    fn test_size_hint() -> Result<()> {
        let mut reader = SffReader::new(Cursor::new(build_archive(5, None)?))?;
        assert_eq!(reader.size_hint(), (0, Some(5)));
        reader.next_record().unwrap()?;
        assert_eq!(reader.records().size_hint(), (0, Some(4)));
        Ok(())
    }

    #[test]
    fn test_truncated_mid_record() -> Result<()> {
        let mut bytes = build_archive(3, None)?;
        bytes.truncate(bytes.len() - 5);
        let mut reader = SffReader::new(Cursor::new(bytes))?;
        assert!(reader.next_record().unwrap().is_ok());
        assert!(reader.next_record().unwrap().is_ok());
        match reader.next_record() {
            Some(Err(Error::ReadError(ReadError::UnexpectedEndOfData { section, record }))) => {
                assert_eq!(section, Section::ReadData);
                assert_eq!(record, Some(2));
            }
            other => panic!("expected end of data, got {other:?}"),
        }
        assert!(reader.next_record().is_none());
        Ok(())
    }

    #[test]
    fn test_early_stop() -> Result<()> {
        let mut reader = SffReader::new(Cursor::new(build_archive(8, None)?))?;
        let first: Vec<_> = reader.records().take(3).collect::<crate::Result<_>>()?;
        assert_eq!(first.len(), 3);
        assert_eq!(reader.n_processed(), 3);
        Ok(())
    }
}
