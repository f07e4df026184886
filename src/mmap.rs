//! Memory-mapped archive reader
//!
//! The archive has no record-level index, so [`MmapReader`] materialises one: a
//! single pass over the read headers records the byte offset of every record,
//! skipping each data section by its computed padded length. After that any
//! record can be decoded independently, which is what the parallel fan-out needs.

use std::fs::File;
use std::io::Cursor;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use log::debug;
use memmap2::Mmap;

use crate::{
    error::{ReadError, Result, Section},
    header::CommonHeader,
    index::IndexBlock,
    parallel::{ParallelProcessor, ParallelReader, BATCH_SIZE},
    record::{ReadHeader, SffRecord, SIZE_READ_HEADER},
    utils::data_len,
    Error,
};

/// A memory-mapped reader for flowgram archives
///
/// The reader shares the mapped file through an `Arc`, so it can be moved into
/// worker threads by [`ParallelReader::process_parallel`].
///
/// # Examples
///
/// ```no_run
/// use sffkit::{MmapReader, Result};
///
/// fn main() -> Result<()> {
///     let reader = MmapReader::new("./data/reads.sff")?;
///
///     // The number of records is known up front
///     let num_records = reader.num_records();
///     println!("Number of records: {}", num_records);
///
///     // Any record can be decoded directly
///     let record = reader.get(num_records / 2)?;
///     println!("{}", record.fasta());
///     Ok(())
/// }
/// ```
pub struct MmapReader {
    /// Memory mapped file contents, wrapped in Arc for thread-safe sharing
    mmap: Arc<Mmap>,

    /// Archive-wide header
    header: CommonHeader,

    /// Index block, if the header declares one
    index: Option<IndexBlock>,

    /// Byte offset of every record
    offsets: Vec<u64>,
}

impl MmapReader {
    /// Maps the file at `path` and locates every record
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be opened or is not a regular file
    /// * The header or index block is invalid
    /// * A read header is malformed or the file ends before the last record
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Verify input file is a file before attempting to map
        let file = File::open(path)?;
        if !file.metadata()?.is_file() {
            return Err(ReadError::IncompatibleFile.into());
        }

        // Safety: the file is open and won't be modified while mapped
        let mmap = unsafe { Mmap::map(&file)? };

        let mut cursor = Cursor::new(&mmap[..]);
        let header = CommonHeader::from_reader(&mut cursor)?;

        let index = if header.has_index() {
            cursor.set_position(header.index_offset);
            Some(IndexBlock::from_reader(&mut cursor, header.index_length)?)
        } else {
            None
        };

        let offsets = locate_records(&mmap, &header)?;
        debug!(
            "Mapped {} bytes, located {} records",
            mmap.len(),
            offsets.len()
        );

        Ok(Self {
            mmap: Arc::new(mmap),
            header,
            index,
            offsets,
        })
    }

    /// Returns the total number of records in the archive
    #[must_use]
    pub fn num_records(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn header(&self) -> &CommonHeader {
        &self.header
    }

    #[must_use]
    pub fn index(&self) -> Option<&IndexBlock> {
        self.index.as_ref()
    }

    /// The XML manifest text, if the archive has an index block
    #[must_use]
    pub fn manifest(&self) -> Option<&str> {
        self.index.as_ref().map(|index| index.manifest.as_str())
    }

    /// Byte offset of the record at `idx`
    #[must_use]
    pub fn offset(&self, idx: usize) -> Option<u64> {
        self.offsets.get(idx).copied()
    }

    /// Decodes the record at `idx` (0-based)
    ///
    /// # Errors
    ///
    /// Returns an error if the index is beyond the number of records in the archive.
    pub fn get(&self, idx: usize) -> Result<SffRecord> {
        let Some(&offset) = self.offsets.get(idx) else {
            return Err(ReadError::OutOfRange(idx, self.num_records()).into());
        };
        let mut cursor = Cursor::new(&self.mmap[..]);
        cursor.set_position(offset);
        SffRecord::from_reader(&mut cursor, self.header.flows()).map_err(|e| e.at_record(idx))
    }

    /// Decodes every record in file order
    pub fn records(&self) -> impl Iterator<Item = Result<SffRecord>> + '_ {
        (0..self.num_records()).map(move |idx| self.get(idx))
    }

    /// Process records in parallel within a specified range
    ///
    /// The range is split into one contiguous chunk per thread. Each thread works
    /// on its own clone of the processor and calls `on_batch_complete` every
    /// [`BATCH_SIZE`] records.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by any thread; a panicking thread surfaces
    /// as [`ReadError::WorkerPanicked`].
    pub fn process_parallel_range<P: ParallelProcessor + Clone + 'static>(
        self,
        processor: P,
        num_threads: usize,
        range: Range<usize>,
    ) -> Result<()> {
        // Calculate the number of threads to use
        let num_threads = if num_threads == 0 {
            num_cpus::get()
        } else {
            num_threads.min(num_cpus::get())
        };

        // Validate range
        let num_records = self.num_records();
        if range.start >= num_records || range.end > num_records || range.start >= range.end {
            return Ok(()); // Nothing to process or invalid range
        }

        let range_size = range.end - range.start;
        let records_per_thread = range_size.div_ceil(num_threads);
        debug!(
            "Processing {range_size} records on {num_threads} threads ({records_per_thread} per thread)"
        );

        let reader = Arc::new(self);

        let mut handles = Vec::new();
        for tid in 0..num_threads {
            let mut processor = processor.clone();
            let reader = reader.clone();
            processor.set_tid(tid);

            let handle = std::thread::spawn(move || -> Result<()> {
                let start_idx = range.start + tid * records_per_thread;
                let end_idx = (start_idx + records_per_thread).min(range.end);

                if start_idx >= end_idx {
                    return Ok(()); // No records for this thread
                }

                for batch_start in (start_idx..end_idx).step_by(BATCH_SIZE) {
                    let batch_end = (batch_start + BATCH_SIZE).min(end_idx);
                    for idx in batch_start..batch_end {
                        processor.process_record(reader.get(idx)?)?;
                    }
                    processor.on_batch_complete()?;
                }

                Ok(())
            });

            handles.push(handle);
        }

        // join every thread before reporting, keeping the first error
        let mut outcome = Ok(());
        for handle in handles {
            let result = handle
                .join()
                .unwrap_or_else(|_| Err(ReadError::WorkerPanicked.into()));
            if outcome.is_ok() {
                outcome = result;
            }
        }
        outcome
    }
}

/// Walks the read headers from `header_length`, returning each record's offset
fn locate_records(mmap: &[u8], header: &CommonHeader) -> Result<Vec<u64>> {
    let flows = header.flows();
    // the declared count is untrusted; never reserve more than the file can hold
    let available = (mmap.len() as u64).saturating_sub(header.data_offset()) as usize;
    let capacity = (header.number_of_reads as usize).min(available / SIZE_READ_HEADER);
    let mut offsets = Vec::with_capacity(capacity);
    let mut cursor = Cursor::new(mmap);
    cursor.set_position(header.data_offset());

    for idx in 0..header.number_of_reads as usize {
        offsets.push(cursor.position());
        let read_header = ReadHeader::from_reader(&mut cursor).map_err(|e| e.at_record(idx))?;
        let next = cursor.position() + data_len(flows, read_header.bases()) as u64;
        if next > mmap.len() as u64 {
            return Err(Error::from(ReadError::UnexpectedEndOfData {
                section: Section::ReadData,
                record: Some(idx),
            }));
        }
        cursor.set_position(next);
    }
    Ok(offsets)
}

/// Parallel processing implementation for memory-mapped readers
impl ParallelReader for MmapReader {
    /// Processes all records in parallel using multiple threads
    ///
    /// `num_threads == 0` uses every available core; larger values are capped at
    /// the number of cores.
    fn process_parallel<P: ParallelProcessor + Clone + 'static>(
        self,
        processor: P,
        num_threads: usize,
    ) -> Result<()> {
        let num_records = self.num_records();
        self.process_parallel_range(processor, num_threads, 0..num_records)
    }
}

#[cfg(test)]
mod testing {
    use std::fs::File;
    use std::io::BufWriter;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::record::ReadData;
    use crate::SffWriter;

    fn write_archive(path: &str, n: usize) -> Result<()> {
        let header = CommonHeader::new(b"TACGTACG", b"TCAG", n as u32)?;
        let inner = File::create(path).map(BufWriter::new)?;
        let mut writer = SffWriter::new(inner, header)?;
        for i in 0..n {
            let len = 1 + i % 9;
            let record = SffRecord::new(
                ReadHeader::new(&format!("R{i}"), len as u32)?,
                ReadData::new(vec![0.5; 8], vec![1; len], vec![b'A'; len], vec![i as u8; len]),
            );
            writer.write_record(&record)?;
        }
        writer.finish(Some(&IndexBlock::new("<manifest/>")))?;
        Ok(())
    }

    #[derive(Clone, Default)]
    struct NameCollector {
        local: Vec<String>,
        names: Arc<Mutex<Vec<String>>>,
        batches: Arc<AtomicUsize>,
    }
    impl ParallelProcessor for NameCollector {
        fn process_record(&mut self, record: SffRecord) -> Result<()> {
            self.local.push(record.name().to_string());
            Ok(())
        }
        fn on_batch_complete(&mut self) -> Result<()> {
            self.names.lock().append(&mut self.local);
            self.batches.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[test]
    fn test_random_access() -> Result<()> {
        let path = "test_mmap_random_access.sff";
        write_archive(path, 40)?;
        let reader = MmapReader::new(path)?;
        assert_eq!(reader.num_records(), 40);
        assert_eq!(reader.manifest(), Some("<manifest/>"));
        assert_eq!(reader.get(17)?.name(), "R17");
        assert_eq!(reader.get(39)?.len(), 4);
        assert!(reader.get(40).is_err());
        for idx in 0..reader.num_records() {
            let offset = reader.offset(idx).unwrap_or_default();
            assert_eq!((offset - reader.header().data_offset()) % 8, 0);
        }
        let names: Vec<_> = reader
            .records()
            .map(|r| r.map(|r| r.name().to_string()))
            .collect::<Result<_>>()?;
        assert_eq!(names.len(), 40);
        assert_eq!(names[0], "R0");

        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn test_parallel_processing() -> Result<()> {
        let path = "test_mmap_parallel.sff";
        write_archive(path, 3000)?;
        let reader = MmapReader::new(path)?;
        let processor = NameCollector::default();
        reader.process_parallel(processor.clone(), 4)?;

        let mut names = processor.names.lock().clone();
        names.sort();
        let mut expected: Vec<_> = (0..3000).map(|i| format!("R{i}")).collect();
        expected.sort();
        assert_eq!(names, expected);
        assert!(processor.batches.load(Ordering::Relaxed) >= 3);

        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn test_truncated_archive() -> Result<()> {
        let path = "test_mmap_truncated.sff";
        write_archive(path, 5)?;
        let bytes = std::fs::read(path)?;
        // drop the index block and part of the last record
        let header = CommonHeader::from_reader(&mut Cursor::new(&bytes[..]))?;
        std::fs::write(path, &bytes[..header.index_offset as usize - 3])?;

        let err = MmapReader::new(path).err();
        std::fs::remove_file(path)?;
        // the header still declares an index beyond the end of the file
        assert!(err.is_some_and(|e| e.is_unexpected_eof()));
        Ok(())
    }

    #[test]
    fn test_inflated_record_count() -> Result<()> {
        let path = "test_mmap_inflated_count.sff";
        let mut header = CommonHeader::new(b"TACG", b"TCAG", 0)?;
        header.number_of_reads = u32::MAX;
        let mut bytes = Vec::new();
        header.write_bytes(&mut bytes)?;
        std::fs::write(path, &bytes)?;

        let err = MmapReader::new(path).err();
        std::fs::remove_file(path)?;
        assert!(matches!(
            err,
            Some(Error::ReadError(ReadError::UnexpectedEndOfData {
                section: Section::ReadHeader,
                record: Some(0),
            }))
        ));
        Ok(())
    }
}
