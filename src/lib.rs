//! # sffkit
//!
//! A decoder for flowgram read archives (`.sff`), the container written by
//! pyrosequencing instruments. An archive holds one common header, an optional
//! index block carrying an XML manifest, and a fixed number of variable-length
//! read records. Each record stores per-flow signal estimates, basecalls, per-base
//! qualities and clipping metadata.
//!
//! ## Layout
//!
//! All multi-byte fields are big-endian and every section is padded to a multiple
//! of eight bytes.
//!
//! | Section       | Contents                                                    |
//! | ------------- | ----------------------------------------------------------- |
//! | Common header | 31 fixed bytes, flow characters, key sequence, padding      |
//! | Index block   | `.mft` magic, version, sizes, XML manifest, opaque table    |
//! | Read header   | 16 fixed bytes, read name, padding                          |
//! | Read data     | `u16` flowgram per flow, flow index, bases, qualities, pad  |
//!
//! ## Reading
//!
//! [`SffReader`] decodes records sequentially from any `Read + Seek` source.
//! [`MmapReader`] maps a file, locates every record up front, and supports random
//! access and parallel processing through [`ParallelReader`].
//!
//! ```no_run
//! use sffkit::{QualityEncoding, Result};
//!
//! fn main() -> Result<()> {
//!     let reader = sffkit::open("./data/reads.sff")?;
//!     for record in reader {
//!         let record = record?;
//!         println!("{}", record.fastq(QualityEncoding::Phred33));
//!     }
//!     Ok(())
//! }
//! ```

mod codec;
mod error;
mod header;
mod index;
mod mmap;
mod parallel;
mod reader;
mod record;
mod utils;
mod writer;

pub use codec::{
    base36_decode, base36_encode, base36_encode_fixed, name_hash, timestamp_decode,
    timestamp_encode, xy_decode, xy_encode, Accession, Timestamp,
};
pub use error::{
    AccessionError, Error, HeaderError, IndexError, ReadError, Result, Section, WriteError,
};
pub use header::{expected_header_length, CommonHeader, MAGIC, SIZE_FIXED_HEADER};
pub use index::{IndexBlock, INDEX_MAGIC};
pub use mmap::MmapReader;
pub use parallel::{ParallelProcessor, ParallelReader, BATCH_SIZE};
pub use reader::{open, ReaderState, Records, SffReader};
pub use record::{
    QualityEncoding, ReadData, ReadHeader, SffRecord, Trim, View, SIZE_READ_HEADER,
};
pub use utils::{data_len, data_padding, padded_len};
pub use writer::SffWriter;
