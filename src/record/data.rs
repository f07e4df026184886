use std::io::{Read, Write};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::error::{Result, Section, WriteError};
use crate::utils::{data_len, data_padding, read_section, skip_bytes, write_padding};

/// Scale of the fixed-point flowgram encoding (two decimal places)
pub const FLOWGRAM_SCALE: f64 = 100.0;

/// Largest value representable in the fixed-point encoding
pub const FLOWGRAM_MAX: f64 = u16::MAX as f64 / FLOWGRAM_SCALE;

/// The signal, basecall and quality payload of one read
#[derive(Debug, Clone, PartialEq)]
pub struct ReadData {
    /// Homopolymer length estimate for every flow
    pub flowgram_values: Vec<f64>,
    /// Incremental flow position of each base (offset from the previous base's flow)
    pub flow_index_per_base: Vec<u8>,
    /// Called bases
    pub bases: Vec<u8>,
    /// Per-base quality on the -10 log10 error probability scale
    pub quality_scores: Vec<u8>,
}
impl ReadData {
    #[must_use]
    pub fn new(
        flowgram_values: Vec<f64>,
        flow_index_per_base: Vec<u8>,
        bases: Vec<u8>,
        quality_scores: Vec<u8>,
    ) -> Self {
        Self {
            flowgram_values,
            flow_index_per_base,
            bases,
            quality_scores,
        }
    }

    /// Number of called bases
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Reads a data section, consuming its trailing alignment padding
    ///
    /// The layout is `flows_per_read` big-endian `u16` values (divided by 100),
    /// then `base_count` flow indexes, bases and quality scores, then
    /// `(8 - ((2f + 3b) mod 8)) mod 8` bytes of padding.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream ends before the section is complete.
    pub fn from_reader<R: Read>(
        reader: &mut R,
        flows_per_read: usize,
        base_count: usize,
    ) -> Result<Self> {
        let mut raw = vec![0u8; 2 * flows_per_read];
        read_section(reader, &mut raw, Section::ReadData)?;
        let flowgram_values = raw
            .chunks_exact(2)
            .map(|c| f64::from(BigEndian::read_u16(c)) / FLOWGRAM_SCALE)
            .collect();

        let mut flow_index_per_base = vec![0u8; base_count];
        read_section(reader, &mut flow_index_per_base, Section::ReadData)?;
        let mut bases = vec![0u8; base_count];
        read_section(reader, &mut bases, Section::ReadData)?;
        let mut quality_scores = vec![0u8; base_count];
        read_section(reader, &mut quality_scores, Section::ReadData)?;

        skip_bytes(
            reader,
            data_padding(flows_per_read, base_count),
            Section::ReadData,
        )?;

        Ok(Self {
            flowgram_values,
            flow_index_per_base,
            bases,
            quality_scores,
        })
    }

    /// Length of the encoded section, padding included
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        data_len(self.flowgram_values.len(), self.bases.len())
    }

    /// Checks that the arrays agree with the archive and record dimensions
    pub(crate) fn validate(&self, flows_per_read: usize, base_count: usize) -> Result<()> {
        if self.flowgram_values.len() != flows_per_read {
            return Err(WriteError::FlowCountMismatch {
                expected: flows_per_read,
                got: self.flowgram_values.len(),
            }
            .into());
        }
        for (field, got) in [
            ("flow_index_per_base", self.flow_index_per_base.len()),
            ("bases", self.bases.len()),
            ("quality_scores", self.quality_scores.len()),
        ] {
            if got != base_count {
                return Err(WriteError::BaseCountMismatch {
                    field,
                    expected: base_count,
                    got,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Writes the section followed by its alignment padding
    ///
    /// Flowgram values are stored as `round(value * 100)`, clamped to `0..=655.35`.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the writer fails (typically an I/O error).
    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> Result<()> {
        for &value in &self.flowgram_values {
            let stored = (value.clamp(0.0, FLOWGRAM_MAX) * FLOWGRAM_SCALE).round() as u16;
            writer.write_u16::<BigEndian>(stored)?;
        }
        writer.write_all(&self.flow_index_per_base)?;
        writer.write_all(&self.bases)?;
        writer.write_all(&self.quality_scores)?;
        write_padding(
            writer,
            data_padding(self.flowgram_values.len(), self.bases.len()),
        )
    }
}
