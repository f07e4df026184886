use std::io::Read;

use super::{ReadData, ReadHeader};
use crate::codec::{Accession, Timestamp};
use crate::error::Result;

/// A decoded read: one read header and its data section
///
/// Clip bounds are normalised to a 0-based half-open range
/// `[left_clip, right_clip)` over the called bases.
#[derive(Debug, Clone, PartialEq)]
pub struct SffRecord {
    pub header: ReadHeader,
    pub data: ReadData,
}
impl SffRecord {
    #[must_use]
    pub fn new(header: ReadHeader, data: ReadData) -> Self {
        Self { header, data }
    }

    /// Decodes one record (read header then read data) from the reader
    ///
    /// On success the reader is positioned on the 8-byte boundary where the next
    /// record starts.
    pub fn from_reader<R: Read>(reader: &mut R, flows_per_read: usize) -> Result<Self> {
        let header = ReadHeader::from_reader(reader)?;
        let data = ReadData::from_reader(reader, flows_per_read, header.bases())?;
        Ok(Self { header, data })
    }

    /// Byte length of the record in the archive, padding included
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        usize::from(self.header.header_length) + self.data.encoded_len()
    }

    /// The read name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.header.name
    }

    /// Number of called bases
    #[must_use]
    pub fn len(&self) -> usize {
        self.header.bases()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First base of the insert (0-based, inclusive)
    ///
    /// `max(0, clip_qual_left - 1, clip_adapter_left - 1)`; an unset (0) clip
    /// contributes nothing. Never exceeds [`Self::right_clip`].
    #[must_use]
    pub fn left_clip(&self) -> usize {
        let qual = usize::from(self.header.clip_qual_left.saturating_sub(1));
        let adapter = usize::from(self.header.clip_adapter_left.saturating_sub(1));
        qual.max(adapter).min(self.right_clip())
    }

    /// End of the insert (0-based, exclusive)
    ///
    /// The minimum of the right clips, each replaced by the base count when unset.
    /// Never exceeds the base count.
    #[must_use]
    pub fn right_clip(&self) -> usize {
        let base_count = self.len();
        let or_full = |clip: u16| match clip {
            0 => base_count,
            c => usize::from(c),
        };
        or_full(self.header.clip_qual_right)
            .min(or_full(self.header.clip_adapter_right))
            .min(base_count)
    }

    /// Number of bases between the clip points
    #[must_use]
    pub fn trimmed_length(&self) -> usize {
        self.right_clip() - self.left_clip()
    }

    /// Number of called bases, clipped or not
    #[must_use]
    pub fn full_length(&self) -> usize {
        self.len()
    }

    /// All called bases
    #[must_use]
    pub fn bases(&self) -> &[u8] {
        &self.data.bases
    }

    /// Clip range limited to an array of `len` entries
    ///
    /// Decoded arrays always hold `base_count` entries; hand-built records may not.
    fn clip_range(&self, len: usize) -> std::ops::Range<usize> {
        let right = self.right_clip().min(len);
        self.left_clip().min(right)..right
    }

    /// Bases between the clip points
    #[must_use]
    pub fn trimmed_bases(&self) -> &[u8] {
        &self.data.bases[self.clip_range(self.data.bases.len())]
    }

    /// All quality scores
    #[must_use]
    pub fn quality_scores(&self) -> &[u8] {
        &self.data.quality_scores
    }

    /// Quality scores between the clip points
    #[must_use]
    pub fn trimmed_quality_scores(&self) -> &[u8] {
        &self.data.quality_scores[self.clip_range(self.data.quality_scores.len())]
    }

    #[must_use]
    pub fn flowgram_values(&self) -> &[f64] {
        &self.data.flowgram_values
    }

    #[must_use]
    pub fn flow_index_per_base(&self) -> &[u8] {
        &self.data.flow_index_per_base
    }

    /// Absolute 1-based flow position of every base
    ///
    /// The stored indexes are deltas from the previous base's flow.
    #[must_use]
    pub fn flow_positions(&self) -> Vec<usize> {
        self.data
            .flow_index_per_base
            .iter()
            .scan(0usize, |pos, &delta| {
                *pos += usize::from(delta);
                Some(*pos)
            })
            .collect()
    }

    /// Decodes the read name as a universal accession
    pub fn accession(&self) -> Result<Accession> {
        Accession::parse(self.name())
    }

    /// Run timestamp encoded in the accession
    pub fn timestamp(&self) -> Result<Timestamp> {
        Ok(self.accession()?.timestamp)
    }

    /// Region number encoded in the accession
    pub fn region(&self) -> Result<u8> {
        Ok(self.accession()?.region)
    }

    /// Well coordinates encoded in the accession
    pub fn xy(&self) -> Result<(u32, u32)> {
        let accession = self.accession()?;
        Ok((accession.x, accession.y))
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use anyhow::Result;

    fn record(clips: [u16; 4], n: usize) -> SffRecord {
        let header = ReadHeader::new("C3U5GWL01CBXT2", n as u32)
            .unwrap()
            .with_quality_clip(clips[0], clips[1])
            .with_adapter_clip(clips[2], clips[3]);
        let data = ReadData::new(
            vec![1.0; 8],
            vec![1; n],
            b"ACGT".repeat(n / 4 + 1)[..n].to_vec(),
            vec![20; n],
        );
        SffRecord::new(header, data)
    }

    #[test]
    fn test_unset_clips() {
        let r = record([0, 0, 0, 0], 10);
        assert_eq!(r.left_clip(), 0);
        assert_eq!(r.right_clip(), 10);
        assert_eq!(r.trimmed_length(), 10);
        assert_eq!(r.full_length(), 10);
    }

    #[test]
    fn test_clip_first_base() {
        // a left clip of 1 means the insert starts at the first base
        let r = record([1, 0, 0, 0], 10);
        assert_eq!(r.left_clip(), 0);
    }

    #[test]
    fn test_quality_and_adapter_clips() {
        let r = record([5, 9, 3, 7], 10);
        assert_eq!(r.left_clip(), 4);
        assert_eq!(r.right_clip(), 7);
        assert_eq!(r.trimmed_length(), 3);
        assert_eq!(r.trimmed_bases(), &r.bases()[4..7]);

        let r = record([3, 0, 6, 0], 10);
        assert_eq!(r.left_clip(), 5);
        assert_eq!(r.right_clip(), 10);

        let r = record([0, 0, 0, 8], 10);
        assert_eq!(r.left_clip(), 0);
        assert_eq!(r.right_clip(), 8);
    }

    #[test]
    fn test_clip_bounds_hold_for_inconsistent_values() {
        for clips in [[20, 0, 0, 0], [0, 30, 0, 0], [9, 4, 0, 0], [0, 0, 11, 2]] {
            let r = record(clips, 10);
            assert!(r.left_clip() <= r.right_clip());
            assert!(r.right_clip() <= r.len());
            assert_eq!(r.trimmed_bases().len(), r.trimmed_length());
        }
    }

    #[test]
    fn test_short_arrays_do_not_panic() {
        let header = ReadHeader::new("SHORT", 10)
            .unwrap()
            .with_quality_clip(3, 8);
        let data = ReadData::new(vec![1.0; 8], vec![1; 5], b"ACGTA".to_vec(), vec![20; 2]);
        let r = SffRecord::new(header, data);
        assert_eq!(r.trimmed_bases(), b"GTA");
        assert!(r.trimmed_quality_scores().is_empty());
        assert_eq!(r.fasta(), ">SHORT length=6\nGTA");
    }

    #[test]
    fn test_empty_read() {
        let r = record([0, 0, 0, 0], 0);
        assert!(r.is_empty());
        assert_eq!(r.trimmed_length(), 0);
    }

    #[test]
    fn test_flow_positions() {
        let mut r = record([0, 0, 0, 0], 4);
        r.data.flow_index_per_base = vec![1, 0, 3, 2];
        assert_eq!(r.flow_positions(), vec![1, 1, 4, 6]);
    }

    #[test]
    fn test_accession_accessors() -> Result<()> {
        let r = record([0, 0, 0, 0], 4);
        assert_eq!(r.region()?, 1);
        assert_eq!(r.xy()?, (838, 3960));
        assert_eq!(r.timestamp()?.year, 2004);
        assert_eq!(r.timestamp()?.month, 9);
        Ok(())
    }
}
