//! Derived text projections of a read
//!
//! Every projection is an exact string contract consumed by downstream tools.
//! Trimmed forms cover the bases in `[left_clip, right_clip)`; full forms cover
//! every base and, for sequences, mark the clipped flanks in lower case.

use std::fmt::{self, Write};

use super::SffRecord;

/// Offset applied to quality scores when rendering them as characters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QualityEncoding {
    /// Standard scale, `chr(33 + q)`
    #[default]
    Phred33,
    /// Legacy scale, `chr(64 + q)`
    Phred64,
}
impl QualityEncoding {
    #[must_use]
    pub fn offset(self) -> u8 {
        match self {
            Self::Phred33 => 33,
            Self::Phred64 => 64,
        }
    }
}

/// Whether a projection covers the clipped insert or the whole read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Trim {
    #[default]
    Trimmed,
    Full,
}

/// A named projection of a record
///
/// [`View::render`] dispatches to the matching `SffRecord` method. Only
/// `Fasta`, `Fastq`, `Qual` and `Seq` have distinct full forms; the other views
/// ignore [`Trim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The read name alone
    Accno,
    Fasta,
    Fastq,
    Qual,
    /// `name<TAB>bases`
    Seq,
    /// `name<TAB>flowgram`
    Flow,
    /// `name<TAB>bases<TAB>qualities<TAB>flowgram`
    Tab,
}
impl View {
    #[must_use]
    pub fn render(self, record: &SffRecord, trim: Trim, encoding: QualityEncoding) -> String {
        match (self, trim) {
            (Self::Accno, _) => record.name().to_string(),
            (Self::Fasta, Trim::Trimmed) => record.fasta(),
            (Self::Fasta, Trim::Full) => record.full_fasta(),
            (Self::Fastq, Trim::Trimmed) => record.fastq(encoding),
            (Self::Fastq, Trim::Full) => record.full_fastq(encoding),
            (Self::Qual, Trim::Trimmed) => record.qual(),
            (Self::Qual, Trim::Full) => record.full_qual(),
            (Self::Seq, Trim::Trimmed) => record.seq(),
            (Self::Seq, Trim::Full) => record.full_seq(),
            (Self::Flow, _) => record.flow(),
            (Self::Tab, _) => record.tab(),
        }
    }
}

fn bytes_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn join_integers<T: itoa::Integer + Copy>(values: &[T]) -> String {
    let mut buffer = itoa::Buffer::new();
    let mut out = String::with_capacity(values.len() * 3);
    for (i, &value) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(buffer.format(value));
    }
    out
}

fn quality_chars(scores: &[u8], encoding: QualityEncoding) -> String {
    let offset = encoding.offset();
    scores
        .iter()
        .map(|&q| char::from(offset.saturating_add(q)))
        .collect()
}

impl SffRecord {
    /// `"{name} x={x} y={y} region={region}"`, or the bare name for non-accessions
    fn title_prefix(&self) -> String {
        match self.accession() {
            Ok(acc) => format!(
                "{} x={} y={} region={}",
                self.name(),
                acc.x,
                acc.y,
                acc.region
            ),
            Err(_) => self.name().to_string(),
        }
    }

    /// Title line of the trimmed projections
    #[must_use]
    pub fn title(&self) -> String {
        format!("{} length={}", self.title_prefix(), self.trimmed_length())
    }

    /// Title line of the full projections, including the 1-based clip points
    #[must_use]
    pub fn full_title(&self) -> String {
        format!(
            "{} length={} lclip={} rclip={}",
            self.title_prefix(),
            self.full_length(),
            self.left_clip() + 1,
            self.right_clip()
        )
    }

    /// Bases between the clip points
    #[must_use]
    pub fn trimmed_sequence(&self) -> String {
        bytes_to_string(self.trimmed_bases())
    }

    /// All bases, lower case outside the clip points and upper case inside
    #[must_use]
    pub fn full_bases(&self) -> String {
        let (left, right) = (self.left_clip(), self.right_clip());
        self.bases()
            .iter()
            .enumerate()
            .map(|(i, &b)| {
                if i < left || i >= right {
                    char::from(b.to_ascii_lowercase())
                } else {
                    char::from(b.to_ascii_uppercase())
                }
            })
            .collect()
    }

    /// Quality characters for every base
    #[must_use]
    pub fn quality_string(&self, encoding: QualityEncoding) -> String {
        quality_chars(self.quality_scores(), encoding)
    }

    /// Quality characters for the bases between the clip points
    #[must_use]
    pub fn trimmed_quality_string(&self, encoding: QualityEncoding) -> String {
        quality_chars(self.trimmed_quality_scores(), encoding)
    }

    #[must_use]
    pub fn phred33(&self) -> String {
        self.quality_string(QualityEncoding::Phred33)
    }

    #[must_use]
    pub fn phred64(&self) -> String {
        self.quality_string(QualityEncoding::Phred64)
    }

    /// Space-separated quality scores of every base
    #[must_use]
    pub fn quality_text(&self) -> String {
        join_integers(self.quality_scores())
    }

    /// Space-separated quality scores between the clip points
    #[must_use]
    pub fn trimmed_quality_text(&self) -> String {
        join_integers(self.trimmed_quality_scores())
    }

    /// Space-separated flowgram values with two decimals
    #[must_use]
    pub fn flowgram_text(&self) -> String {
        let mut out = String::with_capacity(self.flowgram_values().len() * 5);
        for (i, value) in self.flowgram_values().iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            // writing into a String cannot fail
            let _ = write!(out, "{value:.2}");
        }
        out
    }

    /// Space-separated flow index deltas
    #[must_use]
    pub fn flow_index_text(&self) -> String {
        join_integers(self.flow_index_per_base())
    }

    /// `">{title}\n{trimmed bases}"`
    #[must_use]
    pub fn fasta(&self) -> String {
        format!(">{}\n{}", self.title(), self.trimmed_sequence())
    }

    /// `">{full_title}\n{case-marked bases}"`
    #[must_use]
    pub fn full_fasta(&self) -> String {
        format!(">{}\n{}", self.full_title(), self.full_bases())
    }

    /// `"@{title}\n{trimmed bases}\n+\n{trimmed qualities}"`
    #[must_use]
    pub fn fastq(&self, encoding: QualityEncoding) -> String {
        format!(
            "@{}\n{}\n+\n{}",
            self.title(),
            self.trimmed_sequence(),
            self.trimmed_quality_string(encoding)
        )
    }

    /// `"@{full_title}\n{case-marked bases}\n+\n{qualities}"`
    #[must_use]
    pub fn full_fastq(&self, encoding: QualityEncoding) -> String {
        format!(
            "@{}\n{}\n+\n{}",
            self.full_title(),
            self.full_bases(),
            self.quality_string(encoding)
        )
    }

    /// `">{title}\n{trimmed quality scores}"`
    #[must_use]
    pub fn qual(&self) -> String {
        format!(">{}\n{}", self.title(), self.trimmed_quality_text())
    }

    /// `">{full_title}\n{quality scores}"`
    #[must_use]
    pub fn full_qual(&self) -> String {
        format!(">{}\n{}", self.full_title(), self.quality_text())
    }

    /// `"{name}\t{trimmed bases}"`
    #[must_use]
    pub fn seq(&self) -> String {
        format!("{}\t{}", self.name(), self.trimmed_sequence())
    }

    /// `"{name}\t{bases}"`
    #[must_use]
    pub fn full_seq(&self) -> String {
        format!("{}\t{}", self.name(), bytes_to_string(self.bases()))
    }

    /// `"{name}\t{flowgram}"`
    #[must_use]
    pub fn flow(&self) -> String {
        format!("{}\t{}", self.name(), self.flowgram_text())
    }

    /// `"{name}\t{bases}\t{quality scores}\t{flowgram}"`
    #[must_use]
    pub fn tab(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.name(),
            bytes_to_string(self.bases()),
            self.quality_text(),
            self.flowgram_text()
        )
    }
}

impl fmt::Display for SffRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}\n{}\n{}",
            self.title(),
            self.flowgram_text(),
            self.flow_index_text(),
            bytes_to_string(self.bases()),
            self.quality_text()
        )
    }
}
