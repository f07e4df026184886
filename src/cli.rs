use std::path::PathBuf;

use clap::{ArgGroup, Parser};
use sffkit::{QualityEncoding, Trim, View};

/// Extract reads from flowgram archives (.sff)
#[derive(Parser, Debug)]
#[command(version, about)]
#[command(group(
    ArgGroup::new("mode")
        .args(["accno", "seq", "qual", "flow", "tab", "mft", "readnum", "fastq"])
        .multiple(false)
))]
pub struct Cli {
    /// Input archive(s)
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Print read names
    #[arg(short = 'a', long)]
    pub accno: bool,

    /// Print FASTA sequences
    #[arg(short = 's', long)]
    pub seq: bool,

    /// Print FASTA-style quality scores
    #[arg(short = 'q', long)]
    pub qual: bool,

    /// Print read names with flowgram values
    #[arg(short = 'f', long)]
    pub flow: bool,

    /// Print name, bases, qualities and flowgram on one tab-separated line
    #[arg(short = 't', long)]
    pub tab: bool,

    /// Print the XML manifest
    #[arg(short = 'm', long)]
    pub mft: bool,

    /// Print the number of reads in each archive
    #[arg(short = 'r', long)]
    pub readnum: bool,

    /// Print FASTQ records (default)
    #[arg(short = 'u', long)]
    pub fastq: bool,

    /// Keep clipped bases (lower case) in sequence, quality and FASTQ output
    #[arg(short = 'n', long)]
    pub notrim: bool,

    /// Use the phred+64 quality offset in FASTQ output
    #[arg(long)]
    pub phred64: bool,

    /// Log decoding progress to stderr
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

/// What to print for each archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// One rendered view per record
    Records(View),
    Manifest,
    ReadCount,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.accno {
            Mode::Records(View::Accno)
        } else if self.seq {
            Mode::Records(View::Fasta)
        } else if self.qual {
            Mode::Records(View::Qual)
        } else if self.flow {
            Mode::Records(View::Flow)
        } else if self.tab {
            Mode::Records(View::Tab)
        } else if self.mft {
            Mode::Manifest
        } else if self.readnum {
            Mode::ReadCount
        } else {
            Mode::Records(View::Fastq)
        }
    }

    pub fn trim(&self) -> Trim {
        if self.notrim {
            Trim::Full
        } else {
            Trim::Trimmed
        }
    }

    pub fn encoding(&self) -> QualityEncoding {
        if self.phred64 {
            QualityEncoding::Phred64
        } else {
            QualityEncoding::Phred33
        }
    }
}
