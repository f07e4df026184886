use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::debug;
use sffkit::SffReader;

mod cli;

use cli::{Cli, Mode};

fn main() -> Result<()> {
    let args = Cli::parse();
    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mode = args.mode();
    let (trim, encoding) = (args.trim(), args.encoding());
    let mut out = BufWriter::new(std::io::stdout().lock());

    for path in &args.inputs {
        let mut reader = SffReader::from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        debug!("Opened {} ({} reads)", path.display(), reader.num_records());

        match mode {
            Mode::ReadCount => writeln!(out, "{} {}", path.display(), reader.num_records())?,
            Mode::Manifest => writeln!(out, "{}", reader.manifest().unwrap_or_default())?,
            Mode::Records(view) => {
                for record in reader.records() {
                    let record =
                        record.with_context(|| format!("Failed to decode {}", path.display()))?;
                    writeln!(out, "{}", view.render(&record, trim, encoding))?;
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}
