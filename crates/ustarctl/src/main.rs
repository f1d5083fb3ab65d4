//! ustarctl - create and list USTAR archives.

use std::{
    ffi::OsString,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use ustar_archive::{walk_in, ArchiveWriter, IdentityPolicy, WriteOptions};
use ustar_header::{
    stream::{ArchiveScanner, ScanOptions, Selection},
    Conformance,
};

mod listing;

/// Create and list USTAR archives.
#[derive(Parser, Debug)]
#[command(name = "ustarctl", version, about)]
struct App {
    /// Print each path while creating; print long listings while listing.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Only write and accept plain USTAR headers (no GNU extensions, complete
    /// end-of-archive marker).
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write files and directory trees into a new archive.
    Create {
        /// Leave owner and group names empty when they cannot be resolved,
        /// instead of failing.
        #[arg(long)]
        lenient_ids: bool,

        /// Look PATHs up relative to this directory.
        #[arg(long, short = 'C')]
        directory: Option<PathBuf>,

        /// The archive to create (truncated if it exists).
        archive: PathBuf,

        /// Files and directories to add, in order.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List the entries of an archive.
    List {
        /// The archive to read.
        archive: PathBuf,

        /// Only list these paths and everything below them.
        selectors: Vec<OsString>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let app = App::parse();

    match app.cmd {
        Command::Create {
            lenient_ids,
            directory,
            archive,
            paths,
        } => {
            let options = WriteOptions {
                conformance: if app.strict {
                    Conformance::Strict
                } else {
                    Conformance::Lenient
                },
                identity: if lenient_ids {
                    IdentityPolicy::Lenient
                } else {
                    IdentityPolicy::Require
                },
            };
            create(&archive, directory.unwrap_or_default(), &paths, options, app.verbose)
        }
        Command::List { archive, selectors } => list(&archive, &selectors, app.strict, app.verbose),
    }
}

fn create(
    archive: &Path,
    directory: PathBuf,
    paths: &[PathBuf],
    options: WriteOptions,
    verbose: bool,
) -> Result<()> {
    let tree = walk_in(&directory, paths);
    log::debug!(
        "walked {} entries, {} skipped",
        tree.entries.len(),
        tree.skipped.len()
    );
    for skipped in &tree.skipped {
        eprintln!("ustarctl: {skipped}");
    }

    let file = File::create(archive).with_context(|| format!("Failed to create {archive:?}"))?;
    let mut writer = ArchiveWriter::new(BufWriter::new(file), options);
    let mut stdout = io::stdout().lock();

    for entry in &tree.entries {
        writer
            .append(entry)
            .with_context(|| format!("Failed to add {:?}", entry.fs_path))?;
        if verbose {
            writeln!(stdout, "{}", entry.archive_path_lossy())?;
        }
    }
    writer
        .finish()
        .with_context(|| format!("Failed to finish {archive:?}"))?;

    if !tree.skipped.is_empty() {
        bail!("{} path(s) could not be archived", tree.skipped.len());
    }
    Ok(())
}

fn list(archive: &Path, selectors: &[OsString], strict: bool, verbose: bool) -> Result<()> {
    let file = File::open(archive).with_context(|| format!("Failed to open {archive:?}"))?;
    let scanner = ArchiveScanner::new(BufReader::new(file), ScanOptions::from_strict(strict));
    let selection = Selection::new(selectors.iter().map(|s| s.as_bytes()));
    let mut stdout = io::stdout().lock();

    for entry in selection.filter(scanner) {
        let entry = entry.with_context(|| format!("Failed to read {archive:?}"))?;
        if verbose {
            writeln!(stdout, "{}", listing::long_line(&entry))?;
        } else {
            writeln!(stdout, "{}", entry.path_lossy())?;
        }
    }
    Ok(())
}
