//! CLI front end for the streaming k-mer matcher: `match` streams
//! reads against a loaded FM-index/kLCP pair, `index` builds the kLCP
//! bitvector for a fixed `k` against an already-built FM-index.
//!
//! Argument parsing follows spec.md §6; error reporting follows the
//! `anyhow`-at-the-binary-boundary / typed-errors-in-the-library split
//! this crate's CLI ancestors use.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use kmatch::driver::{Driver, DriverConfig};
use kmatch::index::IndexImage;
use kmatch::klcp::Klcp;
use kmatch::klcp_builder::build_klcp_from_index;
use kmatch::reader::{MateFilter, TextReadSource, DEFAULT_BATCH_SIZE};

#[derive(Parser, Debug)]
#[command(
    name = "kmatch",
    version,
    about = "Streaming k-mer matcher over a compressed reference index",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream reads against a loaded index, emitting per-window reference hits.
    Match(MatchArgs),
    /// Build the kLCP bitvector for a fixed k against an existing FM-index.
    Index(IndexArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InputFormat {
    /// FASTA/FASTQ text records.
    Text,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mate {
    Single,
    First,
    Second,
}

impl From<Mate> for MateFilter {
    fn from(m: Mate) -> Self {
        match m {
            Mate::Single => MateFilter::SingleEnd,
            Mate::First => MateFilter::FirstOfPair,
            Mate::Second => MateFilter::SecondOfPair,
        }
    }
}

#[derive(Parser, Debug)]
struct MatchArgs {
    /// Prefix of the FM-index files (`<prefix>.fmidx`, and
    /// `<prefix>.<k>.bit.klcp` when `-u` is given).
    index_prefix: PathBuf,

    /// Path to the read file.
    reads_file: PathBuf,

    /// k-mer length. Required when `-u` (rolling via kLCP) is set.
    #[arg(short = 'k', long = "kmer-length")]
    k: Option<usize>,

    /// Enable kLCP-based rolling extension.
    #[arg(short = 'u', long = "rolling")]
    rolling: bool,

    /// Emit the resolved reference-id set per window.
    #[arg(short = 'v', long = "ref-sets")]
    ref_sets: bool,

    /// Enable the skip-after-fail heuristic.
    #[arg(short = 's', long = "skip-after-fail")]
    skip_after_fail: bool,

    /// Redirect stdout to this file instead.
    #[arg(short = 'f', long = "output")]
    output: Option<PathBuf>,

    /// Input record format.
    #[arg(long = "format", value_enum, default_value_t = InputFormat::Text)]
    format: InputFormat,

    /// Which mate(s) of a paired-end run to accept.
    #[arg(long = "mate", value_enum, default_value_t = Mate::Single)]
    mate: Mate,

    /// Batch size pulled from the reader at a time.
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Suppress the `#<bases>` header line printed before each read's windows.
    #[arg(long = "no-header")]
    no_header: bool,
}

#[derive(Parser, Debug)]
struct IndexArgs {
    /// Prefix of the FM-index files to build a kLCP bitvector against.
    index_prefix: PathBuf,

    /// k-mer length to build the kLCP bitvector for.
    #[arg(short = 'k', long = "kmer-length")]
    k: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Match(args) => run_match(args),
        Commands::Index(args) => run_index(args),
    }
}

fn run_match(args: MatchArgs) -> Result<()> {
    let InputFormat::Text = args.format;
    let _mate: MateFilter = args.mate.into();

    if args.rolling && args.k.is_none() {
        anyhow::bail!("-k is required when -u (rolling) is enabled");
    }

    let index = IndexImage::load(&args.index_prefix)
        .with_context(|| format!("loading FM-index at prefix `{}`", args.index_prefix.display()))?;

    let k_len = args.k.unwrap_or(0);
    let klcp = if args.rolling {
        let klcp_path = klcp_path(&args.index_prefix, k_len);
        Some(
            Klcp::load(&klcp_path, k_len, index.len() as u64)
                .with_context(|| format!("loading kLCP file `{}`", klcp_path.display()))?,
        )
    } else {
        None
    };

    if k_len == 0 {
        anyhow::bail!("-k is required for streaming match");
    }

    let config = DriverConfig {
        k_len,
        emit_ref_sets: args.ref_sets,
        skip_after_fail: args.skip_after_fail,
        batch_size: args.batch_size,
        print_header: !args.no_header,
    };

    let reads_file = File::open(&args.reads_file)
        .with_context(|| format!("opening reads file `{}`", args.reads_file.display()))?;
    let mut source = TextReadSource::new(reads_file);

    let mut driver = Driver::new(&index, klcp.as_ref(), config);

    let stats = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating output file `{}`", path.display()))?;
            let mut out = BufWriter::new(file);
            let stats = driver.run(&mut source, &mut out, || false)?;
            out.flush().context("flushing output file")?;
            stats
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let stats = driver.run(&mut source, &mut out, || false)?;
            out.flush().context("flushing stdout")?;
            stats
        }
    };

    tracing::info!(
        reads = stats.reads_processed,
        windows = stats.windows_emitted,
        malformed = stats.malformed_skipped,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "match complete"
    );
    Ok(())
}

fn run_index(args: IndexArgs) -> Result<()> {
    let index = IndexImage::load(&args.index_prefix)
        .with_context(|| format!("loading FM-index at prefix `{}`", args.index_prefix.display()))?;

    let klcp = build_klcp_from_index(&index, args.k);
    let path = klcp_path(&args.index_prefix, args.k);
    klcp.save(&path)
        .with_context(|| format!("writing kLCP file `{}`", path.display()))?;

    tracing::info!(
        k = args.k,
        l_total = klcp.l_total(),
        path = %path.display(),
        "kLCP bitvector built"
    );
    Ok(())
}

fn klcp_path(prefix: &PathBuf, k: usize) -> PathBuf {
    let mut s = prefix.as_os_str().to_owned();
    s.push(format!(".{k}.bit.klcp"));
    PathBuf::from(s)
}
