use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use honeyscoop::config::{parse_file_types, OutputConfig, ScoopConfig};
use honeyscoop::{
    carve_with_layout, pair_matches_with_stats, search_phase, ChunkSource, DiskReader, FileType, OutputLayout,
    DEFAULT_CHUNK_SIZE,
};

const REPORT_FILE: &str = "report.json";

#[derive(Parser)]
#[command(name = "honeyscoop")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Carve files out of raw disk images by signature")]
struct Cli {
    /// Disk image or raw device to scan
    #[arg(short, long)]
    input: PathBuf,

    /// Root directory for carved files
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Comma-separated file types to carve (default: all)
    #[arg(short = 'c', long = "types")]
    types: Option<String>,

    /// Write every file straight into the output root
    #[arg(short = 'O', long)]
    no_organise: bool,

    /// Nest output under a directory named after the start time
    #[arg(short = 'T', long)]
    timestamp: bool,

    /// Also write files no validator recognised
    #[arg(short = 'u', long)]
    unrecognised_output: bool,

    /// Worker threads for the search phase
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Write a JSON report next to the carved files
    #[arg(long)]
    report: bool,

    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn into_config(self) -> ScoopConfig {
        let file_types = match self.types.as_deref() {
            Some(list) => parse_file_types(list),
            None => FileType::ALL.to_vec(),
        };

        ScoopConfig {
            input: self.input,
            output: OutputConfig {
                root: self.output,
                organise: !self.no_organise,
                timestamp: self.timestamp,
                unrecognised_output: self.unrecognised_output,
            },
            chunk_size: self.chunk_size,
            file_types,
            threads: self.threads,
            write_report: self.report,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let config = cli.into_config();
    config.validate()?;
    if config.file_types.is_empty() {
        bail!("No supported file types selected");
    }

    if let Some(threads) = config.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    run(&config)
}

fn run(config: &ScoopConfig) -> Result<()> {
    print_banner();

    let mut reader = DiskReader::open(&config.input)
        .with_context(|| format!("Failed to open input: {:?}", config.input))?;
    let size = reader.size();

    println!();
    println!("Input:  {:?} ({} bytes)", config.input, size);
    println!(
        "Types:  {}",
        config
            .file_types
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    let pb = ProgressBar::new(size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("=>-"),
    );
    let progress = |done: u64, _total: u64| pb.set_position(done);

    let matches = search_phase(&mut reader, config.chunk_size, &config.file_types, Some(&progress))
        .context("Search failed")?;
    pb.finish_with_message(format!(
        "Search complete! Found {} signatures",
        style(matches.len()).green().bold()
    ));

    let (pairs, pairing) = pair_matches_with_stats(&matches, config.chunk_size);
    println!();
    println!("Candidates:         {}", style(pairs.len()).green().bold());
    println!("Unterminated:       {}", pairing.unterminated);
    println!("Superseded headers: {}", pairing.superseded + pairing.out_of_window);
    println!("Orphan footers:     {}", pairing.orphan_footers);
    println!();

    if pairs.is_empty() {
        println!("[!] No carve candidates found.");
        return Ok(());
    }

    let layout = OutputLayout::new(&config.output);
    println!("Carving {} candidates to {:?}...", pairs.len(), layout.base());

    let report = carve_with_layout(&mut reader, config.chunk_size, &pairs, &config.output, &layout)
        .context("Carving failed")?;
    let stats = report.stats();

    println!();
    println!("{}", style("Carving Complete!").green().bold());
    println!();
    println!("Files written:  {}", style(stats.total_files()).green());
    println!("Correct:        {}", stats.correct);
    println!("Partial:        {}", stats.partial);
    println!("Format error:   {}", stats.format_error);
    println!("Corrupted:      {}", stats.corrupted);
    if stats.unrecognised > 0 {
        println!("Unrecognised:   {}", stats.unrecognised);
    }
    if stats.skipped > 0 {
        println!("Skipped:        {}", style(stats.skipped).yellow());
    }
    if stats.failed > 0 {
        println!("Failed:         {}", style(stats.failed).yellow());
    }
    for (file_type, count) in &stats.per_type {
        println!("  {:<6} {}", file_type, count);
    }

    if config.write_report {
        fs::create_dir_all(layout.base())
            .with_context(|| format!("Failed to create {:?}", layout.base()))?;
        let path = layout.base().join(REPORT_FILE);
        report
            .write_json(&path)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        println!("Report:         {:?}", path);
    }
    println!("Output folder:  {:?}", layout.base());
    println!();

    Ok(())
}

fn print_banner() {
    println!();
    println!("{}", style("HoneyScoop - File Carver").cyan().bold());
}
