//! Seriatim Text Reuse Detection Pipeline
//!
//! Detects passages copied between documents of a JSON-lines or SQLite corpus.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod align;
mod compare;
mod db;
mod decode;
mod extract;
mod filter;
mod models;
mod output;
mod window;

use db::{corpus_stats, load_corpus, CorpusFields};
use models::{MatchGroup, PairFilter, ReuseParams, Side, SourceMatch};
use output::{
    print_corpus_stats, print_records, print_summary, write_csv_file, write_json_file,
    write_jsonl_file,
};

#[derive(Parser)]
#[command(name = "seriatim")]
#[command(about = "Text reuse detection across document collections")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Output format for reuse records
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// Single JSON document with parameters and summary
    Json,
    /// One record per line
    Jsonl,
    /// CSV file
    Csv,
}

/// Which ordered document pairs are compared (mirrors models::PairFilter)
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliPairFilter {
    /// Source id hash below target id hash (default)
    SourceBeforeTarget,
    /// Source id hash above target id hash
    TargetBeforeSource,
    /// Every ordered pair of distinct documents
    All,
}

impl From<CliPairFilter> for PairFilter {
    fn from(filter: CliPairFilter) -> Self {
        match filter {
            CliPairFilter::SourceBeforeTarget => PairFilter::SourceBeforeTarget,
            CliPairFilter::TargetBeforeSource => PairFilter::TargetBeforeSource,
            CliPairFilter::All => PairFilter::AllPairs,
        }
    }
}

/// Where documents come from.
#[derive(Args)]
struct InputArgs {
    /// Corpus path (.jsonl, or .db/.sqlite/.sqlite3 for SQLite)
    input: PathBuf,

    /// Field holding the document id
    #[arg(long, default_value = "id")]
    id: String,

    /// Field holding the document text
    #[arg(long, default_value = "text")]
    text: String,

    /// Extra fields copied into each record
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// SQLite table to read
    #[arg(long, default_value = "documents")]
    table: String,
}

impl InputArgs {
    fn corpus_fields(&self) -> CorpusFields {
        CorpusFields {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.fields.clone(),
            table: self.table.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect reused passages across a corpus
    ///
    /// Parameters default to ReuseParams::default(); any option given
    /// explicitly overrides the default.
    Align {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// N-gram order in characters [default: 20]
        #[arg(short = 'n', long)]
        ngram_size: Option<usize>,

        /// Minimum document frequency of a feature [default: 2]
        #[arg(long)]
        min_df: Option<usize>,

        /// Maximum document frequency of a feature [default: 100]
        #[arg(long)]
        max_df: Option<usize>,

        /// Minimum shared features per document pair [default: 5]
        #[arg(short = 'm', long)]
        min_match: Option<usize>,

        /// Maximum gap between matches continuing a span [default: 600]
        #[arg(short = 'g', long = "gap")]
        max_gap: Option<usize>,

        /// Minimum span length in target characters [default: 50]
        #[arg(short = 'a', long)]
        min_align: Option<usize>,

        /// Context window radius for boundary alignment [default: 200]
        #[arg(long)]
        context_gap: Option<usize>,

        /// Start n-grams at every character instead of word starts
        #[arg(long)]
        floating_ngrams: bool,

        /// Document pair ordering [default: source-before-target]
        #[arg(long, value_enum)]
        pair_filter: Option<CliPairFilter>,

        /// Suppress progress output
        #[arg(long)]
        quiet: bool,

        /// Print first N records to console
        #[arg(long)]
        show_records: Option<usize>,
    },

    /// Show corpus statistics
    Stats {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Benchmark decoding and boundary alignment
    Benchmark {
        /// Number of iterations
        #[arg(long, default_value = "100")]
        iterations: usize,

        /// Context length in characters
        #[arg(long, default_value = "200")]
        size: usize,
    },
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Align {
            input,
            output,
            format,
            ngram_size,
            min_df,
            max_df,
            min_match,
            max_gap,
            min_align,
            context_gap,
            floating_ngrams,
            pair_filter,
            quiet,
            show_records,
        } => {
            init_logging(quiet);

            let defaults = ReuseParams::default();
            let params = ReuseParams {
                ngram_size: ngram_size.unwrap_or(defaults.ngram_size),
                min_df: min_df.unwrap_or(defaults.min_df),
                max_df: max_df.unwrap_or(defaults.max_df),
                min_match: min_match.unwrap_or(defaults.min_match),
                max_gap: max_gap.unwrap_or(defaults.max_gap),
                min_align: min_align.unwrap_or(defaults.min_align),
                floating_ngrams,
                context_gap: context_gap.unwrap_or(defaults.context_gap),
                pair_filter: pair_filter.map(PairFilter::from).unwrap_or(defaults.pair_filter),
            };
            params.validate()?;

            let documents = load_corpus(&input.input, &input.corpus_fields())?;
            let result = compare::detect_reuse(&documents, &params, !quiet)?;

            match format {
                OutputFormat::Json => write_json_file(&result, &output)?,
                OutputFormat::Jsonl => write_jsonl_file(&result.records, &output)?,
                OutputFormat::Csv => write_csv_file(&result.records, &output)?,
            }
            info!(path = %output.display(), records = result.records.len(), "wrote output");

            if !quiet {
                print_summary(&result);
            }

            if let Some(limit) = show_records {
                println!("\n=== Sample Records ===");
                print_records(&result.records, Some(limit));
            }
        }

        Commands::Stats { input } => {
            init_logging(false);
            let documents = load_corpus(&input.input, &input.corpus_fields())?;
            print_corpus_stats(&corpus_stats(&documents));
        }

        Commands::Benchmark { iterations, size } => {
            run_benchmark(iterations, size);
        }
    }

    Ok(())
}

/// Deterministic filler text: pseudo-random lowercase words.
fn synthetic_text(len: usize, seed: u64) -> String {
    let mut state = seed;
    let mut text = String::with_capacity(len);
    while text.len() < len {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        if (state >> 60) < 3 {
            text.push(' ');
        } else {
            text.push((b'a' + ((state >> 33) % 26) as u8) as char);
        }
    }
    text
}

fn report(label: &str, elapsed: std::time::Duration, iterations: usize) {
    let per_run = elapsed.as_secs_f64() / iterations.max(1) as f64;
    println!("\n{}:", label);
    println!("  Total time: {:.3}s", elapsed.as_secs_f64());
    println!("  Per run: {:.3}ms", per_run * 1000.0);
    println!("  Runs/sec: {:.0}", 1.0 / per_run);
}

/// Run decoder and aligner benchmarks to measure performance.
fn run_benchmark(iterations: usize, size: usize) {
    use std::time::Instant;

    println!("=== Reuse Benchmark ===");
    println!("Iterations: {}", iterations);
    println!("Context size: {}", size);

    let shared = synthetic_text(size, 7);
    let noise = synthetic_text(size, 11);

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = align::align_edge(&shared, &shared, Side::Right);
    }
    report("Identical contexts", start.elapsed(), iterations);

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = align::align_edge(&shared, &noise, Side::Right);
    }
    report("Unrelated contexts", start.elapsed(), iterations);

    // One source matched every 6 characters across the whole target
    let params = ReuseParams::default();
    let groups: Vec<MatchGroup> = (0..size * 10)
        .map(|i| MatchGroup {
            target_pos: 30 + i * 6,
            matches: vec![SourceMatch {
                source_id: models::DocId(1),
                source_pos: 1030 + i * 6,
            }],
        })
        .collect();

    let start = Instant::now();
    for _ in 0..iterations {
        let _ = decode::decode_sources(&groups, &params);
    }
    report("Decoding", start.elapsed(), iterations);
}
