use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use verso_decoder::SearchAlgorithm;

mod commands;
mod logger;
mod utils;

#[derive(Parser)]
#[command(name = "verso-cmd")]
#[command(about = "Command-line utility for phrase-based decoding")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode tokenized sentences, one per line
    Decode(DecodeArgs),

    /// Validate a decoder configuration file and print it with defaults filled in
    CheckConfig {
        /// Path to the JSON configuration
        config: String,
    },
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct DecodeArgs {
    /// Phrase table in "source ||| target ||| p1 p2 ..." format
    #[arg(short, long)]
    pub phrase_table: String,

    /// JSON decoder configuration (search parameters, weights, threads)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Input file (defaults to stdin)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Print up to N translations per sentence in n-best list format
    #[arg(long)]
    pub nbest: Option<usize>,

    /// Only keep n-best entries with distinct target text
    #[arg(long)]
    pub distinct: bool,

    /// Overrides the search algorithm from the configuration
    #[arg(long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Forbid reordering across punctuation
    #[arg(long)]
    pub walls: bool,

    /// Print one JSON object per sentence
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmArg {
    Normal,
    CubePruning,
}

impl From<AlgorithmArg> for SearchAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Normal => SearchAlgorithm::Normal,
            AlgorithmArg::CubePruning => SearchAlgorithm::CubePruning,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose)?;

    match cli.command {
        Commands::Decode(args) => commands::decode::run(args),
        Commands::CheckConfig { config } => commands::check_config::run(config),
    }
}
