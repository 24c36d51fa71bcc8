use aupair_rs::{AuPair, AuPairConfig, RemovedTriggers};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};

#[derive(Debug, Parser)]
#[command(version, about = "Merge dictionary phrases of a prefix-free parse")]
struct Cli {
    /// Prefix of the `.dict` and `.parse` input files.
    #[arg(short, long)]
    input: PathBuf,

    /// File to write removed trigger strings to. Defaults to `<input>.deleted_ts`.
    #[arg(short, long)]
    out_file: Option<PathBuf>,

    /// Window length used to build the parse.
    #[arg(short, long)]
    window: usize,

    /// Minimum cost of a removed trigger string, 0 for window - 1.
    #[arg(short, long, default_value_t = 0)]
    threshold: i64,

    /// Also write the compressed dictionary.
    #[arg(short = 'c', long)]
    compression: bool,

    /// Skip the pass removing trigger strings that always join the same phrases.
    #[arg(long)]
    skip_simple: bool,

    /// Log every removed trigger string.
    #[arg(short, long)]
    verbose: bool,
}

fn run(cli: Cli) -> aupair_rs::Result<()> {
    let config = AuPairConfig::new(&cli.input, cli.window)?
        .with_threshold(cli.threshold)
        .with_compress_dictionary(cli.compression)
        .with_simple_pass(!cli.skip_simple);
    let out_file = cli
        .out_file
        .unwrap_or_else(|| config.default_removed_path());

    let mut au_pair = AuPair::new(config);
    let mut removed = RemovedTriggers::new();
    let bytes_removed = au_pair.run(&mut removed)?;
    au_pair.write_removed_triggers(&out_file, &removed)?;

    let stats = au_pair.stats();
    info!(
        removed = removed.len(),
        bytes_removed,
        phrases = stats.alive_phrases,
        parse_length = stats.live_parse_length,
        bytes_written = stats.bytes_written,
        "Done"
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(fatal = e.is_fatal(), "{}", e);
            ExitCode::FAILURE
        }
    }
}
