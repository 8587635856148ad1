//! Coin Raffle
//!
//! Reads every post of a raffle chain from factomd, judges one entry per
//! forum user and prints the salted sort hash of each entry.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use coin_raffle::{
    FactomdClient, LedgerSource, RaffleConfig, RaffleResult, RaffleRun, RawConfig, RunMetadata,
    parse_records, report, types,
};
use tracing::{error, info, warn};

const USAGE: &str = "coin-raffle -s SALT -c CHAIN_ID [-H HOST]";

#[derive(Parser)]
#[command(name = "coin-raffle", version, about = "Verifiable raffle over a Factom chain")]
struct Args {
    /// Chain id holding the raffle posts
    #[arg(short, long, env = "RAFFLE_CHAIN_ID")]
    chain_id: Option<String>,

    /// Salt to hash with each entry hash. Must be hex.
    #[arg(short, long, env = "RAFFLE_SALT")]
    salt: Option<String>,

    /// factomd host
    #[arg(short = 'H', long, env = "FACTOMD_HOST")]
    host: Option<String>,

    /// factomd request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Duplicate detection key: content, content-and-title
    #[arg(long)]
    duplicate_key: Option<String>,

    /// Write a CSV report here
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Blank the scores of invalid entries in the CSV
    #[arg(long)]
    compact: bool,

    /// With --compact, keep entry hashes of invalid entries
    #[arg(long)]
    show_invalid_identity: bool,

    /// Write a JSON audit file here
    #[arg(long)]
    json: Option<PathBuf>,
}

impl From<Args> for RawConfig {
    fn from(args: Args) -> Self {
        RawConfig {
            chain_id: args.chain_id,
            salt: args.salt,
            host: args.host,
            timeout_secs: args.timeout_secs,
            duplicate_key: args.duplicate_key,
            csv: args.csv,
            compact: args.compact,
            show_invalid_identity: args.show_invalid_identity,
            json: args.json,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coin_raffle=info".parse().expect("static directive")),
        )
        .init();

    let config = match RaffleConfig::new(Args::parse().into()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{USAGE}");
            error!("{}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: RaffleConfig) -> RaffleResult<()> {
    info!("Fetching chain {} from {}", config.chain_id, config.factomd.host);

    let client = FactomdClient::new(&config.factomd)?;
    let records = client.fetch_records(&config.chain_id).await?;
    let posts = parse_records(&records)?;

    let meta = RunMetadata {
        chain_id: config.chain_id,
        salt: config.salt.clone(),
        run_at: types::now(),
        duplicate_key: config.duplicate_key,
    };
    let run = RaffleRun::assemble(&meta, &posts)?;

    let findings = run.audit();
    if findings.is_empty() {
        info!("Audit passed for {} entries", run.entries.len());
    } else {
        for finding in &findings {
            warn!("Audit: {}", finding);
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    report::write_console(&run, &mut out)?;
    out.flush()?;

    if let Some(path) = &config.output.csv {
        report::export_csv(&run, &config.output.report, path)?;
    }
    if let Some(path) = &config.output.json {
        report::export_json(&run, path)?;
    }

    Ok(())
}
