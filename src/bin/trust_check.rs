use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use steam_trust::{AppState, Config, ScoreOptions, TrustError};

#[derive(Parser, Debug)]
#[command(
    name = "trust-check",
    version,
    about = "Score a Steam account from a SteamID64, profile URL or vanity name"
)]
struct Args {
    /// SteamID64, profile URL, steam:// link or vanity name
    input: String,

    /// Steam Web API key (defaults to STEAM_API_KEY)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Shared upstream timeout in seconds
    #[arg(short, long)]
    timeout_secs: Option<u64>,

    /// Print the full result as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Apply the suspicious-emptiness penalty
    #[arg(long)]
    suspicious_empty: bool,
}

fn setup_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,trust_check=info"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing();

    let mut config = Config::from_env();
    if let Some(key) = args.api_key {
        config.steam_api_key = Some(key);
    }
    if let Some(secs) = args.timeout_secs {
        config.api_timeout = Duration::from_secs(secs);
    }

    let state = AppState::with_http_api(config).context("failed to build Steam API client")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("invalid spinner template")?,
    );
    spinner.set_message(format!("Checking {}", args.input));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let options = ScoreOptions {
        suspicious_empty: args.suspicious_empty,
    };
    let result = state.trust_checker.check("cli", &args.input, &options).await;
    spinner.finish_and_clear();

    let report = match result {
        Ok(report) => report,
        Err(TrustError::RateLimited { retry_after_secs }) => {
            bail!("rate limited, retry after {retry_after_secs}s")
        }
        Err(TrustError::NotFound(msg)) => {
            bail!("could not resolve a Steam account: {msg}")
        }
        Err(e) => return Err(e).context("trust check failed"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.report);
    }

    Ok(())
}
