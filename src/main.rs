use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::Read;
use std::path::PathBuf;

use claimcheck::progress::TransportKind;
use claimcheck::request::VerificationRequest;

mod cmd;

#[derive(Parser)]
#[command(name = "claimcheck")]
#[command(version, about = "Verify factual claims and track the verification to completion")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Base URL of the verification service. Overrides CLAIMCHECK_API_URL and claimcheck.toml.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Progress transport: poll or stream
    #[arg(long, global = true)]
    pub transport: Option<TransportKind>,

    /// Print the result as JSON instead of a styled report
    #[arg(long, global = true)]
    pub json: bool,

    /// Log output format (logs go to stderr)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Verify a block of text ("-" reads stdin)
    Text { text: String },
    /// Fetch a web page and verify its content
    Url { url: String },
    /// Upload a document (.pdf, .docx, .doc) and verify it
    File { path: PathBuf },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default claimcheck.toml file
    Init,
}

fn init_tracing(verbose: bool, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose { "claimcheck=debug" } else { "claimcheck=warn" };
    let filter = EnvFilter::try_from_env("CLAIMCHECK_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    // Ignore double-init; only the first subscriber wins.
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };
}

fn read_text_arg(text: &str) -> Result<String> {
    if text != "-" {
        return Ok(text.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read text from stdin")?;
    Ok(buf)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Text { text } => {
            let request = VerificationRequest::text(read_text_arg(text)?);
            cmd::cmd_verify(&cli, project_dir, request).await?;
        }
        Commands::Url { url } => {
            cmd::cmd_verify(&cli, project_dir, VerificationRequest::url(url.clone())).await?;
        }
        Commands::File { path } => {
            let request = VerificationRequest::from_path(path)?;
            cmd::cmd_verify(&cli, project_dir, request).await?;
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, &cli, command.clone())?,
    }

    Ok(())
}
