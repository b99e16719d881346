use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

mod alias;
mod auth;
mod cmd;
mod config;
mod error;
mod orchestrator;
mod rundeck;
mod utils;

use cmd::format::StyleOptions;
use cmd::{Console, ConsoleResponder, Handler, HandlerSettings};
use config::{Config, Overrides};
use rundeck::{HttpTransport, RundeckClient};

/// rundeck-chat - drive a Rundeck server with chat commands
///
/// Commands are read one per line from stdin (or given with -e) and replies
/// are printed to stdout. Logs go to stderr.
///
/// Global flags / env:
///   -v / -vv        Increase verbosity
///   -q / --quiet    Errors only
///   -c / --config   YAML configuration file
///   RUNDECK_URL, RUNDECK_TOKEN, RUNDECK_API_DEBUG override the file
///
/// Examples:
///   rundeck-chat -c rundeck.yml -e "projects"
///   rundeck-chat --url https://rundeck.example --token $TOKEN -e "run deploy --report 5"
///   echo "executions 2" | rundeck-chat -c rundeck.yml
#[derive(Parser, Debug)]
#[command(
    name = "rundeck-chat",
    version,
    author,
    about = "Chat-style command console for the Rundeck job scheduler",
    propagate_version = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Rundeck base URL
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// API token
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,

    /// Chat user the commands run as
    #[arg(long, value_name = "NAME", default_value = "Shell User")]
    user: String,

    /// Command to run instead of reading stdin (repeatable)
    #[arg(short, long = "execute", value_name = "COMMAND")]
    execute: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    let overrides = Overrides {
        url: cli.url.clone(),
        token: cli.token.clone(),
    };
    let cfg = Config::load(cli.config.as_deref(), &overrides)?;
    let server = cfg.validate()?;
    tracing::info!(server = %server, user = %cli.user, "starting");

    let transport = HttpTransport::new(
        server.base().clone(),
        cfg.token.clone(),
        cfg.request_timeout(),
        cfg.api_debug,
    )
    .context("Failed to build HTTP client")?;
    let handler = Handler::new(
        RundeckClient::new(transport, server.api_version()),
        server,
        Box::new(cfg.authorizer()),
        HandlerSettings {
            group: cfg.group.clone(),
            robot_name: cfg.robot_name.clone(),
            poll: cfg.poll_settings(),
        },
    );

    let mut console = Console::new(handler, cli.user)?;
    let mut out = ConsoleResponder::new(std::io::stdout());

    if !cli.execute.is_empty() {
        for line in &cli.execute {
            console.execute(line, &mut out);
        }
        return Ok(());
    }

    let stdin = std::io::stdin();
    let prompt = stdin.is_terminal().then(StyleOptions::detect);
    console.run_lines(stdin.lock(), &mut out, prompt.as_ref())?;
    Ok(())
}
