mod client;
mod config;
mod render;
mod route;
mod table;

use crate::client::ApiClient;
use crate::config::{Scope, load_scope, save};
use crate::render::{Painter, render_json};
use crate::route::{BARE, Family, Render, Route};
use crate::table::View;
use anyhow::{Context, Result, anyhow};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use std::io::{IsTerminal, Write};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "ELASTIC_LOG";

#[derive(Parser)]
#[command(
    name = "elastic",
    version,
    about = "A command line tool to query the Elasticsearch REST API"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "URL",
        env = "ELASTIC_BASEURL",
        help = "Base API URL (defaults to http://localhost:9200/)"
    )]
    baseurl: Option<String>,

    #[arg(long, global = true, help = "Trace URLs called")]
    trace: bool,

    #[arg(
        long,
        value_enum,
        default_value_t = ColorChoice::Auto,
        global = true,
        help = "When to colour output"
    )]
    color: ColorChoice,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get cluster information
    #[command(subcommand, visible_alias = "c")]
    Cluster(ClusterCommand),
    /// Get index information
    #[command(subcommand, visible_alias = "i")]
    Index(IndexCommand),
    /// Get cluster nodes information
    #[command(subcommand, visible_alias = "n")]
    Node(NodeCommand),
    /// Perform any ES API GET query
    #[command(visible_alias = "q")]
    Query {
        #[arg(value_name = "PATH", help = "API path appended to the base URL")]
        path: Option<String>,
    },
    /// Get statistics
    #[command(subcommand, visible_alias = "s")]
    Stats(StatsCommand),
    /// Persist --baseurl and --trace defaults to the chosen scope
    Configure {
        #[arg(
            long,
            value_enum,
            default_value_t = ScopeArg::User,
            help = "Where to write the config (local project dir or user config dir)"
        )]
        scope: ScopeArg,
        #[arg(long, help = "Store tracing as disabled")]
        no_trace: bool,
    },
    /// Show the merged configuration
    ConfigShow,
    /// Generate shell completion scripts
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
enum ClusterCommand {
    /// Get cluster health
    #[command(visible_alias = "he")]
    Health,
    /// Get cluster state (allows filter args)
    #[command(visible_alias = "s")]
    State {
        #[arg(value_name = "FILTER")]
        filters: Vec<String>,
    },
    /// Get cluster stats
    #[command(visible_alias = "t")]
    Stats,
}

#[derive(Subcommand)]
enum IndexCommand {
    /// Get index documents count
    #[command(visible_alias = "dc")]
    DocsCount,
    /// List all indexes
    #[command(visible_alias = "l")]
    List,
    /// Get index size
    #[command(visible_alias = "si")]
    Size,
    /// Get index status
    #[command(visible_alias = "st")]
    Status,
    /// List indexes information with many stats
    #[command(visible_alias = "v")]
    Verbose,
}

#[derive(Subcommand)]
enum NodeCommand {
    /// List nodes information
    #[command(visible_alias = "l")]
    List,
    /// List node stats (allows filter args)
    #[command(visible_alias = "s")]
    Stats {
        #[arg(value_name = "FILTER")]
        filters: Vec<String>,
    },
}

#[derive(Subcommand)]
enum StatsCommand {
    /// Get index sizes
    #[command(visible_alias = "s")]
    Size,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScopeArg {
    Local,
    User,
}

impl From<ScopeArg> for Scope {
    fn from(value: ScopeArg) -> Self {
        match value {
            ScopeArg::Local => Scope::Local,
            ScopeArg::User => Scope::User,
        }
    }
}

/// The route-table key and positional arguments of an API command.
#[derive(Debug, PartialEq, Eq)]
struct Target {
    family: Family,
    subcommand: &'static str,
    args: Vec<String>,
}

impl Target {
    fn new(family: Family, subcommand: &'static str) -> Self {
        Self {
            family,
            subcommand,
            args: Vec::new(),
        }
    }

    fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl Commands {
    /// Returns `None` for commands that do not call the API.
    fn into_target(self) -> Option<Target> {
        let target = match self {
            Commands::Cluster(cmd) => match cmd {
                ClusterCommand::Health => Target::new(Family::Cluster, "health"),
                ClusterCommand::State { filters } => {
                    Target::new(Family::Cluster, "state").with_args(filters)
                }
                ClusterCommand::Stats => Target::new(Family::Cluster, "stats"),
            },
            Commands::Index(cmd) => match cmd {
                IndexCommand::DocsCount => Target::new(Family::Index, "docs-count"),
                IndexCommand::List => Target::new(Family::Index, "list"),
                IndexCommand::Size => Target::new(Family::Index, "size"),
                IndexCommand::Status => Target::new(Family::Index, "status"),
                IndexCommand::Verbose => Target::new(Family::Index, "verbose"),
            },
            Commands::Node(cmd) => match cmd {
                NodeCommand::List => Target::new(Family::Node, "list"),
                NodeCommand::Stats { filters } => {
                    Target::new(Family::Node, "stats").with_args(filters)
                }
            },
            Commands::Query { path } => {
                Target::new(Family::Query, BARE).with_args(path.into_iter().collect())
            }
            Commands::Stats(StatsCommand::Size) => Target::new(Family::Stats, "size"),
            Commands::Configure { .. } | Commands::ConfigShow | Commands::Completion { .. } => {
                return None;
            }
        };
        Some(target)
    }
}

fn main() -> Result<()> {
    init_tracing();

    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit());
    route::validate(&Cli::command()).context("validating command routes")?;
    let cwd = std::env::current_dir().context("reading current directory")?;

    match cli.command {
        Commands::Configure { scope, no_trace } => {
            let mut existing = load_scope(scope.into(), &cwd)?;
            if cli.trace && no_trace {
                return Err(anyhow!("Use only one of --trace or --no-trace"));
            }
            let baseurl = baseurl_from_command_line(&matches, cli.baseurl);
            if baseurl.is_none() && !cli.trace && !no_trace {
                return Err(anyhow!(
                    "Nothing to configure; pass --baseurl, --trace or --no-trace"
                ));
            }
            if let Some(url) = baseurl {
                existing.baseurl = Some(url);
            }
            if cli.trace {
                existing.trace = Some(true);
            } else if no_trace {
                existing.trace = Some(false);
            }

            let path = save(scope.into(), &existing, &cwd)?;
            println!("Saved configuration to {}", path.display());
        }
        Commands::ConfigShow => {
            let merged = config::load(&cwd)?;
            println!("{}", serde_json::to_string_pretty(&merged)?);
        }
        Commands::Completion { shell } => {
            use clap_complete::{generate, shells};
            let mut cmd = Cli::command();
            let bin = cmd.get_name().to_string();
            match shell {
                CompletionShell::Bash => {
                    generate(shells::Bash, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::Zsh => {
                    generate(shells::Zsh, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::Fish => {
                    generate(shells::Fish, &mut cmd, bin, &mut std::io::stdout())
                }
                CompletionShell::PowerShell => {
                    generate(shells::PowerShell, &mut cmd, bin, &mut std::io::stdout())
                }
            }
        }
        command => {
            let target = command
                .into_target()
                .context("command does not map to an API route")?;
            let settings = config::resolve(&cwd, cli.baseurl, cli.trace)?;

            let coloured = cli.color.enabled();
            colored::control::set_override(coloured);
            let painter = Painter::new(coloured);

            let client = ApiClient::new(settings.trace)?;
            let route = route::build(
                &settings.base_url,
                target.family,
                target.subcommand,
                &target.args,
            );
            let output = render_route(&client, &route, &painter)?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&output).context("writing output")?;
            stdout.flush().context("writing output")?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

/// `configure` only stores a base URL typed on the command line, never one
/// inherited from `ELASTIC_BASEURL`.
fn baseurl_from_command_line(matches: &ArgMatches, baseurl: Option<String>) -> Option<String> {
    (matches.value_source("baseurl") == Some(ValueSource::CommandLine))
        .then_some(baseurl)
        .flatten()
}

/// Fetches `route` and renders it into the bytes written to stdout.
///
/// Raw and verbose bodies pass through byte for byte; only the column views
/// decode the body as text.
fn render_route(client: &ApiClient, route: &Route, painter: &Painter) -> Result<Vec<u8>> {
    let mut out = match route.render {
        Render::Json => render_json(&client.get_json(&route.url)?, painter).into_bytes(),
        Render::Raw | Render::Table(View::Verbose) => client.get_raw(&route.url)?,
        Render::Table(view) => {
            let body = client.get_raw(&route.url)?;
            let mut lines = String::new();
            for line in view.apply(&String::from_utf8_lossy(&body), painter) {
                lines.push_str(&line);
                lines.push('\n');
            }
            return Ok(lines.into_bytes());
        }
    };
    out.push(b'\n');
    Ok(out)
}
