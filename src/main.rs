//! gitter - command-line front end for the git access layer
//!
//! # Usage
//! ```bash
//! gitter /path/to/repo serve            # JSON API on 127.0.0.1:3001
//! gitter /path/to/repo config           # Repository configuration
//! gitter . get user.name --scope global # Single parameter
//! gitter . log HEAD -n 20               # History
//! gitter . run -- status --short        # Any git command, streamed
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitter_access::git::config as git_config;
use gitter_access::git::history::DEFAULT_LOG_LIMIT;
use gitter_access::git::{
    AccessConfig, ChannelObserver, Command, CommandArgument, CommandExecutor, ExecEvent, GitContext,
    GitRepository, StreamKind,
};
use gitter_access::models::ConfigFile;
use gitter_access::routes;

/// Inspect and edit git repositories through the git command-line client
#[derive(Parser)]
#[command(name = "gitter")]
#[command(about = "Typed access to a git repository", long_about = None)]
struct Cli {
    /// Path to the git repository
    #[arg(value_name = "REPO_PATH", default_value = ".")]
    repo_path: PathBuf,

    /// git binary to run
    #[arg(long, default_value = "git")]
    git: PathBuf,

    /// Kill synchronous git calls after this many seconds (0 disables)
    #[arg(long, default_value = "300")]
    timeout_secs: u64,

    /// Log every git invocation at info level
    #[arg(long)]
    log_cli_calls: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the JSON API
    Serve {
        #[arg(short, long, default_value = "3001")]
        port: u16,
    },
    /// Repository summary
    Info,
    /// List configuration parameters of one scope
    Config(ScopeArgs),
    /// Read one configuration parameter
    Get {
        name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Set a configuration parameter
    Set {
        name: String,
        value: String,
        /// Add another value instead of replacing
        #[arg(long)]
        add: bool,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Remove a configuration parameter
    Unset {
        name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Rename a configuration section
    RenameSection {
        old_name: String,
        new_name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Remove a configuration section
    RemoveSection {
        name: String,
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// List tags
    Tags,
    /// List remotes
    Remotes,
    /// List submodules declared in .gitmodules
    Submodules,
    /// Revision history
    Log {
        #[arg(default_value = "HEAD")]
        revision: String,
        #[arg(short = 'n', long, default_value_t = DEFAULT_LOG_LIMIT)]
        limit: usize,
    },
    /// Diff two revisions, or the working tree when no revision is given
    Diff {
        #[arg(long)]
        from: Option<String>,
        to: Option<String>,
        /// Diff the index against HEAD
        #[arg(long)]
        staged: bool,
        #[arg(long)]
        path: Option<String>,
    },
    /// Installed git version
    Version,
    /// Run any git command, streaming its output
    Run {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        args: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Scope {
    Repository,
    Global,
    System,
}

#[derive(Args)]
struct ScopeArgs {
    #[arg(long, value_enum, default_value = "repository")]
    scope: Scope,
    /// Use this config file instead of a standard scope
    #[arg(long, conflicts_with = "scope")]
    file: Option<String>,
}

impl ScopeArgs {
    fn config_file(&self) -> ConfigFile {
        match (&self.file, self.scope) {
            (Some(path), _) => ConfigFile::Other(path.clone()),
            (None, Scope::Repository) => ConfigFile::Repository,
            (None, Scope::Global) => ConfigFile::User,
            (None, Scope::System) => ConfigFile::System,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn open_repository(cli: &Cli, context: &Arc<GitContext>) -> anyhow::Result<GitRepository> {
    GitRepository::open(&cli.repo_path, context.clone())
        .with_context(|| format!("Failed to open repository {}", cli.repo_path.display()))
}

/// Repository-scope operations need the repository; the others run anywhere.
fn scoped_executor(
    cli: &Cli,
    context: &Arc<GitContext>,
    file: &ConfigFile,
) -> anyhow::Result<Box<dyn CommandExecutor>> {
    match file {
        ConfigFile::User | ConfigFile::System => Ok(Box::new(context.global_executor())),
        _ => Ok(Box::new(open_repository(cli, context)?.executor().clone())),
    }
}

fn run_streaming(repo: &GitRepository, args: &[String]) -> anyhow::Result<ExitCode> {
    let (name, rest) = args.split_first().context("No git command given")?;
    let rest: Vec<CommandArgument> = rest.iter().map(|a| a.as_str().into()).collect();
    let command = Command::new(name, rest)?;

    let (observer, events) = ChannelObserver::new();
    let handle = repo.exec_async(&command, Arc::new(observer))?;
    for event in events {
        match event {
            ExecEvent::Line {
                stream: StreamKind::Stdout,
                line: Some(line),
            } => println!("{}", line),
            ExecEvent::Line {
                stream: StreamKind::Stderr,
                line: Some(line),
            } => eprintln!("{}", line),
            ExecEvent::Line { line: None, .. } => {}
            ExecEvent::Exited(_) => break,
        }
    }

    let code = handle.wait();
    Ok(u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from))
}

async fn serve(repo: GitRepository, port: u16) -> anyhow::Result<()> {
    let canonical_path = std::fs::canonicalize(repo.path())
        .unwrap_or_else(|_| repo.path().to_path_buf())
        .to_string_lossy()
        .to_string();
    let shared_repo = Arc::new(repo);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(shared_repo.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to port {}", port))?;

    println!();
    println!("  Repository: {}", canonical_path);
    println!("  API:        http://{}/api/v1/repository", addr);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    shared_repo.close()?;
    Ok(())
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays clean.
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let context = GitContext::new(AccessConfig {
        git_path: cli.git.clone(),
        timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
        log_cli_calls: cli.log_cli_calls,
        ..AccessConfig::default()
    });
    context.ensure_supported()?;

    match &cli.command {
        Commands::Serve { port } => {
            let repo = open_repository(&cli, &context)?;
            tokio::runtime::Runtime::new()?.block_on(serve(repo, *port))?;
        }
        Commands::Info => print_json(&open_repository(&cli, &context)?.info()?)?,
        Commands::Config(scope) => {
            let file = scope.config_file();
            let executor = scoped_executor(&cli, &context, &file)?;
            print_json(&git_config::query_config(&*executor, &file)?)?;
        }
        Commands::Get { name, scope } => {
            let file = scope.config_file();
            let executor = scoped_executor(&cli, &context, &file)?;
            match git_config::query_parameter(&*executor, &file, name)? {
                Some(parameter) => println!("{}", parameter.value),
                None => return Ok(ExitCode::FAILURE),
            }
        }
        Commands::Set {
            name,
            value,
            add,
            scope,
        } => {
            let file = scope.config_file();
            let executor = scoped_executor(&cli, &context, &file)?;
            if *add {
                git_config::add_value(&*executor, &file, name, value)?;
            } else {
                git_config::set_value(&*executor, &file, name, value)?;
            }
        }
        Commands::Unset { name, scope } => {
            let file = scope.config_file();
            let executor = scoped_executor(&cli, &context, &file)?;
            git_config::unset_value(&*executor, &file, name)?;
        }
        Commands::RenameSection {
            old_name,
            new_name,
            scope,
        } => {
            let file = scope.config_file();
            let executor = scoped_executor(&cli, &context, &file)?;
            git_config::rename_section(&*executor, &file, old_name, new_name)?;
        }
        Commands::RemoveSection { name, scope } => {
            let file = scope.config_file();
            let executor = scoped_executor(&cli, &context, &file)?;
            git_config::remove_section(&*executor, &file, name)?;
        }
        Commands::Tags => {
            let repo = open_repository(&cli, &context)?;
            let tags = repo
                .tags()?
                .iter()
                .map(|t| t.data())
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&tags)?;
        }
        Commands::Remotes => {
            let repo = open_repository(&cli, &context)?;
            let remotes = repo
                .remotes()?
                .iter()
                .map(|r| r.data())
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&remotes)?;
        }
        Commands::Submodules => {
            let repo = open_repository(&cli, &context)?;
            let submodules = repo
                .submodules()?
                .iter()
                .map(|s| s.data())
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&submodules)?;
        }
        Commands::Log { revision, limit } => {
            let repo = open_repository(&cli, &context)?;
            let commits = repo
                .get_revisions(revision, *limit)?
                .iter()
                .map(|r| r.detail())
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&commits)?;
        }
        Commands::Diff {
            from,
            to,
            staged,
            path,
        } => {
            let repo = open_repository(&cli, &context)?;
            let diff = match to {
                Some(to) => repo.get_diff(from.as_deref(), to, path.as_deref())?,
                None => repo.get_working_tree_diff(*staged, path.as_deref())?,
            };
            print_json(&diff)?;
        }
        Commands::Version => println!("{}", context.version()?),
        Commands::Run { args } => {
            let repo = open_repository(&cli, &context)?;
            return run_streaming(&repo, args);
        }
    }

    Ok(ExitCode::SUCCESS)
}
