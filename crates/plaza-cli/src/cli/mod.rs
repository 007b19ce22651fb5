//! CLI entry and dispatch.

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use plaza_core::Plaza;
use plaza_core::config::{self, LoggingConfig, paths};
use plaza_types::PostId;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

/// Environment variable holding the log filter (e.g. `plaza_core=debug`).
const LOG_ENV: &str = "PLAZA_LOG";

#[derive(Parser)]
#[command(name = "plaza")]
#[command(version)]
#[command(about = "Terminal client for the plaza social feed")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long = "first-name")]
        first_name: String,
        #[arg(long = "last-name")]
        last_name: String,
        /// Password (read from stdin when omitted)
        #[arg(long, env = "PLAZA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log in and store the session
    Login {
        #[arg(long)]
        email: String,
        /// Password (read from stdin when omitted)
        #[arg(long, env = "PLAZA_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Log out and forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Show the feed
    Feed {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Show, create, edit or delete posts
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Like or unlike a post
    Like {
        #[arg(value_name = "POST_ID")]
        id: PostId,
    },

    /// List comments on a post
    Comments {
        #[arg(value_name = "POST_ID")]
        id: PostId,
    },

    /// Comment on a post
    Comment {
        #[arg(value_name = "POST_ID")]
        id: PostId,
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Show a user's profile and posts
    Profile {
        #[arg(value_name = "USERNAME")]
        username: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum PostCommands {
    /// Show a post with its comments
    Show {
        #[arg(value_name = "POST_ID")]
        id: PostId,
    },
    /// Publish a new post
    Create {
        #[arg(long, default_value = "")]
        content: String,
        /// Image file to attach (max 5MB)
        #[arg(long, value_name = "PATH")]
        image: Option<String>,
    },
    /// Edit one of your posts
    Edit {
        #[arg(value_name = "POST_ID")]
        id: PostId,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long, value_name = "PATH")]
        image: Option<String>,
    },
    /// Delete one of your posts
    Delete {
        #[arg(value_name = "POST_ID")]
        id: PostId,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    // Config commands work without a reachable backend.
    let command = match cli.command {
        Commands::Config { command } => return run_config(command),
        command => command,
    };

    let config = config::Config::load().context("load config")?;
    let _log_guard = init_logging(&config.logging)?;

    let (mut plaza, mut events) = Plaza::from_config(&config)?;
    plaza.session.initialize().await;

    let result = run_command(&mut plaza, command).await;
    render::events(&mut events);
    result
}

async fn run_command(plaza: &mut Plaza, command: Commands) -> Result<()> {
    match command {
        Commands::Register {
            username,
            email,
            first_name,
            last_name,
            password,
        } => {
            let registration = plaza_types::Registration {
                username,
                email,
                password: commands::auth::password_or_stdin(password)?,
                first_name,
                last_name,
            };
            commands::auth::register(plaza, &registration).await
        }
        Commands::Login { email, password } => {
            let password = commands::auth::password_or_stdin(password)?;
            commands::auth::login(plaza, email, password).await
        }
        Commands::Logout => {
            commands::auth::logout(plaza);
            Ok(())
        }
        Commands::Whoami => {
            commands::auth::whoami(plaza);
            Ok(())
        }
        Commands::Feed { pages } => commands::feed::show(plaza, pages).await,
        Commands::Post { command } => match command {
            PostCommands::Show { id } => commands::posts::show(plaza, id).await,
            PostCommands::Create { content, image } => {
                commands::posts::create(plaza, content, image.as_deref()).await
            }
            PostCommands::Edit { id, content, image } => {
                commands::posts::edit(plaza, id, content, image.as_deref()).await
            }
            PostCommands::Delete { id } => commands::posts::delete(plaza, id).await,
        },
        Commands::Like { id } => commands::posts::like(plaza, id).await,
        Commands::Comments { id } => commands::posts::comments(plaza, id).await,
        Commands::Comment { id, text } => commands::posts::comment(plaza, id, &text).await,
        Commands::Profile { username } => commands::profile::show(plaza, &username).await,
        Commands::Config { command } => run_config(command),
    }
}

fn run_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Path => {
            commands::config::path();
            Ok(())
        }
        ConfigCommands::Init => commands::config::init(),
    }
}

/// Installs the tracing subscriber. `PLAZA_LOG` wins over the configured
/// level. The returned guard flushes the log file on drop.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if logging.file {
        let dir = paths::logs_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, "plaza.log"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(None)
    }
}
