//! TwinDB Command-Line Interface
//!
//! The `twin` shell opens the site's data directory, checks credentials and
//! runs statements against the single session.
//!
//! # Usage
//!
//! ```bash
//! # Start the shell as the LOCAL site, reaching the daemon at 10.0.0.7
//! twin --site local --remote 10.0.0.7:7878
//!
//! # Execute a single statement
//! twin -c "SELECT * FROM department"
//!
//! # Execute statements from a file
//! twin -f schema.sql
//!
//! # Add a user to the credentials file
//! twin --credentials users.dat --add-user alice
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rustyline::DefaultEditor;
use tracing::info;
use tracing_subscriber::EnvFilter;

use twin_server::Database;

mod auth;
mod commands;
mod config;
mod repl;

use auth::CredentialStore;
use config::Overrides;
use repl::Repl;

/// TwinDB command-line interface
#[derive(Parser, Debug)]
#[command(
    name = "twin",
    version,
    about = "Interactive shell for TwinDB",
    long_about = "TwinDB splits one relational database across a LOCAL and a REMOTE site.\n\n\
                  Use this shell to create tables at either site, run statements,\n\
                  and manage transactions."
)]
struct Args {
    /// Configuration file path
    #[arg(long, value_name = "FILE", env = "TWIN_CONFIG")]
    config: Option<PathBuf>,

    /// Site this process runs as (LOCAL or REMOTE)
    #[arg(short = 's', long, env = "TWIN_SITE")]
    site: Option<String>,

    /// Data directory
    #[arg(short = 'd', long, value_name = "DIR", env = "TWIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Remote site daemon address (host:port)
    #[arg(short = 'r', long, value_name = "ADDR", env = "TWIN_REMOTE")]
    remote: Option<String>,

    /// Credentials file
    #[arg(long, value_name = "FILE", env = "TWIN_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Username
    #[arg(short = 'U', long, env = "TWIN_USER")]
    user: Option<String>,

    /// Password (use TWIN_PASSWORD env var for security)
    #[arg(short = 'W', long, env = "TWIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Add a user to the credentials file and exit
    #[arg(long, value_name = "USER")]
    add_user: Option<String>,

    /// Execute a single statement and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Execute statements from file and exit
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", env = "TWIN_LOG_LEVEL")]
    log_level: String,

    /// Suppress the banner
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let overrides = Overrides {
        site: args.site.clone(),
        data_dir: args.data_dir.clone(),
        remote: args.remote.clone(),
        credentials_file: args.credentials.clone(),
    };
    let config = config::load(args.config.as_deref(), &overrides)?;

    if let Some(user) = &args.add_user {
        let path = config
            .credentials_file
            .as_deref()
            .context("--add-user needs a credentials file (--credentials)")?;
        return add_user(path, user, args.password.as_deref());
    }

    if let Some(path) = &config.credentials_file {
        login(path, args.user.as_deref(), args.password.as_deref())?;
    }

    let db = Database::open(config).context("Failed to open database")?;
    let mut repl = Repl::new(db)?;

    if let Some(command) = &args.command {
        info!("Executing command: {}", command);
        repl.process_line(command);
        Ok(())
    } else if let Some(file) = &args.file {
        execute_file(&mut repl, file)
    } else {
        if !args.quiet {
            repl.print_banner();
        }
        repl.run()
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(format!(
        "twin={level},twin_server={level},twin_storage={level},twin_sql={level}"
    ))
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn login(path: &Path, user: Option<&str>, password: Option<&str>) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    let user = match user {
        Some(user) => user.to_string(),
        None => editor.readline("Username: ")?.trim().to_string(),
    };
    let password = match password {
        Some(password) => password.to_string(),
        None => editor.readline("Password: ")?.trim().to_string(),
    };

    if !CredentialStore::new(path).verify(&user, &password)? {
        bail!("Invalid username or password.");
    }
    info!("Logged in as {}", user);
    Ok(())
}

fn add_user(path: &Path, user: &str, password: Option<&str>) -> Result<()> {
    let password = match password {
        Some(password) => password.to_string(),
        None => DefaultEditor::new()?
            .readline(&format!("Password for {user}: "))?
            .trim()
            .to_string(),
    };
    CredentialStore::new(path).add_user(user, &password)?;
    println!("User '{user}' added to {}", path.display());
    Ok(())
}

fn execute_file(repl: &mut Repl, path: &Path) -> Result<()> {
    info!("Executing file: {}", path.display());
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    for statement in split_statements(&content) {
        if repl.process_line(statement) {
            break;
        }
    }
    Ok(())
}

/// Splits a script into statements on `;` and line ends. Separators inside
/// quoted literals do not split, and `--` comments are dropped.
fn split_statements(content: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let mut start = 0;
    let mut in_string = false;
    let mut in_comment = false;

    for (i, c) in content.char_indices() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                start = i + 1;
            }
            continue;
        }
        if c == '\'' {
            in_string = !in_string;
            continue;
        }
        if in_string {
            continue;
        }

        if c == '-' && content[i..].starts_with("--") {
            push_statement(&mut statements, &content[start..i]);
            in_comment = true;
        } else if c == ';' || c == '\n' {
            push_statement(&mut statements, &content[start..i]);
            start = i + 1;
        }
    }

    if !in_comment {
        push_statement(&mut statements, &content[start..]);
    }
    statements
}

fn push_statement<'a>(statements: &mut Vec<&'a str>, text: &'a str) {
    let text = text.trim();
    if !text.is_empty() {
        statements.push(text);
    }
}
