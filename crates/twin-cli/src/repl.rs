//! Interactive REPL (Read-Eval-Print-Loop) for TwinDB.
//!
//! Each line is one statement or shell command. History is kept across
//! runs.

use std::path::PathBuf;

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, EditMode, Editor, Helper};
use tracing::{debug, error, info};

use twin_server::{Database, Session};

use crate::commands::{Command, CommandResult};

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "CREATE",
    "TABLE", "DROP", "TRUNCATE", "NODE", "LOCAL", "REMOTE", "PRIMARY", "KEY", "FOREIGN",
    "REFERENCES", "INT", "DOUBLE", "TEXT", "AUTO_COMMIT", "TRUE", "FALSE", "COMMIT", "ROLLBACK",
];

/// REPL helper for rustyline.
struct ReplHelper;

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| c.is_whitespace() || c == '(' || c == ',')
            .map(|i| i + 1)
            .unwrap_or(0);

        let word_upper = line[start..pos].to_uppercase();
        if word_upper.is_empty() {
            return Ok((start, Vec::new()));
        }

        let matches = KEYWORDS
            .iter()
            .filter(|kw| kw.starts_with(&word_upper))
            .map(|kw| Pair {
                display: kw.to_string(),
                replacement: kw.to_string(),
            })
            .collect();

        Ok((start, matches))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;
}

impl Highlighter for ReplHelper {}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

/// Interactive shell over one session.
pub struct Repl {
    db: Database,
    session: Session,
    editor: Editor<ReplHelper, DefaultHistory>,
    history_file: Option<PathBuf>,
}

impl Repl {
    /// Opens the session and the line editor.
    pub fn new(db: Database) -> Result<Self> {
        let session = db.create_session()?;

        let rl_config = Config::builder()
            .history_ignore_space(true)
            .completion_type(CompletionType::List)
            .edit_mode(EditMode::Emacs)
            .max_history_size(1000)?
            .build();

        let mut editor = Editor::with_config(rl_config)?;
        editor.set_helper(Some(ReplHelper));

        let history_file = history_file();
        if let Some(path) = &history_file {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    debug!("Failed to load history: {}", e);
                }
            }
        }

        Ok(Self {
            db,
            session,
            editor,
            history_file,
        })
    }

    /// Prints the welcome banner.
    pub fn print_banner(&self) {
        println!("TwinDB shell v{}", env!("CARGO_PKG_VERSION"));
        println!(
            "Running as the {} site. Type help for commands, exit to quit.\n",
            self.session.current_site()
        );
    }

    /// Runs the main REPL loop.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let prompt = self.prompt();

            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Err(e) = self.editor.add_history_entry(line) {
                        debug!("Failed to record history: {}", e);
                    }

                    if self.process_line(line) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("exit");
                    break;
                }
                Err(e) => {
                    error!("Readline error: {}", e);
                    break;
                }
            }
        }

        self.save_history();
        info!(
            "Session ran {} statements in {:.1?}",
            self.session.statement_count(),
            self.session.uptime()
        );
        self.session.close();
        println!("Goodbye!");
        Ok(())
    }

    /// Processes one line. Returns true when the shell should exit.
    pub fn process_line(&mut self, line: &str) -> bool {
        match Command::parse(line).execute(self) {
            Ok(CommandResult::Continue) => false,
            Ok(CommandResult::Exit) => true,
            Ok(CommandResult::Output(msg)) => {
                println!("{msg}");
                false
            }
            Err(e) => {
                eprintln!("ERROR: {e}");
                false
            }
        }
    }

    /// Executes a statement or session command and prints the outcome.
    pub fn execute_and_print(&mut self, text: &str) {
        match self.session.execute(text) {
            Ok(result) => println!("{}", result.display()),
            Err(e) => eprintln!("ERROR: {e}"),
        }
    }

    /// Returns the database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    fn prompt(&self) -> String {
        let marker = if self.session.auto_commit() { "" } else { "*" };
        format!("twin[{}]{marker}> ", self.session.current_site())
    }

    fn save_history(&mut self) {
        if let Some(path) = &self.history_file {
            if let Some(parent) = path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    debug!("Failed to create history directory: {}", e);
                    return;
                }
            }
            if let Err(e) = self.editor.save_history(path) {
                debug!("Failed to save history: {}", e);
            }
        }
    }
}

/// Gets the history file path.
fn history_file() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("twindb").join("history"))
}
