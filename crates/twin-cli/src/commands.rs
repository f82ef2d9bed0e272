//! Shell commands.
//!
//! Anything that is not a shell command is handed to the session as a
//! statement, including `SET AUTO_COMMIT`, `COMMIT` and `ROLLBACK`.

use anyhow::Result;

use crate::repl::Repl;

/// Result of executing a command.
pub enum CommandResult {
    /// Continue the shell.
    Continue,
    /// Exit the shell.
    Exit,
    /// Output a message.
    Output(String),
}

/// A parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// `exit`
    Exit,
    /// `help`
    Help,
    /// `export sqldump`
    ExportSqlDump,
    /// `export erd`
    ExportErd,
    /// A statement or session command.
    Statement(String),
}

impl Command {
    /// Parses one input line.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let words: Vec<String> = input
            .trim_end_matches(';')
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();

        match words.as_slice() {
            ["exit"] | ["quit"] => Command::Exit,
            ["help"] => Command::Help,
            ["export", "sqldump"] => Command::ExportSqlDump,
            ["export", "erd"] => Command::ExportErd,
            _ => Command::Statement(input.to_string()),
        }
    }

    /// Executes the command.
    pub fn execute(&self, repl: &mut Repl) -> Result<CommandResult> {
        match self {
            Command::Exit => Ok(CommandResult::Exit),

            Command::Help => Ok(CommandResult::Output(Self::help_text())),

            Command::ExportSqlDump => {
                let path = repl.database().export_sql_dump()?;
                Ok(CommandResult::Output(format!(
                    "SQL dump written to {}",
                    path.display()
                )))
            }

            Command::ExportErd => {
                let path = repl.database().export_erd()?;
                Ok(CommandResult::Output(format!("ERD written to {}", path.display())))
            }

            Command::Statement(text) => {
                repl.execute_and_print(text);
                Ok(CommandResult::Continue)
            }
        }
    }

    fn help_text() -> String {
        r#"Available commands:
  export sqldump                 Write the CREATE statements of every table
  export erd                     Write the foreign key relations
  <SQL statement>                Execute a statement
  SET AUTO_COMMIT = TRUE|FALSE   Switch auto-commit (default TRUE)
  COMMIT                         Apply the pending transaction
  ROLLBACK                       Discard the pending transaction
  help                           Show this help
  exit                           Exit the shell"#
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shell_commands() {
        assert_eq!(Command::parse("exit"), Command::Exit);
        assert_eq!(Command::parse("EXIT;"), Command::Exit);
        assert_eq!(Command::parse(" help "), Command::Help);
        assert_eq!(Command::parse("export sqldump;"), Command::ExportSqlDump);
        assert_eq!(Command::parse("Export  ERD"), Command::ExportErd);
    }

    #[test]
    fn test_parse_statements() {
        assert_eq!(
            Command::parse("SELECT * FROM department;"),
            Command::Statement("SELECT * FROM department;".to_string())
        );
        assert_eq!(
            Command::parse("commit"),
            Command::Statement("commit".to_string())
        );
        assert_eq!(
            Command::parse("export everything"),
            Command::Statement("export everything".to_string())
        );
    }
}
