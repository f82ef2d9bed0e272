//! Recursive-descent parser.
//!
//! One routine per statement kind. Keywords match case-insensitively,
//! identifiers must match `[a-zA-Z_]+` and are folded to lower case, and a
//! single trailing `;` is allowed.
//!
//! # Usage
//!
//! ```
//! use twin_sql::parser::{Parser, Statement};
//!
//! let statement = Parser::parse("DELETE FROM employee WHERE id = 2;").unwrap();
//! assert!(matches!(statement, Statement::Delete(_)));
//! ```

use thiserror::Error;
use twin_common::{DataType, ErrorCode, Site};

mod statement;

pub use statement::*;

use crate::classify::StatementKind;
use crate::lexer::{tokenize, Token};

/// Errors that can occur during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The text does not match the grammar.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The leading keyword is not a supported statement.
    #[error("unknown statement: {0}")]
    UnknownStatement(String),

    /// An identifier contains characters outside `[a-zA-Z_]`.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Empty statement.
    #[error("empty statement")]
    EmptyStatement,
}

impl ParseError {
    /// Returns the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownStatement(_) => ErrorCode::UnknownStatement,
            _ => ErrorCode::SyntaxError,
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Statement parser.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Classifies and parses one statement.
    pub fn parse(text: &str) -> ParseResult<Statement> {
        if text.trim().is_empty() {
            return Err(ParseError::EmptyStatement);
        }
        Self::parse_kind(StatementKind::classify(text), text)
    }

    /// Parses one statement already classified as `kind`.
    pub fn parse_kind(kind: StatementKind, text: &str) -> ParseResult<Statement> {
        if kind == StatementKind::Unknown {
            return Err(ParseError::UnknownStatement(text.trim().to_string()));
        }

        let mut parser = Self {
            tokens: tokenize(text)?,
            pos: 0,
        };

        let statement = match kind {
            StatementKind::Create => parser.parse_create_table()?,
            StatementKind::Insert => parser.parse_insert()?,
            StatementKind::Update => parser.parse_update()?,
            StatementKind::Delete => parser.parse_delete()?,
            StatementKind::Select => parser.parse_select()?,
            StatementKind::Drop => Statement::DropTable(parser.parse_table_command("DROP")?),
            StatementKind::Truncate => {
                Statement::TruncateTable(parser.parse_table_command("TRUNCATE")?)
            }
            StatementKind::Unknown => {
                return Err(ParseError::UnknownStatement(text.trim().to_string()));
            }
        };

        parser.parse_end()?;
        Ok(statement)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_create_table(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("CREATE")?;
        self.expect_keyword("TABLE")?;
        let name = self.parse_identifier()?;

        let site = if self.consume_keyword("NODE") {
            let word = self.parse_word()?;
            Some(word.parse::<Site>().map_err(|e| ParseError::Syntax(e.to_string()))?)
        } else {
            None
        };

        self.expect(&Token::LParen)?;
        let mut columns = vec![self.parse_column_def()?];
        while self.consume(&Token::Comma) {
            columns.push(self.parse_column_def()?);
        }
        self.expect(&Token::RParen)?;

        Ok(Statement::CreateTable(CreateTableStatement {
            name,
            site,
            columns,
        }))
    }

    fn parse_column_def(&mut self) -> ParseResult<ColumnDef> {
        let name = self.parse_identifier()?;
        let type_word = self.parse_word()?;
        let data_type: DataType = type_word.parse().map_err(ParseError::Syntax)?;

        let constraint = if self.consume_keyword("PRIMARY") {
            self.expect_keyword("KEY")?;
            ColumnConstraint::PrimaryKey
        } else if self.consume_keyword("FOREIGN") {
            self.expect_keyword("KEY")?;
            self.expect_keyword("REFERENCES")?;
            let table = self.parse_identifier()?;
            self.expect(&Token::LParen)?;
            let column = self.parse_identifier()?;
            self.expect(&Token::RParen)?;
            ColumnConstraint::ForeignKey { table, column }
        } else {
            ColumnConstraint::None
        };

        Ok(ColumnDef {
            name,
            data_type,
            constraint,
        })
    }

    fn parse_insert(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("INSERT")?;
        self.expect_keyword("INTO")?;
        let table = self.parse_identifier()?;

        let columns = if self.consume(&Token::LParen) {
            let columns = self.parse_identifier_list()?;
            self.expect(&Token::RParen)?;
            Some(columns)
        } else {
            None
        };

        self.expect_keyword("VALUES")?;
        self.expect(&Token::LParen)?;
        let mut values = vec![self.parse_literal()?];
        while self.consume(&Token::Comma) {
            values.push(self.parse_literal()?);
        }
        self.expect(&Token::RParen)?;

        Ok(Statement::Insert(InsertStatement {
            table,
            columns,
            values,
        }))
    }

    fn parse_update(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("UPDATE")?;
        let table = self.parse_identifier()?;
        self.expect_keyword("SET")?;
        let column = self.parse_identifier()?;
        self.expect(&Token::Eq)?;
        let value = self.parse_literal()?;
        let predicate = self.parse_optional_where()?;

        Ok(Statement::Update(UpdateStatement {
            table,
            assignment: Assignment { column, value },
            predicate,
        }))
    }

    fn parse_delete(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("DELETE")?;
        self.expect_keyword("FROM")?;
        let table = self.parse_identifier()?;
        let predicate = self.parse_optional_where()?;

        Ok(Statement::Delete(DeleteStatement { table, predicate }))
    }

    fn parse_select(&mut self) -> ParseResult<Statement> {
        self.expect_keyword("SELECT")?;
        let projection = if self.consume(&Token::Star) {
            Projection::All
        } else {
            Projection::Columns(self.parse_identifier_list()?)
        };
        self.expect_keyword("FROM")?;
        let table = self.parse_identifier()?;
        let predicate = self.parse_optional_where()?;

        Ok(Statement::Select(SelectStatement {
            table,
            projection,
            predicate,
        }))
    }

    /// `DROP TABLE name` and `TRUNCATE TABLE name`.
    fn parse_table_command(&mut self, keyword: &str) -> ParseResult<String> {
        self.expect_keyword(keyword)?;
        self.expect_keyword("TABLE")?;
        self.parse_identifier()
    }

    // =========================================================================
    // Clauses
    // =========================================================================

    fn parse_optional_where(&mut self) -> ParseResult<Option<Predicate>> {
        if !self.consume_keyword("WHERE") {
            return Ok(None);
        }
        let column = self.parse_identifier()?;
        self.expect(&Token::Eq)?;
        let value = self.parse_literal()?;
        Ok(Some(Predicate { column, value }))
    }

    fn parse_identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut names = vec![self.parse_identifier()?];
        while self.consume(&Token::Comma) {
            names.push(self.parse_identifier()?);
        }
        Ok(names)
    }

    fn parse_literal(&mut self) -> ParseResult<Literal> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Literal::Number(n)),
            Some(Token::Str(s)) => Ok(Literal::Text(s)),
            Some(other) => Err(ParseError::Syntax(format!(
                "expected a number or quoted text, found '{other}'"
            ))),
            None => Err(ParseError::Syntax(
                "expected a value, found end of statement".to_string(),
            )),
        }
    }

    fn parse_identifier(&mut self) -> ParseResult<String> {
        let word = self.parse_word()?;
        if !word.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
            return Err(ParseError::InvalidIdentifier(word));
        }
        Ok(word.to_ascii_lowercase())
    }

    fn parse_word(&mut self) -> ParseResult<String> {
        match self.next() {
            Some(Token::Word(w)) => Ok(w),
            Some(other) => Err(ParseError::Syntax(format!(
                "expected a name, found '{other}'"
            ))),
            None => Err(ParseError::Syntax(
                "expected a name, found end of statement".to_string(),
            )),
        }
    }

    fn parse_end(&mut self) -> ParseResult<()> {
        self.consume(&Token::Semicolon);
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(ParseError::Syntax(format!(
                "unexpected '{token}' after end of statement"
            ))),
        }
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn consume(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        if self.consume(expected) {
            return Ok(());
        }
        Err(self.unexpected(&expected.to_string()))
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.consume_keyword(keyword) {
            return Ok(());
        }
        Err(self.unexpected(keyword))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(found) => ParseError::Syntax(format!("expected '{expected}', found '{found}'")),
            None => ParseError::Syntax(format!("expected '{expected}', found end of statement")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: &str) -> Literal {
        Literal::Number(n.to_string())
    }

    fn text(t: &str) -> Literal {
        Literal::Text(t.to_string())
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = Parser::parse(
            "CREATE TABLE employee NODE remote (id INT PRIMARY KEY, name TEXT, \
             dept_id INT FOREIGN KEY REFERENCES department(id));",
        )
        .unwrap();

        let Statement::CreateTable(create) = stmt else {
            panic!("expected CreateTable");
        };
        assert_eq!(create.name, "employee");
        assert_eq!(create.site, Some(Site::Remote));
        assert_eq!(create.columns.len(), 3);
        assert_eq!(create.columns[0].constraint, ColumnConstraint::PrimaryKey);
        assert_eq!(create.columns[1].data_type, DataType::Text);
        assert_eq!(
            create.columns[2].constraint,
            ColumnConstraint::ForeignKey {
                table: "department".to_string(),
                column: "id".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_create_without_node() {
        let stmt = Parser::parse("create table Department (ID int, budget double)").unwrap();
        let Statement::CreateTable(create) = stmt else {
            panic!("expected CreateTable");
        };
        assert_eq!(create.name, "department");
        assert_eq!(create.site, None);
        assert_eq!(create.columns[0].name, "id");
        assert_eq!(create.columns[1].data_type, DataType::Double);
    }

    #[test]
    fn test_parse_create_errors() {
        assert!(Parser::parse("CREATE TABLE t NODE MARS (a INT)").is_err());
        assert!(Parser::parse("CREATE TABLE t (a VARCHAR)").is_err());
        assert!(Parser::parse("CREATE TABLE t ()").is_err());
        assert!(Parser::parse("CREATE TABLE t (a INT FOREIGN KEY REFERENCES u)").is_err());
        assert!(Parser::parse("CREATE INDEX i ON t (a)").is_err());
    }

    #[test]
    fn test_parse_insert() {
        let stmt = Parser::parse("INSERT INTO employee (id, name) VALUES (1, 'alice')").unwrap();
        assert_eq!(
            stmt,
            Statement::Insert(InsertStatement {
                table: "employee".to_string(),
                columns: Some(vec!["id".to_string(), "name".to_string()]),
                values: vec![number("1"), text("alice")],
            })
        );

        let stmt = Parser::parse("insert into department values (1,'eng');").unwrap();
        let Statement::Insert(insert) = stmt else {
            panic!("expected Insert");
        };
        assert!(insert.columns.is_none());
        assert_eq!(insert.values, vec![number("1"), text("eng")]);
    }

    #[test]
    fn test_parse_update_and_delete() {
        let stmt = Parser::parse("UPDATE employee SET name = 'bob' WHERE id = 2").unwrap();
        assert_eq!(
            stmt,
            Statement::Update(UpdateStatement {
                table: "employee".to_string(),
                assignment: Assignment {
                    column: "name".to_string(),
                    value: text("bob"),
                },
                predicate: Some(Predicate {
                    column: "id".to_string(),
                    value: number("2"),
                }),
            })
        );

        let stmt = Parser::parse("DELETE FROM employee").unwrap();
        assert_eq!(
            stmt,
            Statement::Delete(DeleteStatement {
                table: "employee".to_string(),
                predicate: None,
            })
        );
    }

    #[test]
    fn test_parse_select() {
        let stmt = Parser::parse("SELECT * FROM department").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected Select");
        };
        assert_eq!(select.projection, Projection::All);

        let stmt = Parser::parse("SELECT name, id FROM employee WHERE dept_id = 1;").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected Select");
        };
        assert_eq!(
            select.projection,
            Projection::Columns(vec!["name".to_string(), "id".to_string()])
        );
        assert!(select.predicate.is_some());
    }

    #[test]
    fn test_parse_drop_and_truncate() {
        assert_eq!(
            Parser::parse("DROP TABLE employee;").unwrap(),
            Statement::DropTable("employee".to_string())
        );
        assert_eq!(
            Parser::parse("truncate table employee").unwrap(),
            Statement::TruncateTable("employee".to_string())
        );
        assert!(Parser::parse("DROP employee").is_err());
    }

    #[test]
    fn test_rejects_richer_predicates() {
        assert!(Parser::parse("SELECT * FROM t WHERE a = 1 AND b = 2").is_err());
        assert!(Parser::parse("DELETE FROM t WHERE a").is_err());
        assert!(Parser::parse("UPDATE t SET a = 1, b = 2").is_err());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(Parser::parse("DROP TABLE t;;").is_err());
        assert!(Parser::parse("DROP TABLE t extra").is_err());
    }

    #[test]
    fn test_invalid_identifier() {
        let err = Parser::parse("DROP TABLE t1").unwrap_err();
        assert_eq!(err, ParseError::InvalidIdentifier("t1".to_string()));
    }

    #[test]
    fn test_unknown_statement() {
        let err = Parser::parse("GRANT ALL ON t").unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownStatement);
        assert_eq!(Parser::parse("   ").unwrap_err(), ParseError::EmptyStatement);
    }

    #[test]
    fn test_display_round_trip() {
        let text = "CREATE TABLE employee NODE REMOTE (id INT PRIMARY KEY, name TEXT, \
                    dept_id INT FOREIGN KEY REFERENCES department(id))";
        let stmt = Parser::parse(text).unwrap();
        assert_eq!(stmt.to_string(), text);
        assert_eq!(Parser::parse(&stmt.to_string()).unwrap(), stmt);
    }
}
