//! # twin-sql
//!
//! The statement layer of TwinDB.
//!
//! A raw statement goes through three steps before the engine touches any
//! storage:
//!
//! 1. [`StatementKind::classify`] looks at the leading keyword.
//! 2. [`Parser`] checks the grammar of that kind and builds a [`Statement`].
//! 3. [`Validator`] checks it against the table schema and coerces every
//!    literal to its column type.
//!
//! Only seven statement shapes exist:
//!
//! ```text
//! CREATE TABLE name [NODE (LOCAL|REMOTE)] (col type [PRIMARY KEY | FOREIGN KEY REFERENCES t(c)], ...)
//! INSERT INTO name [(col, ...)] VALUES (val, ...)
//! UPDATE name SET col = val [WHERE col = val]
//! DELETE FROM name [WHERE col = val]
//! SELECT (* | col, ...) FROM name [WHERE col = val]
//! DROP TABLE name
//! TRUNCATE TABLE name
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Leading-keyword classification
pub mod classify;

/// Tokenizer
pub mod lexer;

/// Recursive-descent parser and statement types
pub mod parser;

/// Semantic validation
pub mod validate;

/// Literal coercion
pub mod value;

pub use classify::StatementKind;
pub use parser::{ParseError, ParseResult, Parser, Statement};
pub use validate::{SchemaProvider, ValidationError, ValidationResult, Validator};
pub use value::Value;
