//! Literal coercion.
//!
//! Stored fields are text. A literal is first coerced to the declared type
//! of its column, then encoded canonically, so `007` and `7` compare equal
//! in an INT column and `1.50` and `1.5` in a DOUBLE column.

use std::fmt;

use twin_common::{DataType, FIELD_DELIMITER};

use crate::parser::Literal;

/// A literal coerced to a column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// INT value.
    Int(i32),
    /// DOUBLE value.
    Double(f64),
    /// TEXT value, unquoted.
    Text(String),
}

impl Value {
    /// Coerces a literal to `data_type`. `None` means the literal does not
    /// fit the type.
    pub fn coerce(literal: &Literal, data_type: DataType) -> Option<Self> {
        match (data_type, literal) {
            (DataType::Int, Literal::Number(n)) => n.parse::<i32>().ok().map(Self::Int),
            (DataType::Double, Literal::Number(n)) => n
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Self::Double),
            (DataType::Text, Literal::Text(t)) => {
                // One stored record per line, so the field must stay on it.
                let valid = !t.trim().is_empty()
                    && !t.contains(FIELD_DELIMITER)
                    && !t.contains(['\n', '\r']);
                valid.then(|| Self::Text(t.clone()))
            }
            _ => None,
        }
    }

    /// Encodes the value as a stored field.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Double(v) if v.fract() == 0.0 && v.abs() < 1e15 => write!(f, "{v:.1}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}
