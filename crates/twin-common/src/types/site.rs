//! Storage sites.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two cooperating storage endpoints.
///
/// Every process runs as one site and every table is catalogued under one
/// site. Only a `Local` process can reach its counterpart over the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Site {
    /// The site that runs the interactive shell and bridges to the other.
    Local,
    /// The site reached over the network.
    Remote,
}

impl Site {
    /// Returns the canonical upper-case name, as stored in catalog files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Remote => "REMOTE",
        }
    }

    /// Returns the other site.
    #[must_use]
    pub const fn counterpart(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a site name is neither `LOCAL` nor `REMOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid site '{0}', expected LOCAL or REMOTE")]
pub struct ParseSiteError(pub String);

impl FromStr for Site {
    type Err = ParseSiteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(Self::Local),
            "REMOTE" => Ok(Self::Remote),
            _ => Err(ParseSiteError(s.to_string())),
        }
    }
}
