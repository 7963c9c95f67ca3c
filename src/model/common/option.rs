use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One of the two answers to a question.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteOption {
    A,
    B,
}

impl VoteOption {
    /// Name of the stored tally field counting votes for this option.
    pub fn tally_field(self) -> &'static str {
        match self {
            Self::A => "votesA",
            Self::B => "votesB",
        }
    }
}

impl Display for VoteOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// Parsing is exact: only `"A"` and `"B"` are accepted.
impl FromStr for VoteOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(Error::InvalidOption(other.to_string())),
        }
    }
}
