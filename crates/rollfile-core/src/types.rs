//! Core types for rollfile

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Why a backup was rotated out; embedded literally in its file name
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RotationReason {
    Size,
    Time,
}

impl RotationReason {
    pub const ALL: [RotationReason; 2] = [RotationReason::Size, RotationReason::Time];

    pub fn as_str(&self) -> &'static str {
        match self {
            RotationReason::Size => "size",
            RotationReason::Time => "time",
        }
    }
}

impl FromStr for RotationReason {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "size" => Ok(RotationReason::Size),
            "time" => Ok(RotationReason::Time),
            _ => Err(Error::config(format!("unknown rotation reason: {}", s))),
        }
    }
}

impl std::fmt::Display for RotationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
