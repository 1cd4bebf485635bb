//! Deployment strategy selection.
//!
//! Selection is a pure function of the complexity analysis, any caller
//! override, and the institutional-grade flag. The preview recommendation
//! path and the deployment path both go through [`select_strategy`], so the
//! two always agree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::complexity::ComplexityAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentStrategy {
    /// Single deploy + initialize, nothing else.
    Basic,
    /// Deploy + initialize + module attachment in one orchestrated pass.
    Enhanced,
    /// Enhanced plus post-deployment configuration split across
    /// multiple transactions.
    Chunked,
}

impl DeploymentStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Enhanced => "enhanced",
            Self::Chunked => "chunked",
        }
    }
}

impl fmt::Display for DeploymentStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-facing strategy option: `auto` defers to the analyzer, anything
/// else is used verbatim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyChoice {
    #[default]
    Auto,
    Basic,
    Enhanced,
    Chunked,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown strategy: {0} (expected auto, basic, enhanced, or chunked)")]
pub struct UnknownStrategyError(pub String);

impl FromStr for StrategyChoice {
    type Err = UnknownStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "basic" => Ok(Self::Basic),
            "enhanced" => Ok(Self::Enhanced),
            "chunked" => Ok(Self::Chunked),
            other => Err(UnknownStrategyError(other.to_owned())),
        }
    }
}

/// Pick the strategy for a deployment.
///
/// Precedence: an explicit force wins verbatim; the institutional-grade
/// flag escalates to chunked regardless of score; otherwise the analyzer's
/// recommendation stands.
pub fn select_strategy(
    analysis: &ComplexityAnalysis,
    choice: StrategyChoice,
    institutional_grade: bool,
) -> DeploymentStrategy {
    match choice {
        StrategyChoice::Basic => DeploymentStrategy::Basic,
        StrategyChoice::Enhanced => DeploymentStrategy::Enhanced,
        StrategyChoice::Chunked => DeploymentStrategy::Chunked,
        StrategyChoice::Auto => {
            if institutional_grade {
                DeploymentStrategy::Chunked
            } else {
                analysis.recommended_strategy
            }
        }
    }
}
