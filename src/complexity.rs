//! Table-driven configuration complexity scoring.
//!
//! Each standard's mapper owns a [`ScoringTable`] plus per-feature weights
//! and per-array [`ArrayRule`]s; the engine here turns those into a
//! [`ComplexityAnalysis`]. The heuristic is data, not scattered arithmetic:
//! the score is monotonically non-decreasing in enabled features and
//! related-record counts by construction, and the level is a step function
//! of the score. Cardinality ceilings escalate to chunking independently of
//! the score thresholds.

use serde::{Deserialize, Serialize};

use crate::strategy::DeploymentStrategy;

/// Scoring contributions at or above this weight get a human-readable
/// reason attached to the analysis.
const NONTRIVIAL_WEIGHT: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
    Extreme,
}

/// Per-standard scoring constants. Thresholds are ordered:
/// `score < low_below` is low, `< medium_below` medium, `< high_below`
/// high, anything else extreme. The numbers deliberately differ per
/// standard; there is no shared source of truth.
#[derive(Debug, Clone, Copy)]
pub struct ScoringTable {
    /// Unavoidable cost of any deployment of the standard.
    pub base: u32,
    pub low_below: u32,
    pub medium_below: u32,
    pub high_below: u32,
}

impl ScoringTable {
    const fn level_for(&self, score: u32) -> ComplexityLevel {
        if score < self.low_below {
            ComplexityLevel::Low
        } else if score < self.medium_below {
            ComplexityLevel::Medium
        } else if score < self.high_below {
            ComplexityLevel::High
        } else {
            ComplexityLevel::Extreme
        }
    }
}

/// Scoring rule for one related-record array: each item adds `per_item`
/// points up to `cap` (so one oversized array cannot dominate the score);
/// more than `ceiling` items forces chunking regardless of score;
/// `chunk_size` items fit in one post-deployment configuration transaction.
#[derive(Debug, Clone, Copy)]
pub struct ArrayRule {
    pub per_item: u32,
    pub cap: u32,
    pub ceiling: usize,
    pub chunk_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
    pub level: ComplexityLevel,
    pub score: u32,
    pub feature_count: u32,
    pub requires_chunking: bool,
    pub recommended_strategy: DeploymentStrategy,
    /// Total transactions a chunked deployment is expected to take,
    /// including the base deployment.
    pub estimated_chunks: u32,
    pub reasons: Vec<String>,
    pub warnings: Vec<String>,
}

impl ComplexityAnalysis {
    /// The analysis attached to a failed mapping: nothing scored.
    pub fn zeroed() -> Self {
        Self {
            level: ComplexityLevel::Low,
            score: 0,
            feature_count: 0,
            requires_chunking: false,
            recommended_strategy: DeploymentStrategy::Basic,
            estimated_chunks: 0,
            reasons: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Accumulates scoring contributions for one configuration.
///
/// Pure and deterministic: the same sequence of calls always yields the
/// same analysis. Both the preview-recommendation path and the actual
/// deployment path rely on that.
#[derive(Debug)]
pub struct ComplexityProfile<'t> {
    table: &'t ScoringTable,
    score: u32,
    feature_count: u32,
    ceiling_breached: bool,
    extra_chunks: u32,
    reasons: Vec<String>,
    warnings: Vec<String>,
}

impl<'t> ComplexityProfile<'t> {
    pub fn new(table: &'t ScoringTable) -> Self {
        Self {
            table,
            score: table.base,
            feature_count: 0,
            ceiling_breached: false,
            extra_chunks: 0,
            reasons: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record an enabled optional section worth `weight` points.
    pub fn feature(&mut self, name: &str, weight: u32) {
        self.score += weight;
        self.feature_count += 1;
        if weight >= NONTRIVIAL_WEIGHT {
            self.reasons.push(format!("{name} enabled (+{weight})"));
        }
    }

    /// Record a related-record array. Empty arrays contribute nothing and
    /// do not count as an enabled section.
    pub fn records(&mut self, name: &str, count: usize, rule: &ArrayRule) {
        if count == 0 {
            return;
        }
        let raw = u32::try_from(count).unwrap_or(u32::MAX).saturating_mul(rule.per_item);
        let contribution = raw.min(rule.cap);
        self.score += contribution;
        self.feature_count += 1;
        if contribution >= NONTRIVIAL_WEIGHT {
            self.reasons
                .push(format!("{count} {name} (+{contribution})"));
        }
        if count > rule.ceiling {
            self.ceiling_breached = true;
            self.warnings.push(format!(
                "{count} {name} exceeds the {} per-deployment ceiling; chunked deployment required",
                rule.ceiling
            ));
        }
        self.extra_chunks += count.div_ceil(rule.chunk_size) as u32;
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn finish(self) -> ComplexityAnalysis {
        let level = self.table.level_for(self.score);
        let requires_chunking = self.ceiling_breached
            || matches!(level, ComplexityLevel::High | ComplexityLevel::Extreme);
        let recommended_strategy = if requires_chunking {
            DeploymentStrategy::Chunked
        } else if level == ComplexityLevel::Medium {
            DeploymentStrategy::Enhanced
        } else {
            DeploymentStrategy::Basic
        };
        let estimated_chunks = if requires_chunking {
            1 + self.extra_chunks
        } else {
            1
        };

        ComplexityAnalysis {
            level,
            score: self.score,
            feature_count: self.feature_count,
            requires_chunking,
            recommended_strategy,
            estimated_chunks,
            reasons: self.reasons,
            warnings: self.warnings,
        }
    }
}
