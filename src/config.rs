//! Run configuration for [`detect_cycle`](crate::algs::detect::detect_cycle).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cycle_error::CycleError;

/// How reachable trans-arc tails are summarized per vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReachMode {
    /// Single `[C0, C1]` hull. Exact when every vertex reaches a contiguous
    /// label range of trans-arc tails.
    #[default]
    Convex,
    /// Normalized union of intervals; exact for any acyclic partition.
    Exact,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// First tag of the range reserved for one run.
    pub tag_base: u16,
    pub reach_mode: ReachMode,
    /// Halt the local traversal at the first back arc.
    pub stop_at_first_local_cycle: bool,
    /// Check the input contract before analysis.
    pub validate_input: bool,
    /// Re-validate every compacted packed graph (always on in debug builds).
    pub check_invariants: bool,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            tag_base: 0xC7C0,
            reach_mode: ReachMode::Convex,
            stop_at_first_local_cycle: true,
            validate_input: true,
            check_invariants: false,
        }
    }
}

impl DetectConfig {
    pub fn from_json_str(s: &str) -> Result<Self, CycleError> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| CycleError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CycleError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CycleError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), CycleError> {
        use crate::algs::communicator::{COLLECTIVE_TAG_BASE, CycleCommTags};
        // the run's tags must end below the collective range
        let end = u32::from(self.tag_base) + u32::from(CycleCommTags::SPAN);
        if end > u32::from(COLLECTIVE_TAG_BASE) {
            return Err(CycleError::Config(format!(
                "tag_base {:#x} leaves no room for {} tags below {:#x}",
                self.tag_base,
                CycleCommTags::SPAN,
                COLLECTIVE_TAG_BASE
            )));
        }
        Ok(())
    }
}
