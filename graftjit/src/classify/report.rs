use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::program::{RegionId, RegionKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    GraphNative,
    Fallback { reason: String },
}

impl Classification {
    pub fn fallback(reason: impl Into<String>) -> Self {
        Classification::Fallback {
            reason: reason.into(),
        }
    }

    pub fn is_graph_native(&self) -> bool {
        matches!(self, Classification::GraphNative)
    }

    pub fn is_fallback(&self) -> bool {
        !self.is_graph_native()
    }

    /// Combine two verdicts for the same region. Fallback wins; the first
    /// recorded reason is kept.
    pub fn merge(self, other: Classification) -> Classification {
        match (self, other) {
            (Classification::GraphNative, other) => other,
            (fallback, _) => fallback,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::GraphNative => f.write_str("graph-native"),
            Classification::Fallback { reason } => write!(f, "fallback ({})", reason),
        }
    }
}

/// Lifecycle of a region within one compiled artifact. A region is
/// classifying only while the trace pass runs; afterwards it either has
/// a verdict or was never reached. Invalidating the artifact resets every
/// region at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    Untraced,
    GraphNativeCompiled,
    FallbackReEvaluatedEachCall,
}

/// Verdict for one control-flow region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionClass {
    pub kind: RegionKind,
    /// Names read by the region's condition or loop bounds.
    pub deps: BTreeSet<String>,
    pub classification: Classification,
}

/// Verdict for one top-level statement of the function body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StmtPlan {
    pub index: usize,
    pub region: Option<RegionId>,
    pub kind: RegionKind,
    pub classification: Classification,
    /// The statement starts a fallback that runs to the end of the body.
    pub tail: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub top_level: Vec<StmtPlan>,
    pub regions: BTreeMap<RegionId, RegionClass>,
}

impl ClassificationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(&self, region: RegionId) -> Option<&Classification> {
        self.regions.get(&region).map(|class| &class.classification)
    }

    pub fn state(&self, region: RegionId) -> RegionState {
        match self.region(region) {
            None => RegionState::Untraced,
            Some(Classification::GraphNative) => RegionState::GraphNativeCompiled,
            Some(Classification::Fallback { .. }) => RegionState::FallbackReEvaluatedEachCall,
        }
    }

    /// Top-level statements that run through the interpreter.
    pub fn fallback_statements(&self) -> usize {
        self.top_level
            .iter()
            .filter(|plan| plan.classification.is_fallback())
            .count()
    }

    pub fn is_fully_graph_native(&self) -> bool {
        self.top_level
            .iter()
            .all(|plan| plan.classification.is_graph_native())
    }

    pub(crate) fn record_region(
        &mut self,
        region: RegionId,
        kind: RegionKind,
        deps: BTreeSet<String>,
        classification: Classification,
    ) {
        match self.regions.get_mut(&region) {
            Some(existing) => {
                let merged = std::mem::replace(&mut existing.classification, Classification::GraphNative)
                    .merge(classification);
                existing.classification = merged;
            }
            None => {
                self.regions.insert(
                    region,
                    RegionClass {
                        kind,
                        deps,
                        classification,
                    },
                );
            }
        }
    }

    pub(crate) fn forget_regions(&mut self, regions: &[RegionId]) {
        for region in regions {
            self.regions.remove(region);
        }
    }
}
