use std::fmt;

use thiserror::Error;

use crate::net::{FireError, MalformedNetError};

/// The ceiling that stopped an exploration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimit {
    Nodes(usize),
    MemoryMb(u64),
}

impl fmt::Display for ResourceLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLimit::Nodes(limit) => write!(f, "node limit {limit}"),
            ResourceLimit::MemoryMb(limit) => write!(f, "memory limit {limit} MB"),
        }
    }
}

/// Everything that can abort an analysis run. Partial trees are never
/// returned alongside an error.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("malformed net: {0}")]
    MalformedNet(#[from] MalformedNetError),
    #[error("net too large, increase resources or add a ceiling ({limit} reached after {explored} nodes)")]
    StateSpaceTooLarge { explored: usize, limit: ResourceLimit },
    #[error("too many reachable states along one branch (depth {depth} exceeds {limit})")]
    StateSpaceTooDeep { depth: usize, limit: usize },
    #[error("analysis cancelled after {explored} nodes")]
    Cancelled { explored: usize },
    #[error("firing failed: {0}")]
    Fire(#[from] FireError),
    #[error("internal analysis failure: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// `true` for the errors caused by the size of the state space.
    pub fn is_resource_exhaustion(&self) -> bool {
        matches!(
            self,
            AnalysisError::StateSpaceTooLarge { .. } | AnalysisError::StateSpaceTooDeep { .. }
        )
    }
}
