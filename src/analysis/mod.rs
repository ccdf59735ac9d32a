//! State-space and structural analyses.
//!
//! [`analyze`] is the single entry point used by the binary: it validates the
//! net, builds the coverability tree and classifies the net structure.
//!
//! ```rust
//! use pn_cover::analysis::{CancellationToken, analyze};
//! use pn_cover::config::AnalysisConfig;
//! use pn_cover::net::{Net, Place, Transition};
//!
//! let mut net = Net::empty();
//! let p0 = net.add_place(Place::new("p0", 1));
//! let p1 = net.add_place(Place::new("p1", 0));
//! let t0 = net.add_transition(Transition::new("t0"));
//! let t1 = net.add_transition(Transition::new("t1"));
//! net.add_input_arc(p0, t0, 1);
//! net.add_output_arc(t0, p1, 1);
//! net.add_input_arc(p1, t1, 1);
//! net.add_output_arc(t1, p0, 1);
//!
//! let outcome = analyze(&net, &AnalysisConfig::default(), &CancellationToken::new()).unwrap();
//! assert!(outcome.classification.bounded);
//! assert!(outcome.classification.state_machine);
//! ```
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

pub mod boundness;
pub mod cancel;
pub mod classify;
pub mod coverability;
pub mod error;
pub mod omega;
pub mod registry;

pub use boundness::BoundnessResult;
pub use cancel::CancellationToken;
pub use classify::{NetClassifier, StructuralClasses};
pub use coverability::{
    CoverabilityTree, CoverabilityTreeBuilder, NodeId, NodeStatus, TreeNode, TreeStats,
};
pub use error::{AnalysisError, ResourceLimit};
pub use omega::{Acceleration, OmegaAccelerator};
pub use registry::{Registration, StateId, StateRegistry};

use crate::config::AnalysisConfig;
use crate::net::{IncidenceModel, Marking, Net, NetAdjacency};

/// Structural classes plus the verdicts read off the coverability tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationResult {
    pub state_machine: bool,
    pub marked_graph: bool,
    pub free_choice: bool,
    pub extended_free_choice: bool,
    pub simple: bool,
    pub extended_simple: bool,
    pub bounded: bool,
    pub safe: bool,
    pub has_deadlock: bool,
    /// Root-to-deadlock markings when `has_deadlock`.
    pub deadlock_path: Option<Vec<Marking>>,
}

impl ClassificationResult {
    pub fn new(classes: StructuralClasses, tree: &CoverabilityTree) -> Self {
        Self {
            state_machine: classes.state_machine,
            marked_graph: classes.marked_graph,
            free_choice: classes.free_choice,
            extended_free_choice: classes.extended_free_choice,
            simple: classes.simple,
            extended_simple: classes.extended_simple,
            bounded: tree.is_bounded(),
            safe: tree.is_safe(),
            has_deadlock: tree.has_deadlock(),
            deadlock_path: tree.shortest_path_to_deadlock().map(<[Marking]>::to_vec),
        }
    }

    pub fn structural_classes(&self) -> StructuralClasses {
        StructuralClasses {
            state_machine: self.state_machine,
            marked_graph: self.marked_graph,
            free_choice: self.free_choice,
            extended_free_choice: self.extended_free_choice,
            simple: self.simple,
            extended_simple: self.extended_simple,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub classification: ClassificationResult,
    pub boundness: BoundnessResult,
    pub tree: CoverabilityTree,
}

/// Runs the complete analysis of `net`.
///
/// Panics raised inside the analysis are caught here and reported as
/// [`AnalysisError::Internal`].
pub fn analyze(
    net: &Net,
    config: &AnalysisConfig,
    cancellation: &CancellationToken,
) -> Result<AnalysisOutcome, AnalysisError> {
    match panic::catch_unwind(AssertUnwindSafe(|| run_analysis(net, config, cancellation))) {
        Ok(Ok(outcome)) => Ok(outcome),
        Ok(Err(err)) => {
            log::error!("analysis of net '{}' failed: {}", net.name, err);
            Err(err)
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            log::error!("analysis of net '{}' panicked: {}", net.name, message);
            Err(AnalysisError::Internal(message))
        }
    }
}

fn run_analysis(
    net: &Net,
    config: &AnalysisConfig,
    cancellation: &CancellationToken,
) -> Result<AnalysisOutcome, AnalysisError> {
    let model = IncidenceModel::from_net(net)?;
    net.log_diagnostics();

    let tree = CoverabilityTreeBuilder::with_config(&model, config)
        .cancellation(cancellation)
        .build()?;

    let adjacency = NetAdjacency::from_net(net);
    let classes = NetClassifier::new(&adjacency).classify();
    log::debug!("structural classes of '{}': {:?}", net.name, classes);

    Ok(AnalysisOutcome {
        classification: ClassificationResult::new(classes, &tree),
        boundness: BoundnessResult::from_tree(&tree),
        tree,
    })
}
