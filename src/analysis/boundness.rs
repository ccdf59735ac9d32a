//! Boundedness verdict read off a finished coverability tree.
use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::analysis::coverability::CoverabilityTree;
use crate::net::ids::{PlaceId, TransitionId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BoundnessResult {
    Bounded,
    Unbounded {
        /// Places that hold ω in at least one node, ascending.
        unbounded_places: Vec<PlaceId>,
        /// Transitions from the initial marking to the first node holding ω.
        witness_sequence: Vec<TransitionId>,
    },
}

impl BoundnessResult {
    pub fn from_tree(tree: &CoverabilityTree) -> Self {
        if tree.is_bounded() {
            return BoundnessResult::Bounded;
        }

        let unbounded_places: BTreeSet<PlaceId> = tree
            .nodes()
            .iter()
            .flat_map(|node| node.marking.omega_places())
            .collect();
        let witness_sequence = tree
            .nodes()
            .iter()
            .find(|node| node.marking.has_omega())
            .map(|node| tree.firing_sequence(node.id))
            .unwrap_or_default();

        BoundnessResult::Unbounded {
            unbounded_places: unbounded_places.into_iter().collect(),
            witness_sequence,
        }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, BoundnessResult::Bounded)
    }

    pub fn is_place_bounded(&self, place: PlaceId) -> bool {
        match self {
            BoundnessResult::Bounded => true,
            BoundnessResult::Unbounded {
                unbounded_places, ..
            } => !unbounded_places.contains(&place),
        }
    }
}

impl fmt::Display for BoundnessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundnessResult::Bounded => write!(f, "bounded"),
            BoundnessResult::Unbounded {
                unbounded_places,
                witness_sequence,
            } => {
                write!(f, "unbounded, unbounded places: {:?}", unbounded_places)?;
                if !witness_sequence.is_empty() {
                    write!(f, ", witness: {:?}", witness_sequence)?;
                }
                Ok(())
            }
        }
    }
}
