//! Static net elements: places, transitions and arcs.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::ids::{PlaceId, TransitionId};

pub type Weight = u64;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Debug)]
pub struct Place {
    pub name: String,
    /// Tokens held in the initial marking.
    #[serde(default)]
    pub tokens: Weight,
}

impl Place {
    pub fn new(name: impl Into<String>, tokens: Weight) -> Self {
        Self {
            name: name.into(),
            tokens,
        }
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Transition {
    pub name: String,
}

impl Transition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.name).finish()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcDirection {
    PlaceToTransition,
    TransitionToPlace,
}

/// Arc semantics.
///
/// * `Normal`: consumes (`PlaceToTransition`) or produces (`TransitionToPlace`)
///   `weight` tokens.
/// * `Inhibition`: the transition is blocked while the place is non-empty.
/// * `Reset`: firing the transition empties the place.
/// * `Reader`: the place must hold `weight` tokens, none are consumed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ArcKind {
    #[default]
    Normal,
    Inhibition,
    Reset,
    Reader,
}

impl ArcKind {
    /// Only normal arcs may point from a transition to a place.
    pub fn allows(self, direction: ArcDirection) -> bool {
        matches!(
            (self, direction),
            (ArcKind::Normal, _) | (_, ArcDirection::PlaceToTransition)
        )
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Arc {
    pub place: PlaceId,
    pub transition: TransitionId,
    pub direction: ArcDirection,
    #[serde(default)]
    pub kind: ArcKind,
    #[serde(default = "default_weight")]
    pub weight: Weight,
}

fn default_weight() -> Weight {
    1
}

impl Arc {
    pub fn new(
        place: PlaceId,
        transition: TransitionId,
        direction: ArcDirection,
        kind: ArcKind,
        weight: Weight,
    ) -> Self {
        Self {
            place,
            transition,
            direction,
            kind,
            weight,
        }
    }

    pub fn input(place: PlaceId, transition: TransitionId, weight: Weight) -> Self {
        Self::new(
            place,
            transition,
            ArcDirection::PlaceToTransition,
            ArcKind::Normal,
            weight,
        )
    }

    pub fn output(transition: TransitionId, place: PlaceId, weight: Weight) -> Self {
        Self::new(
            place,
            transition,
            ArcDirection::TransitionToPlace,
            ArcKind::Normal,
            weight,
        )
    }

    pub fn is_flow(&self) -> bool {
        self.kind == ArcKind::Normal
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (from, to) = match self.direction {
            ArcDirection::PlaceToTransition => (self.place.to_string(), self.transition.to_string()),
            ArcDirection::TransitionToPlace => (self.transition.to_string(), self.place.to_string()),
        };
        write!(f, "Arc({from} -> {to}, {:?}, w={})", self.kind, self.weight)
    }
}
