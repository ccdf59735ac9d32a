//! Presets and postsets of every node, restricted to normal flow arcs.
use std::collections::BTreeSet;

use crate::net::core::Net;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::IncidenceModel;
use crate::net::index_vec::IndexVec;
use crate::net::structure::ArcDirection;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NetAdjacency {
    /// `•p`: transitions producing into `p`.
    place_pre: IndexVec<PlaceId, BTreeSet<TransitionId>>,
    /// `p•`: transitions consuming from `p`.
    place_post: IndexVec<PlaceId, BTreeSet<TransitionId>>,
    /// `•t`: input places of `t`.
    transition_pre: IndexVec<TransitionId, BTreeSet<PlaceId>>,
    /// `t•`: output places of `t`.
    transition_post: IndexVec<TransitionId, BTreeSet<PlaceId>>,
}

impl NetAdjacency {
    fn with_shape(places: usize, transitions: usize) -> Self {
        Self {
            place_pre: IndexVec::from_elem(BTreeSet::new(), places),
            place_post: IndexVec::from_elem(BTreeSet::new(), places),
            transition_pre: IndexVec::from_elem(BTreeSet::new(), transitions),
            transition_post: IndexVec::from_elem(BTreeSet::new(), transitions),
        }
    }

    fn connect(&mut self, place: PlaceId, transition: TransitionId, direction: ArcDirection) {
        match direction {
            ArcDirection::PlaceToTransition => {
                self.place_post[place].insert(transition);
                self.transition_pre[transition].insert(place);
            }
            ArcDirection::TransitionToPlace => {
                self.place_pre[place].insert(transition);
                self.transition_post[transition].insert(place);
            }
        }
    }

    /// Inhibition, reset and reader arcs are not part of the flow relation
    /// and are ignored. Arcs naming unknown nodes are skipped.
    pub fn from_net(net: &Net) -> Self {
        let mut adjacency = Self::with_shape(net.places_len(), net.transitions_len());
        for arc in net.arcs.iter().filter(|arc| arc.is_flow()) {
            if net.places.contains_index(arc.place) && net.transitions.contains_index(arc.transition)
            {
                adjacency.connect(arc.place, arc.transition, arc.direction);
            }
        }
        adjacency
    }

    /// Same relation, read off the non-zero entries of `backward` and `forward`.
    pub fn from_incidence(model: &IncidenceModel) -> Self {
        let mut adjacency = Self::with_shape(model.place_count(), model.transition_count());
        for place in model.places() {
            for transition in model.transitions() {
                if *model.backward().get(place, transition) != 0 {
                    adjacency.connect(place, transition, ArcDirection::PlaceToTransition);
                }
                if *model.forward().get(place, transition) != 0 {
                    adjacency.connect(place, transition, ArcDirection::TransitionToPlace);
                }
            }
        }
        adjacency
    }

    pub fn place_count(&self) -> usize {
        self.place_pre.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transition_pre.len()
    }

    pub fn places(&self) -> impl Iterator<Item = PlaceId> + Clone + use<> {
        self.place_pre.indices()
    }

    pub fn transitions(&self) -> impl Iterator<Item = TransitionId> + use<> {
        self.transition_pre.indices()
    }

    pub fn place_preset(&self, place: PlaceId) -> &BTreeSet<TransitionId> {
        &self.place_pre[place]
    }

    pub fn place_postset(&self, place: PlaceId) -> &BTreeSet<TransitionId> {
        &self.place_post[place]
    }

    pub fn transition_preset(&self, transition: TransitionId) -> &BTreeSet<PlaceId> {
        &self.transition_pre[transition]
    }

    pub fn transition_postset(&self, transition: TransitionId) -> &BTreeSet<PlaceId> {
        &self.transition_post[transition]
    }
}
