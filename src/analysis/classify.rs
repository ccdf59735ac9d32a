//! Structural net classes.
//!
//! All predicates read the flow relation only (see [`NetAdjacency`]) and
//! never look at markings. For a transition `t`, `•t` is its set of input
//! places; for a place `p`, `p•` is its set of output transitions.
use std::collections::BTreeSet;

use itertools::Itertools;
use serde::Serialize;

use crate::net::adjacency::NetAdjacency;
use crate::net::ids::PlaceId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct StructuralClasses {
    pub state_machine: bool,
    pub marked_graph: bool,
    pub free_choice: bool,
    pub extended_free_choice: bool,
    pub simple: bool,
    pub extended_simple: bool,
}

#[derive(Clone, Copy)]
pub struct NetClassifier<'a> {
    adjacency: &'a NetAdjacency,
}

impl<'a> NetClassifier<'a> {
    pub fn new(adjacency: &'a NetAdjacency) -> Self {
        Self { adjacency }
    }

    pub fn classify(&self) -> StructuralClasses {
        StructuralClasses {
            state_machine: self.is_state_machine(),
            marked_graph: self.is_marked_graph(),
            free_choice: self.is_free_choice(),
            extended_free_choice: self.is_extended_free_choice(),
            simple: self.is_simple(),
            extended_simple: self.is_extended_simple(),
        }
    }

    /// `|•t| <= 1` and `|t•| <= 1` for every transition.
    pub fn is_state_machine(&self) -> bool {
        self.adjacency.transitions().all(|t| {
            self.adjacency.transition_preset(t).len() <= 1
                && self.adjacency.transition_postset(t).len() <= 1
        })
    }

    /// `|•p| <= 1` and `|p•| <= 1` for every place.
    pub fn is_marked_graph(&self) -> bool {
        self.adjacency.places().all(|p| {
            self.adjacency.place_preset(p).len() <= 1 && self.adjacency.place_postset(p).len() <= 1
        })
    }

    /// Every input place of a synchronizing transition has that transition
    /// as its only output.
    pub fn is_free_choice(&self) -> bool {
        self.synchronizing_presets()
            .all(|preset| preset.iter().all(|p| self.adjacency.place_postset(*p).len() <= 1))
    }

    /// Input places of a synchronizing transition share one postset.
    pub fn is_extended_free_choice(&self) -> bool {
        self.synchronizing_presets().all(|preset| {
            preset
                .iter()
                .map(|p| self.adjacency.place_postset(*p))
                .all_equal()
        })
    }

    /// Two places with a common output transition never both have more
    /// than one output.
    pub fn is_simple(&self) -> bool {
        self.adjacency
            .places()
            .array_combinations::<2>()
            .filter(|[a, b]| self.postsets_intersect(*a, *b))
            .all(|[a, b]| {
                self.adjacency.place_postset(a).len() <= 1
                    || self.adjacency.place_postset(b).len() <= 1
            })
    }

    /// Postsets of the input places of a synchronizing transition are
    /// totally ordered by inclusion.
    pub fn is_extended_simple(&self) -> bool {
        self.synchronizing_presets().all(|preset| {
            preset
                .iter()
                .map(|p| self.adjacency.place_postset(*p))
                .array_combinations::<2>()
                .all(|[a, b]| a.is_subset(b) || b.is_subset(a))
        })
    }

    /// `•t` for every transition with more than one input place.
    fn synchronizing_presets(&self) -> impl Iterator<Item = &'a BTreeSet<PlaceId>> + 'a {
        let adjacency = self.adjacency;
        adjacency
            .transitions()
            .map(move |t| adjacency.transition_preset(t))
            .filter(|preset| preset.len() > 1)
    }

    fn postsets_intersect(&self, a: PlaceId, b: PlaceId) -> bool {
        !self
            .adjacency
            .place_postset(a)
            .is_disjoint(self.adjacency.place_postset(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{IncidenceModel, Net, Place, Transition, TransitionId};

    fn classes(net: &Net) -> StructuralClasses {
        let from_arcs = NetClassifier::new(&NetAdjacency::from_net(net)).classify();
        let model = IncidenceModel::from_net(net).unwrap();
        let from_matrices = NetClassifier::new(&NetAdjacency::from_incidence(&model)).classify();
        assert_eq!(from_arcs, from_matrices);
        from_arcs
    }

    fn net_with(places: usize, transitions: usize) -> Net {
        let mut net = Net::empty();
        for i in 0..places {
            net.add_place(Place::new(format!("p{i}"), 0));
        }
        for i in 0..transitions {
            net.add_transition(Transition::new(format!("t{i}")));
        }
        net
    }

    fn p(idx: u32) -> PlaceId {
        PlaceId::new(idx)
    }

    fn t(idx: u32) -> TransitionId {
        TransitionId::new(idx)
    }

    #[test]
    fn cycle_is_state_machine_and_marked_graph() {
        let mut net = net_with(2, 2);
        net.add_input_arc(p(0), t(0), 1);
        net.add_output_arc(t(0), p(1), 1);
        net.add_input_arc(p(1), t(1), 1);
        net.add_output_arc(t(1), p(0), 1);

        let result = classes(&net);
        assert_eq!(
            result,
            StructuralClasses {
                state_machine: true,
                marked_graph: true,
                free_choice: true,
                extended_free_choice: true,
                simple: true,
                extended_simple: true,
            }
        );
    }

    #[test]
    fn asymmetric_confusion_is_not_free_choice() {
        // t0 synchronizes p0 and p1; p1 also feeds t1.
        let mut net = net_with(2, 2);
        net.add_input_arc(p(0), t(0), 1);
        net.add_input_arc(p(1), t(0), 1);
        net.add_input_arc(p(1), t(1), 1);

        let result = classes(&net);
        assert!(!result.free_choice);
        assert!(!result.extended_free_choice);
        assert!(!result.state_machine);
        assert!(result.simple);
        assert!(result.extended_simple);
    }

    #[test]
    fn equal_postsets_are_extended_free_choice() {
        let mut net = net_with(2, 2);
        for place in [p(0), p(1)] {
            for transition in [t(0), t(1)] {
                net.add_input_arc(place, transition, 1);
            }
        }

        let result = classes(&net);
        assert!(!result.free_choice);
        assert!(result.extended_free_choice);
        assert!(!result.simple);
        assert!(result.extended_simple);
    }

    #[test]
    fn crossing_postsets_are_not_extended_simple() {
        // •t1 = {p0, p1} with p0• = {t0, t1} and p1• = {t1, t2}.
        let mut net = net_with(2, 3);
        net.add_input_arc(p(0), t(0), 1);
        net.add_input_arc(p(0), t(1), 1);
        net.add_input_arc(p(1), t(1), 1);
        net.add_input_arc(p(1), t(2), 1);

        let result = classes(&net);
        assert!(!result.simple);
        assert!(!result.extended_simple);
        assert!(!result.extended_free_choice);
    }

    #[test]
    fn fork_is_state_machine_only_without_join() {
        let mut net = net_with(3, 1);
        net.add_input_arc(p(0), t(0), 1);
        net.add_output_arc(t(0), p(1), 1);
        net.add_output_arc(t(0), p(2), 1);

        let result = classes(&net);
        assert!(!result.state_machine);
        assert!(result.marked_graph);
        assert!(result.free_choice);
    }

    #[test]
    fn extended_arcs_do_not_count() {
        let mut net = net_with(2, 1);
        net.add_input_arc(p(0), t(0), 1);
        net.add_inhibitor_arc(p(1), t(0), 1);
        net.add_reader_arc(p(1), t(0), 1);
        assert!(classes(&net).state_machine);
    }

    #[test]
    fn empty_net_is_in_every_class() {
        let result = classes(&Net::empty());
        assert!(result.state_machine && result.marked_graph && result.free_choice);
        assert!(result.extended_free_choice && result.simple && result.extended_simple);
    }
}
