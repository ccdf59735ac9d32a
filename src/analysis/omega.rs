//! Karp–Miller acceleration.
//!
//! A fresh marking `M` is compared with every ancestor `A` from its parent up
//! to the root. When `M` covers `A` on all finite places, each place where
//! `M` is strictly larger grows without bound along the repeated firing
//! sequence and is replaced by ω, unless an inhibitor arc still caps it.
use crate::net::ids::PlaceId;
use crate::net::incidence::IncidenceModel;
use crate::net::marking::{Marking, Tokens};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acceleration {
    pub marking: Marking,
    /// Places turned into ω by this call, in insertion order.
    pub inserted: Vec<PlaceId>,
}

impl Acceleration {
    pub fn accelerated(&self) -> bool {
        !self.inserted.is_empty()
    }

    pub fn all_omega(&self) -> bool {
        self.marking.is_all_omega()
    }
}

#[derive(Clone, Copy)]
pub struct OmegaAccelerator<'a> {
    model: &'a IncidenceModel,
}

impl<'a> OmegaAccelerator<'a> {
    pub fn new(model: &'a IncidenceModel) -> Self {
        Self { model }
    }

    /// `ancestors` must yield the parent first and end with the root.
    /// The input marking is not modified.
    pub fn accelerate<'m, I>(&self, marking: &Marking, ancestors: I) -> Acceleration
    where
        I: IntoIterator<Item = &'m Marking>,
    {
        let mut current = marking.clone();
        let mut inserted = Vec::new();

        for ancestor in ancestors {
            if current.is_all_omega() {
                break;
            }
            if !covers_finite_places(&current, ancestor) {
                continue;
            }
            for place in self.model.places() {
                let tokens = current.tokens(place);
                let Tokens::Finite(count) = tokens else {
                    continue;
                };
                if tokens <= ancestor.tokens(place) || self.capped_by_inhibition(place, count) {
                    continue;
                }
                *current.tokens_mut(place) = Tokens::Omega;
                inserted.push(place);
            }
        }

        Acceleration {
            marking: current,
            inserted,
        }
    }

    /// A place is capped while some inhibitor arc from it has a weight of at
    /// least its current count.
    fn capped_by_inhibition(&self, place: PlaceId, count: u64) -> bool {
        self.model.has_inhibition_arcs() && self.model.inhibition_caps(place).any(|cap| count <= cap)
    }
}

/// `marking[p] >= ancestor[p]` for every place where `marking` is finite.
fn covers_finite_places(marking: &Marking, ancestor: &Marking) -> bool {
    marking
        .iter()
        .filter(|(_, tokens)| !tokens.is_omega())
        .all(|(place, tokens)| tokens >= ancestor.tokens(place))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::core::Net;
    use crate::net::structure::{Place, Transition};

    fn p(idx: u32) -> PlaceId {
        PlaceId::new(idx)
    }

    fn model(places: usize, inhibitors: &[(u32, u64)]) -> IncidenceModel {
        let mut net = Net::empty();
        for i in 0..places {
            net.add_place(Place::new(format!("p{i}"), 0));
        }
        let t0 = net.add_transition(Transition::new("t0"));
        for (place, weight) in inhibitors {
            net.add_inhibitor_arc(p(*place), t0, *weight);
        }
        IncidenceModel::from_net(&net).unwrap()
    }

    #[test]
    fn strictly_larger_places_become_omega() {
        let model = model(3, &[]);
        let root = Marking::from_counts([1, 0, 0]);
        let child = Marking::from_counts([1, 1, 0]);
        let result = OmegaAccelerator::new(&model).accelerate(&child, [&root]);

        assert_eq!(result.inserted, vec![p(1)]);
        assert_eq!(
            result.marking,
            Marking::from(vec![Tokens::Finite(1), Tokens::Omega, Tokens::ZERO])
        );
        assert!(!result.all_omega());
        assert_eq!(child, Marking::from_counts([1, 1, 0]));
    }

    #[test]
    fn incomparable_ancestors_are_skipped() {
        let model = model(2, &[]);
        let parent = Marking::from_counts([0, 2]);
        let root = Marking::from_counts([1, 0]);
        let child = Marking::from_counts([0, 3]);
        let result = OmegaAccelerator::new(&model).accelerate(&child, [&parent, &root]);
        assert_eq!(result.inserted, vec![p(1)]);

        let unrelated = Marking::from_counts([2, 0]);
        let result = OmegaAccelerator::new(&model).accelerate(&unrelated, [&parent]);
        assert!(!result.accelerated());
    }

    #[test]
    fn omega_in_ancestor_needs_omega_in_node() {
        let model = model(2, &[]);
        let ancestor = Marking::from(vec![Tokens::Omega, Tokens::ZERO]);
        let child = Marking::from_counts([5, 1]);
        let result = OmegaAccelerator::new(&model).accelerate(&child, [&ancestor]);
        assert!(!result.accelerated());

        let omega_child = Marking::from(vec![Tokens::Omega, Tokens::Finite(1)]);
        let result = OmegaAccelerator::new(&model).accelerate(&omega_child, [&ancestor]);
        assert_eq!(result.inserted, vec![p(1)]);
        assert!(result.all_omega());
    }

    #[test]
    fn inhibitor_weight_caps_growth() {
        let model = model(2, &[(1, 3)]);
        let root = Marking::from_counts([0, 0]);
        let accelerator = OmegaAccelerator::new(&model);

        let capped = accelerator.accelerate(&Marking::from_counts([1, 3]), [&root]);
        assert_eq!(capped.inserted, vec![p(0)]);

        let past_cap = accelerator.accelerate(&Marking::from_counts([0, 4]), [&root]);
        assert_eq!(past_cap.inserted, vec![p(1)]);
    }

    #[test]
    fn walk_continues_after_first_insertion() {
        let model = model(2, &[]);
        let parent = Marking::from_counts([1, 0]);
        let root = Marking::from_counts([0, 0]);
        let child = Marking::from_counts([1, 1]);
        let result = OmegaAccelerator::new(&model).accelerate(&child, [&parent, &root]);
        assert_eq!(result.inserted, vec![p(1), p(0)]);
        assert!(result.all_omega());
    }
}
