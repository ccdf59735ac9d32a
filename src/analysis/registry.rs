//! Distinct markings seen during one exploration, in discovery order.
use std::collections::hash_map::Entry;

use rustc_hash::FxHashMap;

use crate::net::ids::define_id;
use crate::net::index_vec::IndexVec;
use crate::net::marking::Marking;

define_id!(StateId, "S");

/// Outcome of [`StateRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New(StateId),
    Known(StateId),
}

impl Registration {
    pub fn state(self) -> StateId {
        match self {
            Registration::New(id) | Registration::Known(id) => id,
        }
    }

    pub fn is_new(self) -> bool {
        matches!(self, Registration::New(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    index: FxHashMap<Marking, StateId>,
    states: IndexVec<StateId, Marking>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `marking` unless an equal one (ω included) is already known.
    pub fn register(&mut self, marking: &Marking) -> Registration {
        match self.index.entry(marking.clone()) {
            Entry::Occupied(entry) => Registration::Known(*entry.get()),
            Entry::Vacant(entry) => {
                let id = self.states.push(marking.clone());
                entry.insert(id);
                Registration::New(id)
            }
        }
    }

    pub fn lookup(&self, marking: &Marking) -> Option<StateId> {
        self.index.get(marking).copied()
    }

    pub fn contains(&self, marking: &Marking) -> bool {
        self.index.contains_key(marking)
    }

    pub fn marking(&self, state: StateId) -> Option<&Marking> {
        self.states.get(state)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn markings(&self) -> &[Marking] {
        self.states.as_slice()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, &Marking)> {
        self.states.iter_enumerated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::marking::Tokens;

    #[test]
    fn equal_markings_share_a_state() {
        let mut registry = StateRegistry::new();
        let root = Marking::from_counts([1, 0]);
        let omega = Marking::from(vec![Tokens::Omega, Tokens::ZERO]);

        assert_eq!(registry.register(&root), Registration::New(StateId::new(0)));
        assert_eq!(registry.register(&omega), Registration::New(StateId::new(1)));
        let again = registry.register(&Marking::from_counts([1, 0]));
        assert!(!again.is_new());
        assert_eq!(again.state(), StateId::new(0));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.markings(), &[root, omega.clone()]);
        assert_eq!(registry.lookup(&omega), Some(StateId::new(1)));
        assert_eq!(registry.marking(StateId::new(1)), Some(&omega));
        assert_eq!(StateId::new(1).to_string(), "S1");
    }
}
