//! Enabling rule and firing rule over an [`IncidenceModel`].
//!
//! A transition `t` is enabled under `M` iff for every place `p`:
//!
//! 1. `backward[p][t] <= M[p]`,
//! 2. `reader[p][t] <= M[p]` when the net has reader arcs,
//! 3. `M[p] == 0` whenever `inhibition[p][t] != 0`.
//!
//! Firing yields `M'[p] = M[p] + combined[p][t]`, then every place with a
//! reset arc to `t` is emptied, ω included.
use std::fmt;

use thiserror::Error;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::IncidenceModel;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::marking::{Marking, Tokens};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FireError {
    #[error("transition {0} is out of bounds")]
    OutOfBounds(TransitionId),
    #[error("marking has {found} places, the net has {expected}")]
    MarkingLength { expected: usize, found: usize },
    #[error("firing {transition} would leave a negative count in {place}")]
    NegativeTokens {
        transition: TransitionId,
        place: PlaceId,
    },
    #[error("firing {transition} would push the count in {place} past {max}", max = u64::MAX)]
    Overflow {
        transition: TransitionId,
        place: PlaceId,
    },
}

/// Enabled-transition bit vector, one flag per transition.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EnabledSet(IndexVec<TransitionId, bool>);

impl EnabledSet {
    pub fn contains(&self, transition: TransitionId) -> bool {
        self.0.get(transition).copied().unwrap_or(false)
    }

    /// `true` when no transition is enabled, i.e. the marking is dead.
    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|enabled| *enabled)
    }

    pub fn count(&self) -> usize {
        self.0.iter().filter(|enabled| **enabled).count()
    }

    /// Enabled transitions in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = TransitionId> + '_ {
        self.0
            .iter_enumerated()
            .filter(|(_, enabled)| **enabled)
            .map(|(transition, _)| transition)
    }

    pub fn as_bits(&self) -> &[bool] {
        self.0.as_slice()
    }
}

impl fmt::Debug for EnabledSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Clone, Copy)]
pub struct EnablementEvaluator<'a> {
    model: &'a IncidenceModel,
}

impl<'a> EnablementEvaluator<'a> {
    pub fn new(model: &'a IncidenceModel) -> Self {
        Self { model }
    }

    pub fn enabled(&self, marking: &Marking) -> EnabledSet {
        EnabledSet(
            self.model
                .transitions()
                .map(|transition| self.is_enabled(transition, marking))
                .collect(),
        )
    }

    pub fn is_enabled(&self, transition: TransitionId, marking: &Marking) -> bool {
        if transition.index() >= self.model.transition_count()
            || marking.len() != self.model.place_count()
        {
            return false;
        }

        let sufficient = self
            .model
            .backward()
            .column(transition)
            .all(|(place, weight)| marking.tokens(place).covers(*weight));
        if !sufficient {
            return false;
        }

        if self.model.has_reader_arcs() {
            if let Some(reader) = self.model.reader() {
                let readable = reader
                    .column(transition)
                    .all(|(place, weight)| marking.tokens(place).covers(*weight));
                if !readable {
                    return false;
                }
            }
        }

        if self.model.has_inhibition_arcs() {
            if let Some(inhibition) = self.model.inhibition() {
                // Any non-empty inhibiting place blocks, whatever the arc weight.
                let inhibited = inhibition
                    .column(transition)
                    .any(|(place, weight)| *weight != 0 && !marking.tokens(place).is_zero());
                if inhibited {
                    return false;
                }
            }
        }

        true
    }
}

#[derive(Clone, Copy)]
pub struct FiringEngine<'a> {
    model: &'a IncidenceModel,
}

impl<'a> FiringEngine<'a> {
    pub fn new(model: &'a IncidenceModel) -> Self {
        Self { model }
    }

    /// Returns the successor marking; `marking` itself is left untouched.
    ///
    /// Enabledness is not checked here, but a disabled transition that would
    /// drive a finite count below zero is reported as
    /// [`FireError::NegativeTokens`]. A count that would not fit in a `u64`
    /// is [`FireError::Overflow`].
    pub fn fire(&self, transition: TransitionId, marking: &Marking) -> Result<Marking, FireError> {
        if transition.index() >= self.model.transition_count() {
            return Err(FireError::OutOfBounds(transition));
        }
        if marking.len() != self.model.place_count() {
            return Err(FireError::MarkingLength {
                expected: self.model.place_count(),
                found: marking.len(),
            });
        }

        let mut next = marking.clone();
        for (place, delta) in self.model.combined().column(transition) {
            let tokens = next.tokens_mut(place);
            *tokens = tokens.checked_add_signed(*delta).ok_or(if *delta < 0 {
                FireError::NegativeTokens { transition, place }
            } else {
                FireError::Overflow { transition, place }
            })?;
        }

        if self.model.has_reset_arcs() {
            if let Some(reset) = self.model.reset() {
                for (place, weight) in reset.column(transition) {
                    if *weight != 0 {
                        *next.tokens_mut(place) = Tokens::ZERO;
                    }
                }
            }
        }

        Ok(next)
    }
}
