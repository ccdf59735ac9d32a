//! Place × transition matrices derived from the arc list.
//!
//! Rows are places, columns are transitions. For a transition `t`:
//!
//! * `forward[p][t]`: tokens produced in `p`,
//! * `backward[p][t]`: tokens required and consumed from `p`,
//! * `combined = forward - backward`: the net effect used by firing,
//! * `inhibition`, `reset`, `reader`: weights of the extended arcs.
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::net::core::Net;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::marking::Marking;
use crate::net::structure::{ArcDirection, ArcKind, Weight};

type SmallRow<T> = SmallVec<[T; 4]>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedNetError {
    #[error(
        "{matrix} matrix is {places}x{transitions}, expected {expected_places}x{expected_transitions}"
    )]
    DimensionMismatch {
        matrix: &'static str,
        places: usize,
        transitions: usize,
        expected_places: usize,
        expected_transitions: usize,
    },
    #[error("initial marking has {found} entries, the net has {expected} places")]
    MarkingLength { expected: usize, found: usize },
    #[error("arc #{arc} refers to unknown place {place}")]
    UnknownPlace { arc: usize, place: PlaceId },
    #[error("arc #{arc} refers to unknown transition {transition}")]
    UnknownTransition { arc: usize, transition: TransitionId },
    #[error("arc #{arc}: {kind:?} arcs must go from a place to a transition")]
    MisdirectedArc { arc: usize, kind: ArcKind },
    #[error("arc #{arc} has weight 0")]
    ZeroWeight { arc: usize },
}

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Incidence<T> {
    rows: IndexVec<PlaceId, SmallRow<T>>,
    cols: usize,
}

impl<T: Clone> Incidence<T> {
    pub fn new(places: usize, transitions: usize, default: T) -> Self {
        let rows = (0..places)
            .map(|_| SmallRow::from_elem(default.clone(), transitions))
            .collect();
        Self {
            rows,
            cols: transitions,
        }
    }

    /// Builds a matrix from raw row-major data, rejecting any row or row count
    /// that does not match `places × transitions`.
    pub fn try_from_rows(
        matrix: &'static str,
        rows: Vec<Vec<T>>,
        places: usize,
        transitions: usize,
    ) -> Result<Self, MalformedNetError> {
        let mismatch = |found_places, found_transitions| MalformedNetError::DimensionMismatch {
            matrix,
            places: found_places,
            transitions: found_transitions,
            expected_places: places,
            expected_transitions: transitions,
        };
        if rows.len() != places {
            let width = rows.first().map_or(transitions, Vec::len);
            return Err(mismatch(rows.len(), width));
        }
        if let Some(row) = rows.iter().find(|row| row.len() != transitions) {
            return Err(mismatch(rows.len(), row.len()));
        }
        Ok(Self {
            rows: rows.into_iter().map(SmallRow::from_vec).collect(),
            cols: transitions,
        })
    }

    pub fn places(&self) -> usize {
        self.rows.len()
    }

    pub fn transitions(&self) -> usize {
        self.cols
    }

    pub fn get(&self, place: PlaceId, transition: TransitionId) -> &T {
        &self.rows[place][transition.index()]
    }

    pub fn get_mut(&mut self, place: PlaceId, transition: TransitionId) -> &mut T {
        &mut self.rows[place][transition.index()]
    }

    pub fn set(&mut self, place: PlaceId, transition: TransitionId, value: T) {
        self.rows[place][transition.index()] = value;
    }

    pub fn rows(&self) -> &IndexVec<PlaceId, SmallRow<T>> {
        &self.rows
    }

    /// Entries of one transition's column, top to bottom.
    pub fn column(&self, transition: TransitionId) -> impl Iterator<Item = (PlaceId, &T)> {
        self.rows
            .iter_enumerated()
            .map(move |(place, row)| (place, &row[transition.index()]))
    }

    pub fn map<U: Clone, F: FnMut(&T) -> U>(&self, mut f: F) -> Incidence<U> {
        Incidence {
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(&mut f).collect::<SmallRow<_>>())
                .collect(),
            cols: self.cols,
        }
    }
}

impl<T: Copy + Default + PartialEq> Incidence<T> {
    pub fn is_nonzero(&self) -> bool {
        let zero = T::default();
        self.rows.iter().flatten().any(|value| *value != zero)
    }
}

impl<T: fmt::Debug> fmt::Debug for Incidence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incidence")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl Incidence<Weight> {
    /// `self - other`, widened so that any pair of `u64` weights fits.
    pub fn difference(&self, other: &Self) -> Incidence<i128> {
        debug_assert_eq!(self.places(), other.places());
        debug_assert_eq!(self.transitions(), other.transitions());
        Incidence {
            rows: self
                .rows
                .iter()
                .zip(other.rows.iter())
                .map(|(left, right)| {
                    left.iter()
                        .zip(right.iter())
                        .map(|(l, r)| i128::from(*l) - i128::from(*r))
                        .collect::<SmallRow<_>>()
                })
                .collect(),
            cols: self.cols,
        }
    }

    fn accumulate(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        let entry = self.get_mut(place, transition);
        *entry = entry.saturating_add(weight);
    }
}

/// Raw matrices as exported by an editor, rows = places.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncidenceMatrices {
    pub forward: Vec<Vec<Weight>>,
    pub backward: Vec<Vec<Weight>>,
    #[serde(default)]
    pub inhibition: Option<Vec<Vec<Weight>>>,
    #[serde(default)]
    pub reset: Option<Vec<Vec<Weight>>>,
    #[serde(default)]
    pub reader: Option<Vec<Vec<Weight>>>,
}

/// Every matrix one analysis run needs, fixed for the run's duration.
#[derive(Clone, Debug)]
pub struct IncidenceModel {
    forward: Incidence<Weight>,
    backward: Incidence<Weight>,
    combined: Incidence<i128>,
    inhibition: Option<Incidence<Weight>>,
    reset: Option<Incidence<Weight>>,
    reader: Option<Incidence<Weight>>,
    initial: Marking,
    has_inhibition: bool,
    has_reset: bool,
    has_reader: bool,
}

impl IncidenceModel {
    pub fn from_net(net: &Net) -> Result<Self, MalformedNetError> {
        net.validate()?;
        let (places, transitions) = (net.places_len(), net.transitions_len());
        let empty = Incidence::<Weight>::new(places, transitions, 0);
        let mut forward = empty.clone();
        let mut backward = empty.clone();
        let mut inhibition = empty.clone();
        let mut reset = empty.clone();
        let mut reader = empty;

        for arc in &net.arcs {
            let matrix = match (arc.kind, arc.direction) {
                (ArcKind::Normal, ArcDirection::PlaceToTransition) => &mut backward,
                (ArcKind::Normal, ArcDirection::TransitionToPlace) => &mut forward,
                (ArcKind::Inhibition, _) => &mut inhibition,
                (ArcKind::Reset, _) => &mut reset,
                (ArcKind::Reader, _) => &mut reader,
            };
            matrix.accumulate(arc.place, arc.transition, arc.weight);
        }

        Ok(Self::assemble(
            forward,
            backward,
            Some(inhibition),
            Some(reset),
            Some(reader),
            net.initial_marking(),
        ))
    }

    /// Dimensions are taken from `backward`; every other matrix and the
    /// initial marking must agree with it.
    pub fn from_matrices(
        matrices: IncidenceMatrices,
        initial: Vec<Weight>,
    ) -> Result<Self, MalformedNetError> {
        let places = matrices.backward.len();
        let transitions = matrices.backward.first().map_or(0, Vec::len);

        let backward = Incidence::try_from_rows("backward", matrices.backward, places, transitions)?;
        let forward = Incidence::try_from_rows("forward", matrices.forward, places, transitions)?;
        let optional = |name: &'static str, rows: Option<Vec<Vec<Weight>>>| {
            rows.map(|rows| Incidence::try_from_rows(name, rows, places, transitions))
                .transpose()
        };
        let inhibition = optional("inhibition", matrices.inhibition)?;
        let reset = optional("reset", matrices.reset)?;
        let reader = optional("reader", matrices.reader)?;

        if initial.len() != places {
            return Err(MalformedNetError::MarkingLength {
                expected: places,
                found: initial.len(),
            });
        }

        Ok(Self::assemble(
            forward,
            backward,
            inhibition,
            reset,
            reader,
            Marking::from_counts(initial),
        ))
    }

    fn assemble(
        forward: Incidence<Weight>,
        backward: Incidence<Weight>,
        inhibition: Option<Incidence<Weight>>,
        reset: Option<Incidence<Weight>>,
        reader: Option<Incidence<Weight>>,
        initial: Marking,
    ) -> Self {
        let nonzero = |matrix: &Option<Incidence<Weight>>| matrix.as_ref().is_some_and(Incidence::is_nonzero);
        Self {
            combined: forward.difference(&backward),
            has_inhibition: nonzero(&inhibition),
            has_reset: nonzero(&reset),
            has_reader: nonzero(&reader),
            forward,
            backward,
            inhibition,
            reset,
            reader,
            initial,
        }
    }

    pub fn place_count(&self) -> usize {
        self.backward.places()
    }

    pub fn transition_count(&self) -> usize {
        self.backward.transitions()
    }

    pub fn places(&self) -> impl Iterator<Item = PlaceId> + use<> {
        (0..self.place_count()).map(PlaceId::from_usize)
    }

    pub fn transitions(&self) -> impl Iterator<Item = TransitionId> + use<> {
        (0..self.transition_count()).map(TransitionId::from_usize)
    }

    pub fn forward(&self) -> &Incidence<Weight> {
        &self.forward
    }

    pub fn backward(&self) -> &Incidence<Weight> {
        &self.backward
    }

    pub fn combined(&self) -> &Incidence<i128> {
        &self.combined
    }

    pub fn inhibition(&self) -> Option<&Incidence<Weight>> {
        self.inhibition.as_ref()
    }

    pub fn reset(&self) -> Option<&Incidence<Weight>> {
        self.reset.as_ref()
    }

    pub fn reader(&self) -> Option<&Incidence<Weight>> {
        self.reader.as_ref()
    }

    pub fn initial_marking(&self) -> &Marking {
        &self.initial
    }

    pub fn has_inhibition_arcs(&self) -> bool {
        self.has_inhibition
    }

    pub fn has_reset_arcs(&self) -> bool {
        self.has_reset
    }

    pub fn has_reader_arcs(&self) -> bool {
        self.has_reader
    }

    /// Inhibition weights of `place` towards every transition (zeros skipped).
    pub fn inhibition_caps(&self, place: PlaceId) -> impl Iterator<Item = Weight> + '_ {
        self.inhibition
            .iter()
            .flat_map(move |matrix| matrix.rows()[place].iter().copied())
            .filter(|weight| *weight > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::structure::{Place, Transition};

    fn two_place_cycle() -> Net {
        let mut net = Net::empty();
        let p0 = net.add_place(Place::new("p0", 1));
        let p1 = net.add_place(Place::new("p1", 0));
        let t0 = net.add_transition(Transition::new("t0"));
        let t1 = net.add_transition(Transition::new("t1"));
        net.add_input_arc(p0, t0, 1);
        net.add_output_arc(t0, p1, 1);
        net.add_input_arc(p1, t1, 1);
        net.add_output_arc(t1, p0, 1);
        net
    }

    #[test]
    fn matrices_follow_arcs() {
        let model = IncidenceModel::from_net(&two_place_cycle()).unwrap();
        let (p0, p1) = (PlaceId::new(0), PlaceId::new(1));
        let (t0, t1) = (TransitionId::new(0), TransitionId::new(1));

        assert_eq!(model.place_count(), 2);
        assert_eq!(model.transition_count(), 2);
        assert_eq!(*model.backward().get(p0, t0), 1);
        assert_eq!(*model.forward().get(p1, t0), 1);
        assert_eq!(*model.combined().get(p0, t0), -1);
        assert_eq!(*model.combined().get(p0, t1), 1);
        assert!(!model.has_inhibition_arcs());
        assert!(!model.has_reset_arcs());
        assert!(!model.has_reader_arcs());
        assert_eq!(model.initial_marking(), &Marking::from_counts([1, 0]));
    }

    #[test]
    fn parallel_arcs_accumulate() {
        let mut net = two_place_cycle();
        net.add_input_arc(PlaceId::new(0), TransitionId::new(0), 2);
        net.add_inhibitor_arc(PlaceId::new(1), TransitionId::new(0), 4);
        let model = IncidenceModel::from_net(&net).unwrap();
        assert_eq!(*model.backward().get(PlaceId::new(0), TransitionId::new(0)), 3);
        assert!(model.has_inhibition_arcs());
        assert_eq!(model.inhibition_caps(PlaceId::new(1)).collect::<Vec<_>>(), vec![4]);
        assert_eq!(model.inhibition_caps(PlaceId::new(0)).count(), 0);
    }

    #[test]
    fn from_matrices_checks_dimensions() {
        let ok = IncidenceMatrices {
            forward: vec![vec![0, 1], vec![1, 0]],
            backward: vec![vec![1, 0], vec![0, 1]],
            inhibition: None,
            reset: Some(vec![vec![0, 0], vec![0, 0]]),
            reader: None,
        };
        let model = IncidenceModel::from_matrices(ok.clone(), vec![1, 0]).unwrap();
        assert!(!model.has_reset_arcs());
        assert!(model.inhibition().is_none());

        let mut ragged = ok.clone();
        ragged.forward[1].push(3);
        assert!(matches!(
            IncidenceModel::from_matrices(ragged, vec![1, 0]),
            Err(MalformedNetError::DimensionMismatch { matrix: "forward", .. })
        ));

        let mut short = ok.clone();
        short.reader = Some(vec![vec![0, 0]]);
        assert!(matches!(
            IncidenceModel::from_matrices(short, vec![1, 0]),
            Err(MalformedNetError::DimensionMismatch { matrix: "reader", places: 1, .. })
        ));

        assert_eq!(
            IncidenceModel::from_matrices(ok, vec![1]).unwrap_err(),
            MalformedNetError::MarkingLength {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn empty_net_is_valid() {
        let model = IncidenceModel::from_net(&Net::empty()).unwrap();
        assert_eq!(model.place_count(), 0);
        assert_eq!(model.transition_count(), 0);
        assert!(model.initial_marking().is_empty());
    }
}
