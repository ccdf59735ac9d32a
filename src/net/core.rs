//! The net as handed over by the editor: ordered places, ordered transitions
//! and a flat arc list.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::MalformedNetError;
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::marking::Marking;
use crate::net::structure::{Arc, ArcDirection, ArcKind, Place, Transition, Weight};

/// Connectivity findings logged before an analysis run.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    /// Places with no arc at all.
    pub isolated_places: Vec<(PlaceId, String)>,
    /// Transitions with no arc at all.
    pub isolated_transitions: Vec<(TransitionId, String)>,
    pub warnings: Vec<String>,
    pub total_places: usize,
    pub total_transitions: usize,
}

impl DiagnosticReport {
    pub fn has_issues(&self) -> bool {
        !self.isolated_places.is_empty()
            || !self.isolated_transitions.is_empty()
            || !self.warnings.is_empty()
    }
}

#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Net {
    #[serde(default)]
    pub name: String,
    pub places: IndexVec<PlaceId, Place>,
    pub transitions: IndexVec<TransitionId, Transition>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
}

impl fmt::Debug for Net {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Net")
            .field("name", &self.name)
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("arcs", &self.arcs)
            .finish()
    }
}

impl Net {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_place(&mut self, place: Place) -> PlaceId {
        self.places.push(place)
    }

    pub fn add_transition(&mut self, transition: Transition) -> TransitionId {
        self.transitions.push(transition)
    }

    /// Appends an arc without checking it; [`Net::validate`] reports bad arcs.
    pub fn add_arc(&mut self, arc: Arc) {
        self.arcs.push(arc);
    }

    /// Input arc: place -> transition.
    pub fn add_input_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.add_arc(Arc::input(place, transition, weight));
    }

    /// Output arc: transition -> place.
    pub fn add_output_arc(&mut self, transition: TransitionId, place: PlaceId, weight: Weight) {
        self.add_arc(Arc::output(transition, place, weight));
    }

    pub fn add_inhibitor_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.add_special_arc(place, transition, ArcKind::Inhibition, weight);
    }

    pub fn add_reset_arc(&mut self, place: PlaceId, transition: TransitionId) {
        self.add_special_arc(place, transition, ArcKind::Reset, 1);
    }

    pub fn add_reader_arc(&mut self, place: PlaceId, transition: TransitionId, weight: Weight) {
        self.add_special_arc(place, transition, ArcKind::Reader, weight);
    }

    fn add_special_arc(
        &mut self,
        place: PlaceId,
        transition: TransitionId,
        kind: ArcKind,
        weight: Weight,
    ) {
        self.add_arc(Arc::new(
            place,
            transition,
            ArcDirection::PlaceToTransition,
            kind,
            weight,
        ));
    }

    pub fn places_len(&self) -> usize {
        self.places.len()
    }

    pub fn transitions_len(&self) -> usize {
        self.transitions.len()
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::from_counts(self.places.iter().map(|place| place.tokens))
    }

    pub fn arcs_of_kind(&self, kind: ArcKind) -> impl Iterator<Item = &Arc> {
        self.arcs.iter().filter(move |arc| arc.kind == kind)
    }

    /// Checks every arc against the place/transition lists.
    pub fn validate(&self) -> Result<(), MalformedNetError> {
        for (index, arc) in self.arcs.iter().enumerate() {
            if !self.places.contains_index(arc.place) {
                return Err(MalformedNetError::UnknownPlace {
                    arc: index,
                    place: arc.place,
                });
            }
            if !self.transitions.contains_index(arc.transition) {
                return Err(MalformedNetError::UnknownTransition {
                    arc: index,
                    transition: arc.transition,
                });
            }
            if !arc.kind.allows(arc.direction) {
                return Err(MalformedNetError::MisdirectedArc {
                    arc: index,
                    kind: arc.kind,
                });
            }
            if arc.weight == 0 {
                return Err(MalformedNetError::ZeroWeight { arc: index });
            }
        }
        Ok(())
    }

    pub fn diagnose_connectivity(&self) -> DiagnosticReport {
        let mut place_degree = IndexVec::<PlaceId, (usize, usize)>::from_elem((0, 0), self.places_len());
        let mut transition_degree =
            IndexVec::<TransitionId, (usize, usize)>::from_elem((0, 0), self.transitions_len());

        for arc in &self.arcs {
            let (Some(place), Some(transition)) = (
                place_degree.get_mut(arc.place),
                transition_degree.get_mut(arc.transition),
            ) else {
                continue;
            };
            match arc.direction {
                ArcDirection::PlaceToTransition => {
                    place.1 += 1;
                    transition.0 += 1;
                }
                ArcDirection::TransitionToPlace => {
                    place.0 += 1;
                    transition.1 += 1;
                }
            }
        }

        let mut report = DiagnosticReport {
            total_places: self.places_len(),
            total_transitions: self.transitions_len(),
            ..DiagnosticReport::default()
        };

        for (place_id, place) in self.places.iter_enumerated() {
            match place_degree[place_id] {
                (0, 0) => report.isolated_places.push((place_id, place.name.clone())),
                (0, _) if place.tokens == 0 => report.warnings.push(format!(
                    "place '{}' ({}) has no input arc and no initial tokens, it never gets marked",
                    place.name, place_id
                )),
                _ => {}
            }
        }

        for (transition_id, transition) in self.transitions.iter_enumerated() {
            match transition_degree[transition_id] {
                (0, 0) => report
                    .isolated_transitions
                    .push((transition_id, transition.name.clone())),
                (0, _) => report.warnings.push(format!(
                    "transition '{}' ({}) has no input place and is always enabled",
                    transition.name, transition_id
                )),
                _ => {}
            }
        }

        report
    }

    pub fn log_diagnostics(&self) {
        let report = self.diagnose_connectivity();
        if !report.has_issues() {
            log::debug!(
                "net '{}' connectivity check passed ({} places, {} transitions)",
                self.name,
                report.total_places,
                report.total_transitions
            );
            return;
        }

        log::warn!(
            "net '{}' connectivity: {} places, {} transitions",
            self.name,
            report.total_places,
            report.total_transitions
        );
        for (id, name) in &report.isolated_places {
            log::warn!("  isolated place [{}] {}", id.index(), name);
        }
        for (id, name) in &report.isolated_transitions {
            log::warn!("  isolated transition [{}] {}", id.index(), name);
        }
        for warning in &report.warnings {
            log::warn!("  {}", warning);
        }
    }
}
