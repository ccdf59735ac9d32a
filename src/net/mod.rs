//! # Place/transition nets with extended arcs
//!
//! Let `P` and `T` be the ordered place and transition sets. The net is
//! described by `Pre, Post ∈ ℕ^{|P|×|T|}` (`backward`, `forward`) and the
//! effect matrix `C = Post - Pre` (`combined`), plus three optional matrices
//! for inhibition, reset and reader arcs. Markings range over `ℕ ∪ {ω}`.
//!
//! ```rust
//! use pn_cover::net::*;
//!
//! let mut net = Net::empty();
//! let p0 = net.add_place(Place::new("p0", 1));
//! let p1 = net.add_place(Place::new("p1", 0));
//! let t0 = net.add_transition(Transition::new("t0"));
//! net.add_input_arc(p0, t0, 1);
//! net.add_output_arc(t0, p1, 1);
//!
//! let model = IncidenceModel::from_net(&net).unwrap();
//! let enabled = EnablementEvaluator::new(&model).enabled(model.initial_marking());
//! assert_eq!(enabled.iter().collect::<Vec<_>>(), vec![t0]);
//!
//! let next = FiringEngine::new(&model).fire(t0, model.initial_marking()).unwrap();
//! assert_eq!(next, Marking::from_counts([0, 1]));
//! ```

pub mod adjacency;
pub mod core;
pub mod firing;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod marking;
pub mod structure;

pub use adjacency::NetAdjacency;
pub use core::{DiagnosticReport, Net};
pub use firing::{EnabledSet, EnablementEvaluator, FireError, FiringEngine};
pub use ids::{PlaceId, TransitionId};
pub use incidence::{Incidence, IncidenceMatrices, IncidenceModel, MalformedNetError};
pub use index_vec::{Idx, IndexVec};
pub use io::{IoError, NetFormat, load_net, save_net};
pub use marking::{Marking, Tokens};
pub use structure::{Arc, ArcDirection, ArcKind, Place, Transition, Weight};
