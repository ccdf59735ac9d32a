//! Coverability trees, boundedness/safety/deadlock verdicts and structural
//! classification for place/transition nets with inhibitor, reset and reader
//! arcs.
#![warn(non_snake_case)]

pub mod analysis;
pub mod config;
pub mod net;
pub mod options;
pub mod report;
pub mod util;
