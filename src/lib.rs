//! `delay-sweep` library crate.
//!
//! The binary (`dsweep`) is a thin wrapper around this library so that:
//!
//! - sweeps and analyses are testable without spawning the simulator
//! - the dispatch, loader and renderer are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod analysis;
pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod sweep;
