//! Python bindings (feature `pyo3`)
//!
//! A thin wrapper: the Python side drives the same control operations as
//! Rust callers and reads results as dicts or JSON strings.

pub mod simulation;

pub use simulation::PyPlantSimulation;
