//! The engine: a shared [`buffer`], the [`coordinator`] that turns any fault
//! into a run-wide cancellation, per-participant [`runner`]s, the [`adapter`]
//! family, and the [`orchestrator`] / [`facade`] entry points.

pub mod adapter;
pub mod buffer;
pub mod cancel;
pub mod config;
pub mod coordinator;
pub mod facade;
pub mod orchestrator;
pub mod role;
pub mod runner;
