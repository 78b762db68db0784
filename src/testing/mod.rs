//! Test-signal utilities shared by unit tests, integration tests and the
//! `clip_cli synthesize` command.

pub mod signals;

pub use signals::SyntheticSignal;
