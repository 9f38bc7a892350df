//! codeai core library.
//!
//! Turns a prompt into rendered content:
//! - [`lifecycle`] drives one generation request at a time through
//!   `Idle -> Pending -> Success | Error`.
//! - [`interpret`] converts the backend's raw reply into typed blocks.
//! - [`providers`] holds the generation backends.

pub mod config;
pub mod interpret;
pub mod lifecycle;
pub mod providers;
