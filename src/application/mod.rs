//! Application layer: the submission state machine and its collaborators.
//!
//! One task per session keeps transitions serialized; the shared
//! `CallbackCorrelator` is the only state crossing session boundaries.

pub mod broker;
pub mod context;
pub mod correlator;
pub mod service;
pub mod session;
