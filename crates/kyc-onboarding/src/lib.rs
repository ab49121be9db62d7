//! Identity-verification onboarding: the wizard core (validation, document
//! classification, step state machine, gateway client) and the intake backend
//! that accepts each step's submission.

pub mod config;
pub mod envelope;
pub mod error;
pub mod intake;
pub mod onboarding;
pub mod telemetry;
