//! Five-step résumé wizard: step gating, the controller, live sessions, and
//! the HTTP handlers that drive them.

pub mod controller;
pub mod handlers;
pub mod session;
pub mod steps;

pub use controller::{
    Mode, NewEntry, NextOutcome, SubmitOutcome, SubmitValidation, WizardController, WizardError,
};
pub use session::{spawn_idle_sweeper, SessionStore, WizardSession};
pub use steps::{Step, StepErrors};
