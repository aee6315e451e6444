mod domain;
pub use domain::*;

pub mod wire;
pub use wire::{Envelope, Feedback, Request, Roster, UpdaterCommand};

mod error;
pub use error::ModelError;
