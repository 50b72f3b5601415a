//! Discord interaction handling: signature verification, payload
//! normalization, response envelopes, and command registration.

pub mod interaction;
pub mod register;
pub mod response;
pub mod verify;

pub use interaction::{
    interpret, Action, Interaction, InterpretError, NormalizedCommand, ParsedInteraction,
};
pub use register::{CommandRegistrar, CommandShape, RegisterError};
pub use verify::verify_signature;
