pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod seed;
pub mod types;

pub use config::{Config, SwapPolicyKind};
pub use error::Error;
pub use event::{Event, EventKind, RawEvent, RawKind};
pub use seed::GameSeed;
pub use types::*;

/// Crate-wide result type with the fatal error taxonomy as the default.
pub type Result<T, E = Error> = std::result::Result<T, E>;
