//! Omniscye: a branching-dialogue engine for a simulated phone chat.
//!
//! A story is a set of nodes (chat bubbles or decision points), named linear
//! paths through them, and an explicit routing table from answered choices
//! to the next path. The [`engine::Engine`] walks the active path, waits out
//! each bubble's authored delay, and parks on decision points until the
//! player picks an option.

pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod routing;
pub mod story;
pub mod terminal;
pub mod validate;

pub use config::EngineConfig;
pub use engine::{Engine, EngineEvent, RunOutcome};
pub use error::{EngineError, EngineResult};
pub use story::Story;
pub use validate::ValidationMode;
