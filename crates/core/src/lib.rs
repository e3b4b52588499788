//! maestro core: shared errors, configuration, types, and traits.
//!
//! Every other crate in the workspace depends on this one; it depends on
//! none of them.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use self::config::{ModelSlots, Provider, RuntimeConfig};
pub use self::error::{Error, Result};
