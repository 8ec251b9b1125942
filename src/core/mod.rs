//! # Core
//!
//! Everything above the wire: settings resolution and conversation state.
//! Nothing here knows about HTTP.
//!
//! ## Modules
//!
//! - [`config`]: `ProviderConfig` resolution (explicit → env → file → defaults)
//! - [`assistant`]: `Assistant`, a conversation that remembers its turns

pub mod assistant;
pub mod config;
