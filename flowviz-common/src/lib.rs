//! # Flowviz Common Library
//!
//! Shared code for the flowviz display crates:
//! - Error type and Result alias
//! - Event types (FlowEvent enum) and the broadcast EventBus
//! - Cursor, field-pair and sequencer state types shared by events
//! - TOML configuration loading and config-file resolution
//! - Timestamp utilities

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
