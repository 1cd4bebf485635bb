//! Multi-chain token issuance core.
//!
//! Token drafts come in as per-standard forms, are mapped to typed
//! on-chain configurations, scored for complexity, and deployed through
//! the factory or master contracts of the target network. The unified
//! service in [`services`] ties mapping, strategy selection, compliance
//! checks, and the deployment pipeline together.

mod bindings;
pub mod chain;
pub mod complexity;
pub mod config;
pub mod error;
pub mod events;
pub mod forms;
pub mod foundry;
pub mod mapper;
pub mod persistence;
pub mod services;
pub mod standard;
pub mod strategy;

#[cfg(test)]
pub mod test_utils;

pub use config::{Config, Env, setup_tracing};
