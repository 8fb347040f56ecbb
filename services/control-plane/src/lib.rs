//! Fleet control plane library.
//!
//! This crate primarily ships a `control-plane` binary, but we expose a small
//! library surface to enable integration testing and reuse.

pub mod api;
pub mod config;
pub mod inventory;
pub mod model;
pub mod provider;
pub mod rbac;
pub mod state;
pub mod version;
pub mod views;
pub mod workers;

#[cfg(test)]
mod fixtures;
