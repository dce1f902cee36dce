//! Internal implementation modules for `haul-core`.
//!
//! Callers should go through the re-exports at the crate root rather than
//! importing these modules directly.

pub mod acquire;
pub mod artifact;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod handlers;
pub mod process;
pub mod staging;
pub mod unpack;

#[cfg(test)]
pub(crate) mod testkit;
