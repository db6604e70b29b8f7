//! Persistent storage infrastructure.

pub mod config;
