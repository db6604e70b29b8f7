//! Application layer: the session controller, value delivery, and the host
//! adapters built on top of them.

pub mod adapters;
pub mod delivery;
pub mod session_controller;
