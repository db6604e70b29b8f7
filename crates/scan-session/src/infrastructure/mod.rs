//! Infrastructure layer: the decode engine binding, host page seams, and
//! settings storage.

pub mod engine;
pub mod host;
pub mod storage;
