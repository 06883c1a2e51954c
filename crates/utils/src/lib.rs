//! Shared helpers: executable lookup and log setup.

pub mod logging;
pub mod shell;
