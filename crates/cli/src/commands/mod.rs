//! Setup CLI commands

pub mod setup;
