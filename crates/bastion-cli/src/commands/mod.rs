//! Subcommand handlers.

pub(crate) mod config;
pub(crate) mod inspect;
pub(crate) mod tools;
