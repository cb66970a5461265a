//! CLI subcommands.

pub mod chat;
pub mod config;
pub mod roster;
