//! CLI module for the startnotes application
//!
//! This module handles the command-line interface for interacting with the
//! note board.
mod app;
mod main;

pub use app::*;
pub use main::*;
