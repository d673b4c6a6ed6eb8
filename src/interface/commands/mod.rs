//! # Command Handlers
//!
//! Contains specific handler functions for each supported command (/start, /help, /quiz).
//! These handlers are invoked by the Router.

pub mod help;
pub mod quiz;
pub mod start;
