//! # Interface Layer
//!
//! Entry points users reach the bot through: chat command handlers and the HTTP API.

pub mod commands;
pub mod http;
