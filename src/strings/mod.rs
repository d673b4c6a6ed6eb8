//! # Strings Module
//!
//! Centralizes user-facing strings, help text and HTML templates.

pub mod help;
pub mod messages;
pub mod templates;
