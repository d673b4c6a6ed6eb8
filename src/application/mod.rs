//! # Application Layer
//!
//! Contains the core business logic and orchestration of the bot.
//! This includes link parsing, the decode chain, quiz extraction, command routing and state management.

pub mod conversation;
pub mod decoder;
pub mod extractor;
pub mod formatter;
pub mod link;
pub mod parsing;
pub mod router;
pub mod state;
pub mod transcript;
