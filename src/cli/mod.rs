//! CLI module - Command-line interface for the application.
//!
//! - `serve` - Start the HTTP server
//! - `migrate` - Database migrations
//! - `tokens` - Refresh token maintenance
//! - `users` - Account administration
//! - `secrets` - Keys, file encryption and random tokens

pub mod args;

pub use args::{Cli, Commands};
