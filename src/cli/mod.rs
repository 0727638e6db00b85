//! CLI module
//!
//! Command-line front end for the authenticated client.
//!
//! # Commands
//!
//! - `get` / `post` - Call an arbitrary endpoint
//! - `refresh` - Renew the stored token
//! - `token` - Show or set the stored token
//! - `lists` / `streaks` - Dashboard endpoints

mod commands;
mod runner;

pub use commands::{Cli, Commands, ListsCommand, StreaksCommand, TokenCommand};
pub use runner::Runner;
