//! Eden library root.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod telegram;

pub use cache::{Cache, Record, StoreError};
pub use cli::Commands;
pub use commands::{Invocation, Registry, Reply};
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use telegram::run_telegram_daemon;
