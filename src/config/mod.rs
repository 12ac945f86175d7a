//! Fleet configuration.
//!
//! Loads the server file (TOML or JSON) and supplies defaults for anything a
//! server entry leaves out.

mod servers;
mod settings;

pub use servers::{ChatId, FleetConfig, ServerEntry, ServerList, TelegramConfig};
pub use settings::{Paths, ScanDefaults, CONFIG_FILE_NAME};
