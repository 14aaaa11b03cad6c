//! CLI command handlers. Each command is in its own file.

mod checksum;
mod fetch;
mod map;

pub use checksum::run_checksum;
pub use fetch::run_fetch;
pub use map::run_map;
