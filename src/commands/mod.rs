//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `build` - Download, link and package runtimes
//! - `analyze` - Derive the module set from application JARs
//! - `download` - Fetch and extract JDKs only
//! - `package` - Package already-linked runtimes
//! - `show` - Display information
//! - `clean` - Remove generated directories

pub mod analyze;
pub mod build;
pub mod clean;
pub mod download;
pub mod package;
pub mod show;

pub use analyze::cmd_analyze;
pub use build::cmd_build;
pub use clean::cmd_clean;
pub use download::cmd_download;
pub use package::cmd_package;
pub use show::cmd_show;
