//! Shared filesystem helpers.

pub mod files;
pub mod temp;

pub use files::{copy_tree, write_file_mode, write_file_with_dirs};
pub use temp::{cleanup_work_dir, prepare_work_dir};
