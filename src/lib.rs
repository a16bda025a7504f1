//! jrekit - minimal Java runtime builder.
//!
//! Downloads JDKs for each target platform, works out which runtime modules
//! an application needs, links a trimmed runtime image with jlink and
//! packages it alongside the application.
//!
//! Stages, leaf first:
//! - [`download`] fetches JDK archives
//! - [`extract`] unpacks them and finds the JDK root
//! - [`analyzer`] runs jdeps over application JARs
//! - [`resolve`] picks the module set for a run
//! - [`linker`] runs jlink
//! - [`package`] assembles release archives
//! - [`pipeline`] drives the stages across platforms

pub mod analyzer;
pub mod cache;
pub mod clean;
pub mod commands;
pub mod common;
pub mod config;
pub mod download;
pub mod extract;
pub mod linker;
pub mod modules;
pub mod package;
pub mod pipeline;
pub mod platform;
pub mod process;
pub mod resolve;
pub mod timing;
