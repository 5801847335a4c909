//! Build distributable archives of Rerun modules.
//!
//! A [`request::BuildRequest`] names a format and a list of modules. The
//! [`dispatch::dispatch`] entry point hands it to exactly one builder:
//!
//! - [`shell_archive`]: a self-extracting shell script bundling the modules
//!   with the `rerun` runtime;
//! - [`debian`]: one `.deb` per module, built with `dh_make` and `debuild`;
//! - [`rpm`]: one `.rpm` per module, built with `rpmbuild`.
//!
//! Builders shell out to the native toolchains through the
//! [`executor::CommandExecutor`] seam and stage their work in a
//! [`workspace::StagingWorkspace`] that is removed on every exit path.

pub mod cli;
pub mod config;
pub mod context;
pub mod debian;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod executor;
pub mod fsutil;
pub mod host;
pub mod metadata;
pub mod module_name;
pub mod platform;
pub mod registry;
pub mod request;
pub mod rpm;
pub mod shell_archive;
pub mod template;
pub mod workspace;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use error::{ArchiveError, ErrorKind, Result};
pub use module_name::ModuleName;
