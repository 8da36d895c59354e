#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod alias;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod inject;
pub mod models;
pub mod publish;
pub mod render;
pub mod resolver;
pub mod store;

pub use alias::{AliasMap, PathAliaser};
pub use config::ResolverConfig;
pub use descriptor::{BundleDescriptor, DescriptorLoader, FileDescriptorLoader, StaticDescriptors};
pub use error::{ResolveError, Result};
pub use inject::inject_markup;
pub use models::{BundleLocation, ResolvedBundle};
pub use resolver::BundleResolver;
pub use store::{FileStore, OsFileStore};
