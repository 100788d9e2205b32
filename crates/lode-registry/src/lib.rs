pub mod cache;
pub mod client;
pub mod types;

pub use cache::MetadataCache;
pub use client::RegistryClient;
pub use types::{Dist, Packument, VersionRecord};
