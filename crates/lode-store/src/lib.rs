pub mod hardlink;
pub mod integrity;
pub mod paths;
pub mod store_manager;
pub mod tarball;

pub use hardlink::{link_file, link_tree};
pub use integrity::{IntegrityMismatch, integrity_for, verify_integrity};
pub use paths::{default_cache_root, default_store_root, lode_home};
pub use store_manager::{PackageStore, StoreEntry, StoreMeta};
pub use tarball::{create_tarball, extract_tarball};
