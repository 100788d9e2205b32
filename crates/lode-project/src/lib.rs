pub mod io;
pub mod package_json;

pub use io::{read_package_json, write_package_json};
pub use package_json::{BinField, PackageJson, PeerMeta};
