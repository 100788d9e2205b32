pub mod package_spec;
pub mod safe_name;

pub use package_spec::{parse_pkg_spec, split_alias};
pub use safe_name::{restore_name, safe_name};
