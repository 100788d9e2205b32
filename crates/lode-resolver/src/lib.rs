pub mod comparators;
pub mod resolver;
pub mod semver;
pub mod version_utils;

pub use comparators::{Clause, Comparator, Range};
pub use resolver::{
    DependencyNode, DependencyResolver, Resolution, ResolvedPackage, ResolverOptions,
};
pub use crate::semver::{max_satisfying, parse_range, satisfies};
pub use version_utils::parse_version;
