pub const USER_AGENT: &str = "lode/0.1.0";

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";
pub const FALLBACK_REGISTRY: &str = "https://registry.npmjs.org";

/// Accept header that selects the abbreviated packument.
pub const ABBREVIATED_ACCEPT: &str = "application/vnd.npm.install-v1+json";
pub const FULL_ACCEPT: &str = "application/json";

pub const MAX_ATTEMPTS: u32 = 3;
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
pub const BASE_BACKOFF_MS: u64 = 1000;
pub const MAX_BACKOFF_MS: u64 = 10_000;

pub const METADATA_TTL_SECS: u64 = 300;
pub const METADATA_CACHE_MAX_BYTES: u64 = 64 * 1024 * 1024;

pub const DEFAULT_CONCURRENCY: usize = 16;

pub const LOCKFILE_NAME: &str = "lode.lock";
pub const LOCKFILE_VERSION: u32 = 1;

pub const MODULES_DIR: &str = "modules";
pub const BIN_DIR: &str = ".bin";
pub const MARKER_FILE: &str = ".marker";
pub const META_FILE: &str = ".meta";
pub const TARBALL_CACHE_DIR: &str = "tarballs";
