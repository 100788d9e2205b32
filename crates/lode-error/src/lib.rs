use std::fmt;

#[derive(Debug)]
pub enum LodeError {
    /// Metadata lookup exhausted the primary and fallback registries.
    NotFound(String),
    /// Metadata was present but no version matched the range.
    NoSatisfyingVersion(String, String),
    /// Connect/timeout/5xx after the retry budget, with the failing URL.
    NetworkFailure(String, String),
    /// 4xx response: status, URL, body excerpt.
    HttpError(u16, String, String),
    /// Fetched bytes do not hash to the declared integrity:
    /// package, expected, actual.
    IntegrityMismatch(String, String, String),
    /// Required artifact absent from cache in offline mode.
    OfflineMiss(String),
    /// On-disk lockfile schema version differs from ours.
    LockfileSchemaMismatch(u32),
    /// Frozen install and the lockfile no longer matches the manifest.
    LockfileOutOfDate,
    /// Malformed tarball: package, detail.
    ExtractionError(String, String),
    /// Filesystem failure during materialization: package, detail.
    LinkError(String, String),
    ManifestError(String),
    LockfileError(String),
    IoError(String),
}

impl fmt::Display for LodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(name) => {
                write!(f, "Package '{name}' not found in any configured registry")
            }
            Self::NoSatisfyingVersion(name, range) => {
                write!(f, "No version of '{name}' satisfies '{range}'")
            }
            Self::NetworkFailure(url, cause) => {
                write!(f, "Network failure for {url}: {cause}")
            }
            Self::HttpError(status, url, excerpt) => {
                write!(f, "HTTP {status} for {url}: {excerpt}")
            }
            Self::IntegrityMismatch(pkg, expected, actual) => {
                write!(
                    f,
                    "Integrity mismatch for {pkg}: expected {expected}, got {actual}"
                )
            }
            Self::OfflineMiss(pkg) => {
                write!(f, "{pkg} is not in the cache and offline mode is enabled")
            }
            Self::LockfileSchemaMismatch(found) => {
                write!(f, "Unsupported lockfile version {found}")
            }
            Self::LockfileOutOfDate => {
                write!(f, "Lockfile is out of date with the manifest (frozen install)")
            }
            Self::ExtractionError(pkg, detail) => {
                write!(f, "Failed to extract {pkg}: {detail}")
            }
            Self::LinkError(pkg, detail) => {
                write!(f, "Failed to link {pkg}: {detail}")
            }
            Self::ManifestError(msg) => {
                write!(f, "Manifest error: {msg}")
            }
            Self::LockfileError(msg) => {
                write!(f, "Lockfile error: {msg}")
            }
            Self::IoError(msg) => {
                write!(f, "IO error: {msg}")
            }
        }
    }
}

impl std::error::Error for LodeError {}

impl From<std::io::Error> for LodeError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for LodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::ManifestError(err.to_string())
    }
}

impl From<anyhow::Error> for LodeError {
    fn from(err: anyhow::Error) -> Self {
        Self::ManifestError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LodeError>;
