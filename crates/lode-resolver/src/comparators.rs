use std::cmp::Ordering;

use semver::Version;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    Exact(Version),
    GreaterThan(Version),
    GreaterThanOrEqual(Version),
    LessThan(Version),
    LessThanOrEqual(Version),
    Compatible(Version), // ^
    Tilde(Version),      // ~
    Wildcard,            // *, empty range, latest
}

impl Comparator {
    /// Precedence comparison throughout: build metadata never participates.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(v) => version.cmp_precedence(v) == Ordering::Equal,
            Self::GreaterThan(v) => version.cmp_precedence(v) == Ordering::Greater,
            Self::GreaterThanOrEqual(v) => version.cmp_precedence(v) != Ordering::Less,
            Self::LessThan(v) => version.cmp_precedence(v) == Ordering::Less,
            Self::LessThanOrEqual(v) => version.cmp_precedence(v) != Ordering::Greater,
            Self::Wildcard => true,
            Self::Compatible(v) => {
                // ^1.2.3 := >=1.2.3 <2.0.0
                // ^0.2.3 := >=0.2.3 <0.3.0
                // ^0.0.3 := >=0.0.3 <0.0.4
                if version.cmp_precedence(v) == Ordering::Less {
                    return false;
                }
                if v.major > 0 {
                    version.major == v.major
                } else if v.minor > 0 {
                    version.major == 0 && version.minor == v.minor
                } else {
                    version.major == 0 && version.minor == 0 && version.patch == v.patch
                }
            }
            Self::Tilde(v) => {
                // ~1.2.3 := >=1.2.3 <1.3.0
                if version.cmp_precedence(v) == Ordering::Less {
                    return false;
                }
                version.major == v.major && version.minor == v.minor
            }
        }
    }

    /// Whether this comparator names a prerelease of the same
    /// `(major, minor, patch)` triple, which is what allows a prerelease
    /// candidate to satisfy the enclosing clause at all.
    fn admits_prerelease_of(&self, version: &Version) -> bool {
        let v = match self {
            Self::Wildcard => return false,
            Self::Exact(v)
            | Self::GreaterThan(v)
            | Self::GreaterThanOrEqual(v)
            | Self::LessThan(v)
            | Self::LessThanOrEqual(v)
            | Self::Compatible(v)
            | Self::Tilde(v) => v,
        };
        !v.pre.is_empty()
            && v.major == version.major
            && v.minor == version.minor
            && v.patch == version.patch
    }
}

/// AND-combination of comparators (one `||`-branch of a range).
#[derive(Debug, Clone, Default)]
pub struct Clause {
    pub comparators: Vec<Comparator>,
}

impl Clause {
    #[must_use]
    pub fn new(comparators: Vec<Comparator>) -> Self {
        Self { comparators }
    }

    #[must_use]
    pub fn any() -> Self {
        Self::new(vec![Comparator::Wildcard])
    }

    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        if self.comparators.is_empty() {
            return false;
        }
        if !version.pre.is_empty()
            && !self
                .comparators
                .iter()
                .any(|c| c.admits_prerelease_of(version))
        {
            return false;
        }
        self.comparators.iter().all(|c| c.matches(version))
    }
}

/// OR-combination of clauses. An empty range matches nothing, which is how
/// unparseable range strings behave.
#[derive(Debug, Clone, Default)]
pub struct Range {
    pub clauses: Vec<Clause>,
}

impl Range {
    #[must_use]
    pub fn any() -> Self {
        Self {
            clauses: vec![Clause::any()],
        }
    }

    #[must_use]
    pub fn never() -> Self {
        Self { clauses: vec![] }
    }

    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.clauses.iter().any(|clause| clause.matches(version))
    }
}
