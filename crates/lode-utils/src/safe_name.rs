/// Escape a package name for use as a single path segment.
///
/// `@scope/pkg` becomes `+scope+pkg`; plain names pass through unchanged
/// since they may not contain `/` or `@`.
#[must_use]
pub fn safe_name(name: &str) -> String {
    name.replace('@', "+").replace('/', "+")
}

/// Reverse of [`safe_name`]: a leading `+` restores the scope `@`, every
/// other `+` restores a `/`.
#[must_use]
pub fn restore_name(safe: &str) -> String {
    if let Some(rest) = safe.strip_prefix('+') {
        format!("@{}", rest.replace('+', "/"))
    } else {
        safe.replace('+', "/")
    }
}
