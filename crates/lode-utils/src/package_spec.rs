/// Split a CLI package spec like `chalk@^2.0.0` or `@types/node@20` into
/// `(name, range)`. A spec without a range defaults to `latest`.
#[must_use]
pub fn parse_pkg_spec(spec: &str) -> (String, String) {
    if let Some(rest) = spec.strip_prefix('@') {
        // The first `@` belongs to the scope; a range separator can only
        // appear after it.
        match rest.split_once('@') {
            Some((name, range)) if !name.is_empty() => (format!("@{name}"), range.to_string()),
            _ => (spec.to_string(), "latest".to_string()),
        }
    } else {
        match spec.split_once('@') {
            Some((name, range)) if !name.is_empty() => (name.to_string(), range.to_string()),
            _ => (spec.to_string(), "latest".to_string()),
        }
    }
}

/// Unwrap an `npm:` alias range.
///
/// A dependency declared as `foo: "npm:bar@^1.0.0"` is looked up in the
/// registry under `bar` while keeping `foo` as the name in the module tree.
/// Returns `(real_name, real_range)`; non-alias ranges pass through with the
/// declared name.
#[must_use]
pub fn split_alias(declared_name: &str, range: &str) -> (String, String) {
    let Some(rest) = range.strip_prefix("npm:") else {
        return (declared_name.to_string(), range.to_string());
    };

    // `rest` is `realName[@realRange]`; for scoped names the version `@`
    // is the last one, never the one at position 0.
    match rest.rfind('@') {
        Some(idx) if idx > 0 => (rest[..idx].to_string(), rest[idx + 1..].to_string()),
        _ => (rest.to_string(), "*".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_with_range() {
        assert_eq!(
            parse_pkg_spec("chalk@^2.0.0"),
            ("chalk".to_string(), "^2.0.0".to_string())
        );
    }

    #[test]
    fn spec_without_range_defaults_to_latest() {
        assert_eq!(
            parse_pkg_spec("chalk"),
            ("chalk".to_string(), "latest".to_string())
        );
    }

    #[test]
    fn scoped_spec() {
        assert_eq!(
            parse_pkg_spec("@types/node@20.1.0"),
            ("@types/node".to_string(), "20.1.0".to_string())
        );
        assert_eq!(
            parse_pkg_spec("@types/node"),
            ("@types/node".to_string(), "latest".to_string())
        );
    }

    #[test]
    fn alias_unwraps_real_name_and_range() {
        assert_eq!(
            split_alias("my-lodash", "npm:lodash@^4.17.0"),
            ("lodash".to_string(), "^4.17.0".to_string())
        );
    }

    #[test]
    fn alias_with_scoped_real_name() {
        assert_eq!(
            split_alias("runtime", "npm:@babel/runtime@^7.0.0"),
            ("@babel/runtime".to_string(), "^7.0.0".to_string())
        );
        assert_eq!(
            split_alias("runtime", "npm:@babel/runtime"),
            ("@babel/runtime".to_string(), "*".to_string())
        );
    }

    #[test]
    fn non_alias_passes_through() {
        assert_eq!(
            split_alias("lodash", "^4.17.0"),
            ("lodash".to_string(), "^4.17.0".to_string())
        );
    }
}
