use semver::Version;

use crate::comparators::{Clause, Comparator, Range};
use crate::version_utils::{is_x_component, parse_version};

/// Parse an npm-style range: `||`-separated clauses, whitespace-separated
/// comparators within a clause, `^`/`~`/hyphen sugar, `*`/`x` placeholders.
///
/// An invalid token poisons the whole range into one that matches nothing;
/// range parsing itself never fails.
#[must_use]
pub fn parse_range(range_str: &str) -> Range {
    let range_str = range_str.trim();
    if is_any_token(range_str) {
        return Range::any();
    }

    let mut clauses = Vec::new();
    for clause_str in range_str.split("||") {
        let clause_str = clause_str.trim();
        if is_any_token(clause_str) {
            clauses.push(Clause::any());
            continue;
        }
        match parse_clause(clause_str) {
            Ok(clause) => clauses.push(clause),
            Err(_) => return Range::never(),
        }
    }

    if clauses.is_empty() {
        Range::never()
    } else {
        Range { clauses }
    }
}

/// `*`, the empty range and the `latest` tag all mean "any stable version".
fn is_any_token(s: &str) -> bool {
    s.is_empty() || s == "*" || s == "latest" || is_x_component(s)
}

fn parse_clause(clause: &str) -> Result<Clause, String> {
    // Hyphen ranges: "1.2.3 - 2.3.4" => >=1.2.3 <=2.3.4
    if let Some((low, high)) = clause.split_once(" - ") {
        return Ok(Clause::new(vec![
            Comparator::GreaterThanOrEqual(parse_version(low)?),
            Comparator::LessThanOrEqual(parse_version(high)?),
        ]));
    }

    let mut comparators = Vec::new();
    let mut remaining = clause.trim();

    while !remaining.is_empty() {
        let (ops, rest) = split_operator(remaining);
        let (token, rest) = take_version_token(rest)?;

        match ops {
            ">=" => comparators.push(Comparator::GreaterThanOrEqual(parse_version(token)?)),
            "<=" => comparators.push(Comparator::LessThanOrEqual(parse_version(token)?)),
            ">" => comparators.push(Comparator::GreaterThan(parse_version(token)?)),
            "<" => comparators.push(Comparator::LessThan(parse_version(token)?)),
            "=" => comparators.push(Comparator::Exact(parse_version(token)?)),
            "^" => comparators.push(Comparator::Compatible(parse_version(token)?)),
            "~" => comparators.push(Comparator::Tilde(parse_version(token)?)),
            "" => comparators.extend(bare_comparators(token)?),
            other => return Err(format!("unknown operator '{other}'")),
        }

        remaining = rest.trim_start();
    }

    if comparators.is_empty() {
        return Err("empty clause".to_string());
    }
    Ok(Clause::new(comparators))
}

/// Split a leading comparison operator off a clause fragment. The operator
/// may abut its version or be separated from it by a space.
fn split_operator(input: &str) -> (&str, &str) {
    for op in [">=", "<=", ">", "<", "=", "^", "~"] {
        if let Some(rest) = input.strip_prefix(op) {
            return (op, rest.trim_start());
        }
    }
    ("", input)
}

/// Take one whitespace-delimited version token.
fn take_version_token(input: &str) -> Result<(&str, &str), String> {
    let input = input.trim_start();
    if input.is_empty() {
        return Err("expected version after operator".to_string());
    }
    match input.find(char::is_whitespace) {
        Some(end) => Ok((&input[..end], &input[end..])),
        None => Ok((input, "")),
    }
}

/// A bare token without an operator. Full versions pin exactly; partial and
/// `x`-versions expand to the bump range they imply (`1.2` => >=1.2.0 <1.3.0).
fn bare_comparators(token: &str) -> Result<Vec<Comparator>, String> {
    if is_x_component(token) {
        return Ok(vec![Comparator::Wildcard]);
    }

    if let Ok(version) = Version::parse(token.trim_start_matches('v')) {
        return Ok(vec![Comparator::Exact(version)]);
    }

    let cleaned = token.trim_start_matches('v');
    let parts: Vec<&str> = cleaned.split('.').collect();
    if parts.len() > 3 {
        return Err(format!("invalid version '{token}'"));
    }

    let specified: Vec<u64> = parts
        .iter()
        .take_while(|p| !is_x_component(p))
        .map(|p| {
            p.parse::<u64>()
                .map_err(|_| format!("invalid version component '{p}' in '{token}'"))
        })
        .collect::<Result<_, _>>()?;

    // Components after an x placeholder must themselves be placeholders.
    if parts
        .iter()
        .skip(specified.len())
        .any(|p| !is_x_component(p))
    {
        return Err(format!("invalid version '{token}'"));
    }

    Ok(match specified.as_slice() {
        [] => vec![Comparator::Wildcard],
        [major] => vec![
            Comparator::GreaterThanOrEqual(Version::new(*major, 0, 0)),
            Comparator::LessThan(Version::new(major + 1, 0, 0)),
        ],
        [major, minor] => vec![
            Comparator::GreaterThanOrEqual(Version::new(*major, *minor, 0)),
            Comparator::LessThan(Version::new(*major, minor + 1, 0)),
        ],
        [major, minor, patch] => vec![Comparator::Exact(Version::new(*major, *minor, *patch))],
        _ => return Err(format!("invalid version '{token}'")),
    })
}

#[must_use]
pub fn satisfies(version: &Version, range: &Range) -> bool {
    range.matches(version)
}

/// Greatest version in `versions` satisfying `range_str`, as the original
/// string key. Keys that are not valid semver are skipped.
pub fn max_satisfying<'a, I>(versions: I, range_str: &str) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let range = parse_range(range_str);
    versions
        .into_iter()
        .filter_map(|s| Version::parse(s).ok().map(|v| (v, s)))
        .filter(|(v, _)| range.matches(v))
        .max_by(|a, b| a.0.cmp_precedence(&b.0))
        .map(|(_, s)| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sat(version: &str, range: &str) -> bool {
        satisfies(&Version::parse(version).unwrap(), &parse_range(range))
    }

    #[test]
    fn caret_major() {
        assert!(sat("1.2.3", "^1.0.0"));
        assert!(!sat("2.0.0", "^1.0.0"));
    }

    #[test]
    fn caret_zero_major_pins_minor() {
        assert!(sat("0.2.5", "^0.2.3"));
        assert!(!sat("0.3.0", "^0.2.3"));
    }

    #[test]
    fn caret_zero_minor_pins_patch() {
        assert!(sat("0.0.3", "^0.0.3"));
        assert!(!sat("0.0.4", "^0.0.3"));
    }

    #[test]
    fn tilde_pins_minor() {
        assert!(sat("1.2.5", "~1.2.0"));
        assert!(!sat("1.3.0", "~1.2.0"));
    }

    #[test]
    fn comparator_pairs() {
        assert!(sat("1.5.0", ">=1.0.0 <2.0.0"));
        assert!(!sat("2.0.0", ">=1.0.0 <2.0.0"));
        assert!(sat("1.0.0", ">= 1.0.0"));
        assert!(sat("0.9.0", "<1.0.0"));
    }

    #[test]
    fn or_clauses() {
        assert!(sat("1.5.0", "^1.0.0 || ^2.0.0"));
        assert!(sat("2.1.0", "^1.0.0 || ^2.0.0"));
        assert!(!sat("3.0.0", "^1.0.0 || ^2.0.0"));
    }

    #[test]
    fn hyphen_range() {
        assert!(sat("1.5.0", "1.2.3 - 2.0.0"));
        assert!(sat("2.0.0", "1.2.3 - 2.0.0"));
        assert!(!sat("2.0.1", "1.2.3 - 2.0.0"));
        assert!(!sat("1.2.2", "1.2.3 - 2.0.0"));
    }

    #[test]
    fn wildcards_match_stable_only() {
        assert!(sat("1.2.3", "*"));
        assert!(sat("1.2.3", ""));
        assert!(sat("1.2.3", "latest"));
        assert!(!sat("1.2.3-rc.1", "*"));
        assert!(!sat("1.2.3-rc.1", "latest"));
    }

    #[test]
    fn prerelease_needs_explicit_mention() {
        assert!(!sat("1.2.3-rc.1", "^1.0.0"));
        assert!(sat("1.2.3-rc.1", ">=1.2.3-rc.0 <1.2.4"));
        assert!(sat("1.2.3-rc.1", "^1.2.3-rc.0"));
        // same triple required, not just any prerelease comparator
        assert!(!sat("1.2.4-rc.1", ">=1.2.3-rc.0"));
    }

    #[test]
    fn invalid_range_matches_nothing() {
        assert!(!sat("1.2.3", "banana"));
        assert!(!sat("1.2.3", ">=1.0.0 nonsense"));
        assert!(!sat("1.2.3", "1.2.3.4"));
    }

    #[test]
    fn partial_versions_expand_to_bump_ranges() {
        assert!(sat("1.5.0", "1"));
        assert!(!sat("2.0.0", "1"));
        assert!(sat("1.2.9", "1.2"));
        assert!(!sat("1.3.0", "1.2"));
        assert!(sat("1.5.0", "1.x"));
        assert!(sat("1.2.9", "1.2.x"));
    }

    #[test]
    fn exact_without_operator() {
        assert!(sat("1.2.3", "1.2.3"));
        assert!(!sat("1.2.4", "1.2.3"));
        assert!(sat("1.2.3", "=1.2.3"));
        assert!(sat("1.2.3", "v1.2.3"));
    }

    #[test]
    fn max_satisfying_picks_greatest() {
        let versions = ["1.0.0", "1.2.0", "1.2.5", "2.0.0"];
        assert_eq!(
            max_satisfying(versions.iter().copied(), "~1.2.0").as_deref(),
            Some("1.2.5")
        );
        assert_eq!(
            max_satisfying(versions.iter().copied(), "^1.0.0").as_deref(),
            Some("1.2.5")
        );
        assert_eq!(
            max_satisfying(versions.iter().copied(), "*").as_deref(),
            Some("2.0.0")
        );
        assert_eq!(max_satisfying(versions.iter().copied(), "^3.0.0"), None);
    }

    #[test]
    fn max_satisfying_skips_prereleases_for_plain_ranges() {
        let versions = ["1.2.0", "1.3.0-beta.1"];
        assert_eq!(
            max_satisfying(versions.iter().copied(), "^1.0.0").as_deref(),
            Some("1.2.0")
        );
    }

    #[test]
    fn compare_is_a_total_order_with_prerelease_precedence() {
        let a = Version::parse("1.2.3-alpha").unwrap();
        let b = Version::parse("1.2.3-alpha.1").unwrap();
        let c = Version::parse("1.2.3-beta").unwrap();
        let d = Version::parse("1.2.3").unwrap();
        let e = Version::parse("1.2.3+build.9").unwrap();
        assert!(a < b && b < c && c < d);
        // build metadata is ignored for precedence
        assert_eq!(d.cmp_precedence(&e), std::cmp::Ordering::Equal);
    }

    #[test]
    fn prerelease_identifiers_parse() {
        let v = Version::parse("1.2.3-beta.2").unwrap();
        assert_eq!(v.pre.as_str(), "beta.2");
    }
}
