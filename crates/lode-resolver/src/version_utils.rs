use semver::Version;

/// Parse a version string leniently: an optional leading `v`, zero-filled
/// partial versions (`1`, `1.2`), and `x`/`X`/`*` placeholders treated as
/// zero. Full semver strings (prerelease, build metadata) pass straight
/// through to the strict parser.
pub fn parse_version(version_str: &str) -> Result<Version, String> {
    let cleaned = version_str.trim().trim_start_matches('v');

    if cleaned.is_empty() {
        return Err("empty version string".to_string());
    }

    if let Ok(version) = Version::parse(cleaned) {
        return Ok(version);
    }

    let parts: Vec<&str> = cleaned.split('.').collect();
    if parts.len() > 3 {
        return Err(format!("invalid version '{cleaned}'"));
    }

    let mut nums = [0u64; 3];
    for (i, part) in parts.iter().enumerate() {
        if is_x_component(part) {
            continue;
        }
        nums[i] = part
            .parse::<u64>()
            .map_err(|_| format!("invalid version component '{part}' in '{cleaned}'"))?;
    }

    Ok(Version::new(nums[0], nums[1], nums[2]))
}

/// `x`, `X` and `*` stand for "any" in npm range shorthand.
#[must_use]
pub fn is_x_component(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}
