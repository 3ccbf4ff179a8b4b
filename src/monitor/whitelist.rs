/// Identities that are never subject to focus mode: the monitor's own host and the developer
/// tooling it runs next to.
pub const DEFAULT_EXEMPT: &[&str] = &["focuswatch", "electron", "devtools", "code", "terminal"];

/// Case-insensitive, bidirectional substring match. 'VSCode' matches 'code' and 'code'
/// matches 'VSCode'. Empty entries never match anything.
fn fuzzy_matches(identity: &str, entry: &str) -> bool {
    let entry = entry.trim().to_lowercase();
    if entry.is_empty() {
        return false;
    }
    identity.contains(&entry) || entry.contains(identity)
}

fn matches_any<'a>(identity: &str, entries: impl IntoIterator<Item = &'a str>) -> bool {
    entries.into_iter().any(|entry| fuzzy_matches(identity, entry))
}

pub fn is_default_exempt<'a>(identity: &str, default_exempt: impl IntoIterator<Item = &'a str>) -> bool {
    let identity = identity.trim().to_lowercase();
    !identity.is_empty() && matches_any(&identity, default_exempt)
}

/// Checks whether `identity` is compliant with focus mode. Default-exempt entries are
/// consulted first, then the user's whitelist.
pub fn is_allowed<'a, 'b>(
    identity: &str,
    whitelist: impl IntoIterator<Item = &'a str>,
    default_exempt: impl IntoIterator<Item = &'b str>,
) -> bool {
    let identity = identity.trim().to_lowercase();
    if identity.is_empty() {
        return false;
    }
    matches_any(&identity, default_exempt) || matches_any(&identity, whitelist)
}
