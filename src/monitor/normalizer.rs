use std::sync::LazyLock;

use regex::Regex;

/// A dash (hyphen, en-dash, em-dash) or pipe surrounded by spaces, a colon, or any digit.
static TITLE_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s[-\u{2013}\u{2014}]\s|\s\|\s|:|\d").expect("separator pattern is valid")
});

/// Extracts the application identity from a raw window title. For example
/// 'YouTube - Cat Videos' becomes 'YouTube' and 'Slack | general' becomes 'Slack'.
///
/// An empty result means there is no active window.
pub fn normalize_identity(raw_title: &str) -> String {
    let title = raw_title.trim();
    let leading = match TITLE_SEPARATOR.find(title) {
        Some(separator) => title[..separator.start()].trim(),
        None => title,
    };

    // Titles that start with a separator ('1Password', ': untitled') have no leading segment.
    if leading.is_empty() {
        title.to_string()
    } else {
        leading.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_identity;

    #[test]
    fn test_normalize_plain_name() {
        assert_eq!(normalize_identity("Visual Studio Code"), "Visual Studio Code");
        assert_eq!(normalize_identity("  Slack  "), "Slack");
    }

    #[test]
    fn test_normalize_dash_separators() {
        assert_eq!(normalize_identity("YouTube - Cat Videos"), "YouTube");
        assert_eq!(normalize_identity("Spotify \u{2013} Daily Mix"), "Spotify");
        assert_eq!(normalize_identity("Notion \u{2014} Roadmap"), "Notion");
    }

    #[test]
    fn test_normalize_hyphen_without_spaces_is_kept() {
        assert_eq!(normalize_identity("Notepad-Plus"), "Notepad-Plus");
    }

    #[test]
    fn test_normalize_pipe_colon_and_digit() {
        assert_eq!(normalize_identity("Slack | general"), "Slack");
        assert_eq!(normalize_identity("Terminal: ~/src"), "Terminal");
        assert_eq!(normalize_identity("Inbox 42 unread"), "Inbox");
    }

    #[test]
    fn test_normalize_empty_title() {
        assert_eq!(normalize_identity(""), "");
        assert_eq!(normalize_identity("   "), "");
    }

    #[test]
    fn test_normalize_leading_separator_keeps_title() {
        assert_eq!(normalize_identity("1Password"), "1Password");
    }
}
