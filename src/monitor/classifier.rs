use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Behavioral category of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum AppCategory {
    #[default]
    Productive,
    Distraction,
    Communication,
}

impl AppCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppCategory::Productive => "productive",
            AppCategory::Distraction => "distraction",
            AppCategory::Communication => "communication",
        }
    }
}

impl Display for AppCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unknown values fall back to [AppCategory::Productive].
impl From<String> for AppCategory {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "distraction" => AppCategory::Distraction,
            "communication" => AppCategory::Communication,
            _ => AppCategory::Productive,
        }
    }
}

impl From<AppCategory> for &'static str {
    fn from(value: AppCategory) -> Self {
        value.as_str()
    }
}

/// Keyword table checked top to bottom. The first category with a keyword contained in the
/// lower-cased identity wins.
pub const CATEGORY_KEYWORDS: &[(AppCategory, &[&str])] = &[
    (
        AppCategory::Productive,
        &[
            "code", "visual studio", "intellij", "pycharm", "webstorm", "android studio",
            "xcode", "eclipse", "sublime", "nvim", "neovim", "emacs", "cursor", "editor", "word",
            "excel", "powerpoint", "onenote", "libreoffice", "office", "docs", "sheets",
            "notion", "obsidian", "terminal", "iterm", "powershell", "cmd", "konsole",
            "alacritty", "notepad", "figma",
        ],
    ),
    (
        AppCategory::Communication,
        &[
            "slack", "teams", "discord", "zoom", "meet", "skype", "telegram", "whatsapp",
            "signal", "messenger", "outlook", "mail", "thunderbird",
        ],
    ),
    (
        AppCategory::Distraction,
        &[
            "youtube", "netflix", "twitch", "tiktok", "instagram", "facebook", "twitter",
            "reddit", "steam", "epic games", "game", "prime video", "hulu", "9gag", "shorts",
        ],
    ),
];

/// Maps a normalized identity onto its category. Anything unknown is productive.
pub fn classify(identity: &str) -> AppCategory {
    let lower = identity.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}
