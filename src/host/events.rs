use serde::Deserialize;

/// The host told us the foreground window changed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivityEvent {
    /// Window title. For example 'YouTube - Cat Videos'
    #[serde(default)]
    pub title: String,
    /// Owning application, when the host knows it.
    #[serde(default)]
    pub owner: Option<String>,
}

impl ActivityEvent {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            owner: None,
        }
    }

    pub fn with_owner(self, owner: impl Into<String>) -> Self {
        Self {
            owner: Some(owner.into()),
            ..self
        }
    }

    /// The owner wins over the title when present and not blank.
    pub fn app_name(&self) -> &str {
        self.owner
            .as_deref()
            .filter(|owner| !owner.trim().is_empty())
            .unwrap_or(&self.title)
    }
}

/// Everything the host can send through the inbound port, one json object per line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostEvent {
    ActivityChanged(ActivityEvent),
    #[serde(rename_all = "camelCase")]
    SetUser { user_id: String },
    SetFocusMode { enabled: bool },
    SetWhitelist { whitelist: Vec<String> },
    SetDimOption { dim: bool },
    ResetNotifications,
    #[serde(rename_all = "camelCase")]
    NotificationDismissed { notification_id: String },
    /// The host is being suspended or backgrounded.
    Suspend,
    Snapshot,
}

impl HostEvent {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}
