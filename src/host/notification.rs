use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

/// Request for the host to show a notification. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    pub title: String,
    pub body: String,
    pub notification_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedupe_key: Option<String>,
}

/// Outbound port towards the host's native notifications.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationSink: Send {
    fn notify(&mut self, request: &NotificationRequest) -> Result<()>;
}

/// Writes every request as a json line. This is how the binary talks back to its host.
pub struct JsonLineSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> NotificationSink for JsonLineSink<W> {
    fn notify(&mut self, request: &NotificationRequest) -> Result<()> {
        debug!("Dispatching notification {}", request.notification_id);
        let mut line = serde_json::to_vec(request)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonLineSink, NotificationRequest, NotificationSink};

    #[test]
    fn test_json_line_sink() {
        let mut sink = JsonLineSink::new(Vec::<u8>::new());
        sink.notify(&NotificationRequest {
            title: "Focus mode".into(),
            body: "body".into(),
            notification_id: "focus-violation-YouTube".into(),
            dedupe_key: None,
        })
        .unwrap();

        let written = String::from_utf8(sink.writer).unwrap();
        assert_eq!(
            written,
            "{\"title\":\"Focus mode\",\"body\":\"body\",\"notificationId\":\"focus-violation-YouTube\"}\n"
        );
    }
}
