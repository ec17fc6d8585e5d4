use crate::config::{CompanionSection, SinkKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use callscreen_lookup::{CompanionSink, NullSink, SinkError};
use callscreen_protocol::{serialize_json, CallEvent};
use reqwest::Client;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// Writes each event as one JSON line on stdout.
pub struct StdoutSink;

#[async_trait]
impl CompanionSink for StdoutSink {
    async fn emit(&self, event: CallEvent) -> Result<(), SinkError> {
        let line = serialize_json(&event).map_err(|err| SinkError::Delivery(err.to_string()))?;
        write_line(&mut io::stdout().lock(), &line)
    }
}

/// A closed reader (broken pipe) reports `SinkError::Closed`.
fn write_line(out: &mut impl Write, line: &str) -> Result<(), SinkError> {
    out.write_all(line.as_bytes())
        .and_then(|()| out.write_all(b"\n"))
        .and_then(|()| out.flush())
        .map_err(|err| match err.kind() {
            io::ErrorKind::BrokenPipe => SinkError::Closed,
            _ => SinkError::Delivery(err.to_string()),
        })
}

/// POSTs each event as JSON to the companion application's endpoint.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CompanionSink for WebhookSink {
    async fn emit(&self, event: CallEvent) -> Result<(), SinkError> {
        self.client
            .post(&self.url)
            .json(&event)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| SinkError::Delivery(format!("POST {}: {err}", self.url)))?;
        log::debug!("Delivered {} to {}", event.kind(), self.url);
        Ok(())
    }
}

pub fn build_sink(cfg: &CompanionSection) -> Result<Arc<dyn CompanionSink>> {
    let sink: Arc<dyn CompanionSink> = match cfg.sink {
        SinkKind::Stdout => Arc::new(StdoutSink),
        SinkKind::Webhook => {
            let url = cfg
                .webhook_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .context(
                    "Webhook sink requires companion.webhook_url (or CALLSCREEN_WEBHOOK_URL)",
                )?;
            Arc::new(WebhookSink::new(url)?)
        }
        SinkKind::Disabled => Arc::new(NullSink),
    };
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_sink_needs_url() {
        let cfg = CompanionSection {
            sink: SinkKind::Webhook,
            webhook_url: None,
        };
        let err = build_sink(&cfg).err().expect("missing url must fail");
        assert!(err.to_string().contains("webhook_url"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writes_one_line_per_event() {
        let mut out = Vec::new();
        write_line(&mut out, r#"{"type":"call_ended","timestamp_ms":1}"#).unwrap();
        assert_eq!(out, b"{\"type\":\"call_ended\",\"timestamp_ms\":1}\n");
    }

    #[test]
    fn broken_pipe_reports_closed() {
        let err = write_line(&mut ClosedPipe, "{}").unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }

    #[tokio::test]
    async fn webhook_delivery_failure_is_reported() {
        // port 9 (discard) on loopback is not listening in test environments
        let sink = WebhookSink::new("http://127.0.0.1:9/events").unwrap();
        let err = sink.emit(CallEvent::ended()).await.unwrap_err();
        assert!(matches!(err, SinkError::Delivery(_)));
    }
}
