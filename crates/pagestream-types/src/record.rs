//! Interaction records, the flattened page-view payload, and sink records.
//!
//! An [`InteractionRecord`] is what the extraction source yields: one site
//! visit with its facets and the page-view events it contained. The engine
//! flattens it into one [`PageViewRecord`] per event, then serializes each
//! payload into a [`SinkRecord`] for batch submission.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One page view inside an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    /// View duration in whole seconds.
    #[serde(default)]
    pub duration_seconds: i64,
}

/// Upstream interaction record with its expanded facets.
///
/// `start_time` is the event time the extraction window filters on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub interaction_id: String,
    pub contact_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub page_views: Vec<PageViewEvent>,
}

/// Flattened delivery payload: one page view with its interaction context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewRecord {
    pub page_view_event_id: String,
    /// RFC 3339 UTC event time.
    pub event_timestamp: String,
    pub interaction_id: String,
    pub contact_id: String,
    pub url: String,
    pub duration_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Serialized payload ready for batch submission to the sink.
///
/// The wire format is one JSON document terminated by a single `\n`, so a
/// downstream consumer can treat the delivery stream as JSON lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkRecord {
    data: Bytes,
}

impl SinkRecord {
    /// Wrap already-serialized bytes.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Serialize a payload as JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error if the payload cannot be
    /// serialized.
    pub fn from_payload<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        let mut buf = serde_json::to_vec(payload)?;
        buf.push(b'\n');
        Ok(Self { data: buf.into() })
    }

    /// Serialized size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the serialized bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> PageViewRecord {
        PageViewRecord {
            page_view_event_id: "ev-1".into(),
            event_timestamp: "2026-08-01T10:00:00Z".into(),
            interaction_id: "int-1".into(),
            contact_id: "c-1".into(),
            url: "/pricing".into(),
            duration_seconds: 12,
            site_name: Some("website".into()),
            email_address: None,
            user_agent: Some("Mozilla/5.0".into()),
            ip_address: Some("10.0.0.1".into()),
        }
    }

    #[test]
    fn sink_record_is_json_line() {
        let rec = SinkRecord::from_payload(&payload()).unwrap();
        let bytes = rec.as_bytes();
        assert_eq!(bytes.last(), Some(&b'\n'));
        let back: PageViewRecord = serde_json::from_slice(&bytes[..bytes.len() - 1]).unwrap();
        assert_eq!(back, payload());
    }

    #[test]
    fn sink_record_len_counts_newline() {
        let rec = SinkRecord::new(&b"{}"[..]);
        assert_eq!(rec.len(), 2);
        assert!(!rec.is_empty());
    }

    #[test]
    fn interaction_record_optional_facets_deserialize() {
        let json = r#"{
            "interaction_id": "int-1",
            "contact_id": "c-1",
            "start_time": "2026-08-01T10:00:00Z",
            "page_views": [
                {"event_id": "ev-1", "timestamp": "2026-08-01T10:00:05Z", "url": "/"}
            ]
        }"#;
        let rec: InteractionRecord = serde_json::from_str(json).unwrap();
        assert!(rec.site_name.is_none());
        assert_eq!(rec.page_views.len(), 1);
        assert_eq!(rec.page_views[0].duration_seconds, 0);
    }

    #[test]
    fn page_view_record_skips_absent_facets() {
        let mut p = payload();
        p.email_address = None;
        p.site_name = None;
        let json = serde_json::to_string(&p).unwrap();
        assert!(!json.contains("email_address"));
        assert!(!json.contains("site_name"));
    }
}
