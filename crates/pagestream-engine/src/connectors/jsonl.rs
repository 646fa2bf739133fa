//! JSON-lines file connectors.
//!
//! `JsonlFileSource` reads one interaction record per line and serves
//! windowed, paged queries over them. `JsonlFileSink` appends submitted
//! record bytes verbatim and reports every record as accepted. Both exist
//! for local runs and integration tests, not production throughput.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pagestream_types::error::{SinkError, SourceError};
use pagestream_types::record::{InteractionRecord, SinkRecord};
use tokio::io::AsyncWriteExt;

use crate::sink::{BatchResponse, IngestionSink};
use crate::source::{BatchCursor, ExtractionSource, QueryWindow};

/// Windowed source over a JSON-lines file of interaction records.
pub struct JsonlFileSource {
    path: PathBuf,
}

impl JsonlFileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ExtractionSource for JsonlFileSource {
    async fn query_window(
        &self,
        window: &QueryWindow,
    ) -> Result<Box<dyn BatchCursor>, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;

        let mut matched = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: InteractionRecord = serde_json::from_str(line)?;
            if window.contains(record.start_time) {
                matched.push(record);
            }
        }

        let pages: VecDeque<Vec<InteractionRecord>> = matched
            .chunks(window.page_size.max(1))
            .map(<[InteractionRecord]>::to_vec)
            .collect();

        tracing::debug!(
            path = %self.path.display(),
            records = pages.iter().map(Vec::len).sum::<usize>(),
            pages = pages.len(),
            "Windowed query matched records"
        );

        Ok(Box::new(JsonlCursor { pages }))
    }
}

struct JsonlCursor {
    pages: VecDeque<Vec<InteractionRecord>>,
}

#[async_trait]
impl BatchCursor for JsonlCursor {
    async fn next_batch(&mut self) -> Result<Option<Vec<InteractionRecord>>, SourceError> {
        Ok(self.pages.pop_front())
    }
}

/// Append-only sink writing record bytes to a local file.
pub struct JsonlFileSink {
    path: PathBuf,
}

impl JsonlFileSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(path: &Path, err: &std::io::Error) -> SinkError {
        SinkError::Service {
            status: 500,
            message: format!("write to {} failed: {err}", path.display()),
        }
    }
}

#[async_trait]
impl IngestionSink for JsonlFileSink {
    async fn put_record_batch(&self, records: &[SinkRecord]) -> Result<BatchResponse, SinkError> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Self::io_error(&self.path, &e))?;

        for record in records {
            file.write_all(record.as_bytes())
                .await
                .map_err(|e| Self::io_error(&self.path, &e))?;
        }
        file.flush()
            .await
            .map_err(|e| Self::io_error(&self.path, &e))?;

        Ok(BatchResponse::all_ok(records.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pagestream_types::record::PageViewEvent;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn interaction(id: &str, start: &str) -> InteractionRecord {
        InteractionRecord {
            interaction_id: id.into(),
            contact_id: format!("contact-{id}"),
            start_time: ts(start),
            site_name: None,
            ip_address: None,
            email_address: None,
            user_agent: None,
            page_views: vec![PageViewEvent {
                event_id: format!("{id}-ev0"),
                timestamp: ts(start),
                url: "/".into(),
                duration_seconds: 1,
            }],
        }
    }

    fn write_source_file(records: &[InteractionRecord]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut content = String::new();
        for rec in records {
            content.push_str(&serde_json::to_string(rec).unwrap());
            content.push('\n');
        }
        std::fs::write(file.path(), content).unwrap();
        file
    }

    async fn drain(mut cursor: Box<dyn BatchCursor>) -> Vec<Vec<InteractionRecord>> {
        let mut batches = Vec::new();
        while let Some(batch) = cursor.next_batch().await.unwrap() {
            batches.push(batch);
        }
        batches
    }

    #[tokio::test]
    async fn source_filters_by_window() {
        let file = write_source_file(&[
            interaction("before", "2026-08-01T09:00:00Z"),
            interaction("inside", "2026-08-01T10:30:00Z"),
            interaction("after", "2026-08-01T12:00:00Z"),
        ]);
        let source = JsonlFileSource::new(file.path());
        let window = QueryWindow {
            after: ts("2026-08-01T10:00:00Z"),
            until: ts("2026-08-01T11:00:00Z"),
            page_size: 100,
        };
        let batches = drain(source.query_window(&window).await.unwrap()).await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].interaction_id, "inside");
    }

    #[tokio::test]
    async fn source_pages_by_page_size() {
        let records: Vec<InteractionRecord> = (0..5)
            .map(|i| interaction(&format!("r{i}"), "2026-08-01T10:30:00Z"))
            .collect();
        let file = write_source_file(&records);
        let source = JsonlFileSource::new(file.path());
        let window = QueryWindow {
            after: ts("2026-08-01T10:00:00Z"),
            until: ts("2026-08-01T11:00:00Z"),
            page_size: 2,
        };
        let batches = drain(source.query_window(&window).await.unwrap()).await;
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(batches[0][0].interaction_id, "r0");
        assert_eq!(batches[2][0].interaction_id, "r4");
    }

    #[tokio::test]
    async fn source_empty_window_yields_no_batches() {
        let file = write_source_file(&[interaction("a", "2026-08-01T09:00:00Z")]);
        let source = JsonlFileSource::new(file.path());
        let window = QueryWindow {
            after: ts("2026-08-01T10:00:00Z"),
            until: ts("2026-08-01T11:00:00Z"),
            page_size: 100,
        };
        let batches = drain(source.query_window(&window).await.unwrap()).await;
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn source_missing_file_is_an_io_error() {
        let source = JsonlFileSource::new("/nonexistent/interactions.jsonl");
        let window = QueryWindow {
            after: ts("2026-08-01T10:00:00Z"),
            until: ts("2026-08-01T11:00:00Z"),
            page_size: 100,
        };
        let err = source.query_window(&window).await.unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }

    #[tokio::test]
    async fn source_bad_line_is_a_decode_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json\n").unwrap();
        let source = JsonlFileSource::new(file.path());
        let window = QueryWindow {
            after: ts("2026-08-01T10:00:00Z"),
            until: ts("2026-08-01T11:00:00Z"),
            page_size: 100,
        };
        let err = source.query_window(&window).await.unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[tokio::test]
    async fn sink_appends_record_bytes_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let sink = JsonlFileSink::new(&path);

        let first = vec![SinkRecord::new(&b"{\"n\":1}\n"[..])];
        let second = vec![
            SinkRecord::new(&b"{\"n\":2}\n"[..]),
            SinkRecord::new(&b"{\"n\":3}\n"[..]),
        ];
        let resp = sink.put_record_batch(&first).await.unwrap();
        assert_eq!(resp.failed_count(), 0);
        assert_eq!(resp.entries.len(), 1);
        sink.put_record_batch(&second).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"n\":1}\n{\"n\":2}\n{\"n\":3}\n");
    }

    #[tokio::test]
    async fn sink_unwritable_path_is_a_service_error() {
        let sink = JsonlFileSink::new("/nonexistent/dir/out.jsonl");
        let err = sink
            .put_record_batch(&[SinkRecord::new(&b"{}\n"[..])])
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
