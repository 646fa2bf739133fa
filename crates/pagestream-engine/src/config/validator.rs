//! Semantic validation for parsed pipeline configuration values.

use anyhow::{bail, Result};

use crate::config::types::{parse_byte_size, PipelineConfig};

/// Validate a parsed pipeline configuration.
/// Returns `Ok(())` if valid, Err with all validation errors if not.
///
/// # Errors
///
/// Returns an error listing all validation failures found in the pipeline
/// config.
pub fn validate_pipeline(config: &PipelineConfig) -> Result<()> {
    let mut errors = Vec::new();

    if config.version != "1.0" {
        errors.push(format!(
            "Unsupported pipeline version '{}', expected '1.0'",
            config.version
        ));
    }

    if config.pipeline.trim().is_empty() {
        errors.push("Pipeline name must not be empty".to_string());
    }

    if config.stream_key.trim().is_empty() {
        errors.push("stream_key must not be empty".to_string());
    }

    if config.source.use_ref.trim().is_empty() {
        errors.push("Source connector reference (use) must not be empty".to_string());
    }

    if config.sink.use_ref.trim().is_empty() {
        errors.push("Sink connector reference (use) must not be empty".to_string());
    }

    if config.state.path.trim().is_empty() {
        errors.push("state.path must not be empty".to_string());
    }

    if config.extraction.page_size == 0 {
        errors.push("extraction.page_size must be at least 1".to_string());
    }

    validate_delivery(config, &mut errors);
    validate_run(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        bail!("Pipeline validation failed:\n  - {}", errors.join("\n  - "));
    }
}

fn validate_delivery(config: &PipelineConfig, errors: &mut Vec<String>) {
    let delivery = &config.delivery;

    if delivery.max_items_per_chunk == 0 {
        errors.push("delivery.max_items_per_chunk must be at least 1".to_string());
    }
    if delivery.max_items_per_chunk > 500 {
        errors.push(format!(
            "delivery.max_items_per_chunk {} exceeds the sink limit of 500 records per request",
            delivery.max_items_per_chunk
        ));
    }
    if delivery.request_backoff_base_secs == 0 {
        errors.push("delivery.request_backoff_base_secs must be at least 1".to_string());
    }

    let chunk_bytes = match parse_byte_size(&delivery.max_chunk_bytes) {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(format!(
                "delivery.max_chunk_bytes: invalid byte size '{}'",
                delivery.max_chunk_bytes
            ));
            None
        }
    };
    let record_bytes = match parse_byte_size(&delivery.max_record_bytes) {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(format!(
                "delivery.max_record_bytes: invalid byte size '{}'",
                delivery.max_record_bytes
            ));
            None
        }
    };
    if let (Some(chunk), Some(record)) = (chunk_bytes, record_bytes) {
        if record > chunk {
            errors.push(format!(
                "delivery.max_record_bytes ({record}) must not exceed delivery.max_chunk_bytes ({chunk})"
            ));
        }
        if chunk == 0 || record == 0 {
            errors.push("delivery byte limits must be non-zero".to_string());
        }
    }
}

fn validate_run(config: &PipelineConfig, errors: &mut Vec<String>) {
    let run = &config.run;
    if run.max_run_time_secs <= run.safety_margin_secs {
        errors.push(format!(
            "run.max_run_time_secs ({}) must exceed run.safety_margin_secs ({})",
            run.max_run_time_secs, run.safety_margin_secs
        ));
    }
    if run.stall_threshold == 0 {
        errors.push("run.stall_threshold must be at least 1".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_pipeline_str;

    fn valid_yaml() -> &'static str {
        r#"
version: "1.0"
pipeline: website_events
stream_key: page-view-stream
source:
  use: source-jsonl
  config:
    path: /data/in.jsonl
sink:
  use: sink-jsonl
  config:
    path: /data/out.jsonl
"#
    }

    #[test]
    fn valid_pipeline_passes() {
        let config = parse_pipeline_str(valid_yaml()).unwrap();
        assert!(validate_pipeline(&config).is_ok());
    }

    #[test]
    fn wrong_version_fails() {
        let yaml = valid_yaml().replace("\"1.0\"", "\"2.0\"");
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("Unsupported pipeline version"));
    }

    #[test]
    fn empty_pipeline_name_fails() {
        let yaml = valid_yaml().replace("website_events", "");
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("Pipeline name must not be empty"));
    }

    #[test]
    fn empty_stream_key_fails() {
        let yaml = valid_yaml().replace("page-view-stream", "\"\"");
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("stream_key"));
    }

    #[test]
    fn chunk_size_over_sink_limit_fails() {
        let yaml = format!(
            "{}\ndelivery:\n  max_items_per_chunk: 501\n",
            valid_yaml().trim_end()
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("sink limit of 500"));
    }

    #[test]
    fn invalid_byte_size_fails() {
        let yaml = format!(
            "{}\ndelivery:\n  max_chunk_bytes: not-a-size\n",
            valid_yaml().trim_end()
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("max_chunk_bytes"));
    }

    #[test]
    fn record_limit_over_chunk_limit_fails() {
        let yaml = format!(
            "{}\ndelivery:\n  max_chunk_bytes: 1kb\n  max_record_bytes: 2kb\n",
            valid_yaml().trim_end()
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("must not exceed"));
    }

    #[test]
    fn run_budget_below_margin_fails() {
        let yaml = format!(
            "{}\nrun:\n  max_run_time_secs: 10\n  safety_margin_secs: 20\n",
            valid_yaml().trim_end()
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("must exceed run.safety_margin_secs"));
    }

    #[test]
    fn zero_page_size_fails() {
        let yaml = format!(
            "{}\nextraction:\n  page_size: 0\n",
            valid_yaml().trim_end()
        );
        let config = parse_pipeline_str(&yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("page_size"));
    }

    #[test]
    fn all_errors_reported_together() {
        let yaml = r#"
version: "2.0"
pipeline: ""
stream_key: ""
source:
  use: ""
  config: {}
sink:
  use: ""
  config: {}
"#;
        let config = parse_pipeline_str(yaml).unwrap();
        let err = validate_pipeline(&config).unwrap_err().to_string();
        assert!(err.contains("Unsupported pipeline version"));
        assert!(err.contains("Pipeline name"));
        assert!(err.contains("stream_key"));
        assert!(err.contains("Source connector"));
        assert!(err.contains("Sink connector"));
    }
}
