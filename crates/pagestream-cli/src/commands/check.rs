use std::path::Path;

use anyhow::{Context, Result};

use pagestream_engine::config::types::PipelineConfig;
use pagestream_engine::config::{parser, validator};
use pagestream_state::SqliteWatermarkStore;

/// Execute the `check` command: validate pipeline config, connector paths,
/// and the watermark store.
pub async fn execute(pipeline_path: &Path) -> Result<()> {
    // 1. Parse pipeline YAML
    let config = parser::parse_pipeline(pipeline_path)
        .with_context(|| format!("Failed to parse pipeline: {}", pipeline_path.display()))?;

    // 2. Validate pipeline structure
    validator::validate_pipeline(&config)?;
    println!("Pipeline structure: OK");

    // 3. Check connectors and state
    let source_ok = check_source(&config);
    let sink_ok = check_sink(&config);
    let state_ok = check_state(&config);

    if source_ok && sink_ok && state_ok {
        println!("\nAll checks passed.");
        Ok(())
    } else {
        anyhow::bail!("One or more checks failed")
    }
}

fn check_source(config: &PipelineConfig) -> bool {
    match connector_path(&config.source.config) {
        Some(path) if Path::new(path).is_file() => {
            println!("Source:            OK");
            true
        }
        Some(path) => {
            println!("Source:            FAILED");
            println!("  file not found: {path}");
            false
        }
        None => {
            println!("Source:            FAILED");
            println!("  connector config requires 'path'");
            false
        }
    }
}

fn check_sink(config: &PipelineConfig) -> bool {
    match connector_path(&config.sink.config) {
        Some(path) => {
            // the sink creates the file itself; its directory must exist
            let dir = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty());
            if dir.map_or(true, Path::is_dir) {
                println!("Sink:              OK");
                true
            } else {
                println!("Sink:              FAILED");
                println!("  directory not found for: {path}");
                false
            }
        }
        None => {
            println!("Sink:              FAILED");
            println!("  connector config requires 'path'");
            false
        }
    }
}

fn check_state(config: &PipelineConfig) -> bool {
    match SqliteWatermarkStore::open(Path::new(&config.state.path)) {
        Ok(_) => {
            println!("State backend:     OK");
            true
        }
        Err(e) => {
            println!("State backend:     FAILED");
            println!("  {e}");
            false
        }
    }
}

fn connector_path(config: &serde_yaml::Value) -> Option<&str> {
    config.get("path").and_then(serde_yaml::Value::as_str)
}
