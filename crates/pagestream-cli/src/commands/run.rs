use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use pagestream_engine::config::{parser, validator};
use pagestream_engine::Pipeline;

/// Execute the `run` command: parse, validate, wire, and run a pipeline.
pub async fn execute(pipeline_path: &Path, once: bool, max_run_time_secs: Option<u64>) -> Result<()> {
    // 1. Parse pipeline YAML
    let config = parser::parse_pipeline(pipeline_path)
        .with_context(|| format!("Failed to parse pipeline: {}", pipeline_path.display()))?;

    // 2. Validate
    validator::validate_pipeline(&config)?;

    tracing::info!(
        pipeline = config.pipeline,
        stream_key = config.stream_key,
        source = config.source.use_ref,
        sink = config.sink.use_ref,
        "Pipeline validated"
    );

    // 3. Wire and run
    let pipeline = Pipeline::from_config(&config)?;
    let started = Instant::now();

    if once {
        let result = pipeline.run_once().await?;
        println!("Pipeline '{}' completed one iteration.", config.pipeline);
        println!("  Window:      ({}, {}]", result.window_start, result.window_end);
        println!("  Batches:     {}", result.batches);
        println!("  Delivered:   {}", result.delivered);
        println!("  Dropped:     {}", result.dropped);
        println!(
            "  Watermark:   {}",
            if result.watermark_advanced { "advanced" } else { "held" }
        );
        println!("  Duration:    {:.2}s", started.elapsed().as_secs_f64());
        return Ok(());
    }

    let budget = Duration::from_secs(max_run_time_secs.unwrap_or(config.run.max_run_time_secs));
    let report = pipeline.run(budget).await;

    println!("Pipeline '{}' completed.", config.pipeline);
    println!("  Iterations:  {}", report.iterations);
    println!("  Failures:    {}", report.failures);
    println!("  Delivered:   {}", report.delivered);
    println!("  Dropped:     {}", report.dropped);
    println!("  Duration:    {:.2}s", started.elapsed().as_secs_f64());

    Ok(())
}
