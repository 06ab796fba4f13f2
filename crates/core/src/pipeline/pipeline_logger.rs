use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Shared across face workers, so every method takes `&self`.
pub trait PipelineLogger: Send + Sync {
    /// Report how many faces of the current image are done.
    fn progress(&self, current: usize, total: usize);

    /// Record how long a named pipeline stage took.
    fn timing(&self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. face count).
    fn metric(&self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&self, _current: usize, _total: usize) {}
    fn timing(&self, _stage: &str, _duration_ms: f64) {}
    fn metric(&self, _name: &str, _value: f64) {}
    fn info(&self, _message: &str) {}
}

#[derive(Default)]
struct Records {
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    faces: usize,
}

/// CLI-oriented logger that tracks per-stage timing and metrics and
/// prints a summary at the end of a run.
pub struct StdoutPipelineLogger {
    records: Mutex<Records>,
    start_time: Instant,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Records::default()),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        let records = self.records.lock().ok()?;
        if records.timings.is_empty() && records.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({} faces, {:.1}s total):",
            records.faces,
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = records.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &records.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len().max(1) as f64;
            lines.push(format!(
                "  {stage:12}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms  (n={})",
                durations.len()
            ));
        }

        let mut metric_names: Vec<_> = records.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            let values = &records.metrics[name];
            let avg = values.iter().sum::<f64>() / values.len().max(1) as f64;
            lines.push(format!("  {name}: avg {avg:.1}"));
        }

        Some(lines.join("\n"))
    }

    /// Returns the timing data for a given stage.
    pub fn timings_for(&self, stage: &str) -> Option<Vec<f64>> {
        self.records.lock().ok()?.timings.get(stage).cloned()
    }

    /// Returns the metric data for a given name.
    pub fn metrics_for(&self, name: &str) -> Option<Vec<f64>> {
        self.records.lock().ok()?.metrics.get(name).cloned()
    }

    fn with_records(&self, f: impl FnOnce(&mut Records)) {
        if let Ok(mut records) = self.records.lock() {
            f(&mut records);
        }
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&self, current: usize, total: usize) {
        if current == total {
            self.with_records(|r| r.faces += total);
        }
        log::debug!("Classified {current}/{total} faces");
    }

    fn timing(&self, stage: &str, duration_ms: f64) {
        self.with_records(|r| {
            r.timings
                .entry(stage.to_string())
                .or_default()
                .push(duration_ms)
        });
    }

    fn metric(&self, name: &str, value: f64) {
        self.with_records(|r| r.metrics.entry(name.to_string()).or_default().push(value));
    }

    fn info(&self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
