use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for pipeline orchestration events.
///
/// Use cases report through this trait instead of logging directly, so the
/// CLI can print a summary, the desktop app can stay quiet and tests can
/// inspect what was recorded.
pub trait PipelineLogger: Send {
    /// Report frame-level progress. `total` is 0 when unknown (live).
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (faces per frame, result lag).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Milliseconds since `since`, for [`PipelineLogger::timing`].
pub fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

/// Discards every event.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate of one timing stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stat {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

impl Stat {
    fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Logs through the `log` facade: throttled progress lines while running
/// and a per-stage table at the end.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Stat>,
    metrics: BTreeMap<String, Stat>,
    start_time: Instant,
    frames_seen: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    pub fn timing_stat(&self, stage: &str) -> Option<Stat> {
        self.timings.get(stage).copied()
    }

    pub fn metric_stat(&self, name: &str) -> Option<Stat> {
        self.metrics.get(name).copied()
    }

    /// Formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Run summary ({} frames, {elapsed_s:.1}s):",
            self.frames_seen
        )];

        for (stage, stat) in &self.timings {
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                stat.mean(),
                stat.max,
                stat.total
            ));
        }
        for (name, stat) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}  max {:.1}", stat.mean(), stat.max));
        }
        if self.frames_seen > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps",
                self.frames_seen as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(25)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = self.frames_seen.max(current);
        if current % self.throttle_frames != 0 && current != total {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Processing: {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().record(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
