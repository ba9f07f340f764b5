//! Per-unit stage timings.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy)]
struct Sample {
  total: Duration,
  count: usize,
}

/// Wall-clock durations recorded by pipeline stages, keyed by unit and stage.
#[derive(Debug, Default)]
pub struct Statistics {
  samples: Mutex<BTreeMap<(String, String), Sample>>,
}

impl Statistics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record(&self, unit: &str, stage: &str, elapsed: Duration) {
    let mut samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
    let sample = samples.entry((unit.to_string(), stage.to_string())).or_default();
    sample.total += elapsed;
    sample.count += 1;
  }

  /// Number of recorded invocations of `stage` across all units.
  pub fn count(&self, stage: &str) -> usize {
    self.by_stage().get(stage).map(|s| s.count).unwrap_or(0)
  }

  /// Total time spent in `stage` across all units.
  pub fn total(&self, stage: &str) -> Duration {
    self.by_stage().get(stage).map(|s| s.total).unwrap_or_default()
  }

  /// Total time spent building `unit` across all stages.
  pub fn unit_total(&self, unit: &str) -> Duration {
    let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
    samples
      .iter()
      .filter(|((u, _), _)| u == unit)
      .map(|(_, s)| s.total)
      .sum()
  }

  fn by_stage(&self) -> BTreeMap<String, Sample> {
    let samples = self.samples.lock().unwrap_or_else(|e| e.into_inner());
    let mut out: BTreeMap<String, Sample> = BTreeMap::new();
    for ((_, stage), sample) in samples.iter() {
      let entry = out.entry(stage.clone()).or_default();
      entry.total += sample.total;
      entry.count += sample.count;
    }
    out
  }
}

impl fmt::Display for Statistics {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let stages = self.by_stage();
    let parts: Vec<String> = stages
      .iter()
      .map(|(stage, s)| format!("{}:{:?}({})", stage, s.total, s.count))
      .collect();
    write!(f, "[{}]", parts.join(" "))
  }
}
