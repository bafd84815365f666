//! Engine statistics for `--stats` output.

use std::time::{Duration, Instant};

/// Counters and phase timings collected by an [`Engine`](crate::engine::Engine).
///
/// Threaded into the analysis as `Option<&mut Stats>`.
#[derive(Debug, Clone)]
pub struct Stats {
    started: Instant,
    phases: Vec<(&'static str, Duration)>,
    /// Full resolve/build/solve passes.
    pub solves: u32,
    /// Measurements answered from the cached solution.
    pub cache_hits: u32,
    /// Topology changes that dropped a cached solution.
    pub invalidations: u32,
    pub linear_solves: u32,
    pub degenerate_fallbacks: u32,
    pub islands_solved: u32,
    pub islands_skipped: u32,
    pub measurements: u32,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            phases: Vec::new(),
            solves: 0,
            cache_hits: 0,
            invalidations: 0,
            linear_solves: 0,
            degenerate_fallbacks: 0,
            islands_solved: 0,
            islands_skipped: 0,
            measurements: 0,
        }
    }

    /// Accumulate time spent in a named phase.
    pub fn add_phase(&mut self, name: &'static str, duration: Duration) {
        match self.phases.iter_mut().find(|(n, _)| *n == name) {
            Some((_, total)) => *total += duration,
            None => self.phases.push((name, duration)),
        }
    }

    pub fn phase(&self, name: &str) -> Option<Duration> {
        self.phases.iter().find(|(n, _)| *n == name).map(|(_, d)| *d)
    }

    /// Print the stats table to stderr.
    pub fn display(&self) {
        eprintln!();
        eprintln!("=== Circuit Trainer Stats ===");
        for (name, dur) in &self.phases {
            eprintln!("  {:<24} {:>10.6}s", name, dur.as_secs_f64());
        }
        eprintln!("  Measurements:            {}", self.measurements);
        eprintln!("  Solves:                  {}", self.solves);
        eprintln!("  Cache hits:              {}", self.cache_hits);
        eprintln!("  Invalidations:           {}", self.invalidations);
        eprintln!("  Linear solves:           {}", self.linear_solves);
        if self.degenerate_fallbacks > 0 {
            eprintln!("  Degenerate fallbacks:    {}", self.degenerate_fallbacks);
        }
        eprintln!(
            "  Islands:                 solved={}  open={}",
            self.islands_solved, self.islands_skipped
        );
        eprintln!("  ─────────────────────────────────");
        eprintln!("  Session:                 {:>10.6}s", self.started.elapsed().as_secs_f64());
    }
}
