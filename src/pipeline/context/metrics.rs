use std::time::Duration;

use crate::pipeline::Stage;

/// Stage durations collected during one run
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    stages: Vec<(Stage, Duration)>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, duration: Duration) {
        self.stages.push((stage, duration));
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, duration)| *duration).sum()
    }

    pub fn stages(&self) -> &[(Stage, Duration)] {
        &self.stages
    }
}
