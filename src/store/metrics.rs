use chrono::Utc;

use crate::models::*;

#[derive(Debug, Default)]
pub struct MetricsStore {
    metrics: ProjectMetrics,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &ProjectMetrics {
        &self.metrics
    }

    pub fn update(&mut self, input: UpdateMetricsInput) {
        let m = &mut self.metrics;
        if let Some(v) = input.total_documents {
            m.total_documents = v;
        }
        if let Some(v) = input.approved_documents {
            m.approved_documents = v;
        }
        if let Some(v) = input.rejection_rate {
            m.rejection_rate = v;
        }
        if let Some(v) = input.average_score {
            m.average_score = v;
        }
        if let Some(v) = input.generation_speed {
            m.generation_speed = v;
        }
        if let Some(v) = input.learning_efficiency {
            m.learning_efficiency = v;
        }
    }

    pub fn add_iteration(&mut self, iteration: NewIteration) {
        self.metrics.iterations.push(IterationMetric {
            iteration: iteration.iteration,
            timestamp: Utc::now(),
            documents_generated: iteration.documents_generated,
            average_score: iteration.average_score,
            rules_learned: iteration.rules_learned,
        });
    }

    pub fn reset(&mut self) {
        self.metrics = ProjectMetrics::default();
    }
}
