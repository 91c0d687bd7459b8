//! Bottleneck analysis
//!
//! Averages the collected samples per entity and flags entities whose
//! average utilization, queue length or wait exceeds the configured alert
//! thresholds. Below `min_samples` samples the analyzer reports nothing.

use crate::config::AnalyticsConfig;
use crate::metrics::{EntityKind, MetricsSample};
use crate::models::state::compare_ids;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Signal {
    Utilization,
    Queue,
    Wait,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    IncreaseCapacity,
    MonitorUtilization,
    ReduceUpstreamRate,
    AddTransportCapacity,
}

impl Recommendation {
    fn for_signals(entity: EntityKind, exceeded: &[Signal]) -> Self {
        let utilization = exceeded.contains(&Signal::Utilization);
        let congestion = exceeded.contains(&Signal::Queue) || exceeded.contains(&Signal::Wait);
        match (entity.is_transport(), utilization, congestion) {
            (true, _, _) => Recommendation::AddTransportCapacity,
            (false, true, true) => Recommendation::IncreaseCapacity,
            (false, true, false) => Recommendation::MonitorUtilization,
            (false, false, _) => Recommendation::ReduceUpstreamRate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub entity_id: String,
    pub entity: EntityKind,
    pub utilization: f64,
    pub queue_length: f64,
    pub mean_wait: Option<f64>,
    pub exceeded: Vec<Signal>,
    /// Sum of value/threshold over the exceeded signals
    pub score: f64,
    pub recommendation: Recommendation,
}

#[derive(Debug, Default)]
struct Averages {
    entity: Option<EntityKind>,
    samples: usize,
    utilization: f64,
    queue_length: f64,
    wait_sum: f64,
    wait_samples: usize,
}

#[derive(Debug, Clone)]
pub struct BottleneckAnalyzer {
    thresholds: AnalyticsConfig,
    samples: Vec<MetricsSample>,
}

impl BottleneckAnalyzer {
    pub fn new(thresholds: AnalyticsConfig) -> Self {
        Self {
            thresholds,
            samples: Vec::new(),
        }
    }

    pub fn observe(&mut self, sample: MetricsSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[MetricsSample] {
        &self.samples
    }

    pub fn thresholds(&self) -> &AnalyticsConfig {
        &self.thresholds
    }

    /// Ranked bottlenecks: score descending, then entity id
    pub fn analyze(&self) -> Vec<Bottleneck> {
        if self.samples.len() < self.thresholds.min_samples {
            return Vec::new();
        }

        let mut averages: BTreeMap<&str, Averages> = BTreeMap::new();
        for sample in &self.samples {
            for entity in &sample.entities {
                let avg = averages.entry(entity.entity_id.as_str()).or_default();
                avg.entity = Some(entity.entity);
                avg.samples += 1;
                avg.utilization += entity.utilization;
                avg.queue_length += entity.queue_length;
                if let Some(wait) = entity.mean_wait {
                    avg.wait_sum += wait;
                    avg.wait_samples += 1;
                }
            }
        }

        let mut bottlenecks: Vec<Bottleneck> = averages
            .into_iter()
            .filter_map(|(id, avg)| self.judge(id, avg))
            .collect();
        bottlenecks.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| compare_ids(&a.entity_id, &b.entity_id))
        });
        bottlenecks
    }

    fn judge(&self, id: &str, avg: Averages) -> Option<Bottleneck> {
        let entity = avg.entity?;
        let n = avg.samples.max(1) as f64;
        let utilization = avg.utilization / n;
        let queue_length = avg.queue_length / n;
        let mean_wait = (avg.wait_samples > 0).then(|| avg.wait_sum / avg.wait_samples as f64);

        let t = &self.thresholds;
        let checks = [
            (Signal::Utilization, Some(utilization), t.high_utilization),
            (Signal::Queue, Some(queue_length), t.queue_alert),
            (Signal::Wait, mean_wait, t.wait_time_alert),
        ];
        let mut exceeded = Vec::new();
        let mut score = 0.0;
        for (signal, value, threshold) in checks {
            let Some(value) = value else { continue };
            if value > threshold {
                exceeded.push(signal);
                score += if threshold > 0.0 { value / threshold } else { 1.0 + value };
            }
        }
        if exceeded.is_empty() {
            return None;
        }

        Some(Bottleneck {
            entity_id: id.to_string(),
            entity,
            utilization,
            queue_length,
            mean_wait,
            recommendation: Recommendation::for_signals(entity, &exceeded),
            exceeded,
            score,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EntitySample;

    fn sample(time: f64, entities: &[(&str, EntityKind, f64, f64, Option<f64>)]) -> MetricsSample {
        MetricsSample {
            time,
            window: 60.0,
            entities: entities
                .iter()
                .map(|(id, entity, utilization, queue_length, mean_wait)| EntitySample {
                    entity_id: id.to_string(),
                    entity: *entity,
                    utilization: *utilization,
                    queue_length: *queue_length,
                    mean_wait: *mean_wait,
                })
                .collect(),
        }
    }

    fn analyzer(samples: usize) -> BottleneckAnalyzer {
        let mut analyzer = BottleneckAnalyzer::new(AnalyticsConfig::default());
        for i in 0..samples {
            analyzer.observe(sample(
                60.0 * (i + 1) as f64,
                &[
                    ("bay1_EAF_1", EntityKind::Unit, 0.95, 4.0, Some(45.0)),
                    ("bay1_LMF_1", EntityKind::Unit, 0.90, 0.0, Some(0.0)),
                    ("bay1_Caster_1", EntityKind::Unit, 0.40, 5.0, None),
                    ("bay1_crane_1", EntityKind::Crane, 0.92, 0.0, None),
                    ("car_1", EntityKind::LadleCar, 0.10, 0.0, None),
                ],
            ));
        }
        analyzer
    }

    #[test]
    fn test_fails_closed_below_min_samples() {
        assert!(analyzer(2).analyze().is_empty());
        assert_eq!(analyzer(3).analyze().len(), 4);
    }

    #[test]
    fn test_ranking_and_recommendations() {
        let ranked = analyzer(3).analyze();
        let ids: Vec<&str> = ranked.iter().map(|b| b.entity_id.as_str()).collect();
        assert_eq!(ids, vec!["bay1_EAF_1", "bay1_Caster_1", "bay1_crane_1", "bay1_LMF_1"]);

        assert_eq!(ranked[0].recommendation, Recommendation::IncreaseCapacity);
        assert_eq!(
            ranked[0].exceeded,
            vec![Signal::Utilization, Signal::Queue, Signal::Wait]
        );
        assert_eq!(ranked[1].recommendation, Recommendation::ReduceUpstreamRate);
        assert_eq!(ranked[2].recommendation, Recommendation::AddTransportCapacity);
        assert_eq!(ranked[3].recommendation, Recommendation::MonitorUtilization);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut analyzer = BottleneckAnalyzer::new(AnalyticsConfig {
            high_utilization: 0.5,
            ..AnalyticsConfig::default()
        });
        for i in 0..3 {
            analyzer.observe(sample(
                60.0 * i as f64,
                &[("bay1_EAF_1", EntityKind::Unit, 0.5, 0.0, None)],
            ));
        }
        assert!(analyzer.analyze().is_empty());
    }
}
