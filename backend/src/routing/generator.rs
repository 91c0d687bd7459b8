//! Heat generation
//!
//! Heats arrive at the EAFs at a fixed or sampled interval, starting at
//! t = 0. Generation stops once `max_heats` heats exist or when the next
//! arrival would fall at or beyond `simulation_time`.
//!
//! # Determinism
//!
//! Grade and interval draws come from the run's `RngManager` in a fixed
//! order (grade first, then the next interval), so a seed fixes the whole
//! arrival stream.

use crate::config::{IntervalConfig, IntervalDistribution, PlantConfig};
use crate::rng::RngManager;

#[derive(Debug, Clone)]
pub struct HeatGenerator {
    interval: IntervalConfig,
    max_heats: Option<usize>,
    horizon: Option<f64>,
    generated: usize,
}

impl HeatGenerator {
    pub fn new(config: &PlantConfig) -> Self {
        Self {
            interval: config.heat_generation_interval.clone(),
            max_heats: config.max_heats,
            horizon: config.simulation_time,
            generated: 0,
        }
    }

    pub fn generated(&self) -> usize {
        self.generated
    }

    /// Mean interval between heats
    pub fn takt_time(&self) -> f64 {
        self.interval.mean()
    }

    /// Allocate the next heat id (`heat_00001`, `heat_00002`, ...)
    pub fn next_heat_id(&mut self) -> String {
        self.generated += 1;
        format!("heat_{:05}", self.generated)
    }

    pub fn limit_reached(&self) -> bool {
        self.max_heats.is_some_and(|max| self.generated >= max)
    }

    fn sample_interval(&self, rng: &mut RngManager) -> f64 {
        match &self.interval {
            IntervalConfig::Fixed(value) => *value,
            IntervalConfig::Sampled(IntervalDistribution::Exponential { mean }) => {
                rng.exponential(*mean)
            }
            IntervalConfig::Sampled(IntervalDistribution::Uniform { min, max }) => {
                rng.uniform(*min, *max)
            }
        }
    }

    /// Time of the next arrival after one at `now`, or `None` when generation stops
    pub fn next_arrival(&self, now: f64, rng: &mut RngManager) -> Option<f64> {
        if self.limit_reached() {
            return None;
        }
        let next = now + self.sample_interval(rng);
        match self.horizon {
            Some(horizon) if next >= horizon => None,
            _ => Some(next),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_interval_stops_before_horizon() {
        let config = PlantConfig {
            simulation_time: Some(180.0),
            ..PlantConfig::default()
        };
        let mut generator = HeatGenerator::new(&config);
        let mut rng = RngManager::new(1);

        let mut arrivals = vec![0.0];
        generator.next_heat_id();
        while let Some(t) = generator.next_arrival(*arrivals.last().unwrap(), &mut rng) {
            generator.next_heat_id();
            arrivals.push(t);
        }
        assert_eq!(arrivals, vec![0.0, 60.0, 120.0]);
        assert_eq!(generator.generated(), 3);
    }

    #[test]
    fn test_max_heats_limit() {
        let config = PlantConfig {
            max_heats: Some(2),
            ..PlantConfig::default()
        };
        let mut generator = HeatGenerator::new(&config);
        let mut rng = RngManager::new(1);
        assert_eq!(generator.next_heat_id(), "heat_00001");
        assert_eq!(generator.next_arrival(0.0, &mut rng), Some(60.0));
        generator.next_heat_id();
        assert!(generator.limit_reached());
        assert_eq!(generator.next_arrival(60.0, &mut rng), None);
    }

    #[test]
    fn test_sampled_intervals_positive() {
        let config = PlantConfig {
            max_heats: Some(1000),
            heat_generation_interval: IntervalConfig::Sampled(IntervalDistribution::Uniform {
                min: 40.0,
                max: 80.0,
            }),
            ..PlantConfig::default()
        };
        let generator = HeatGenerator::new(&config);
        let mut rng = RngManager::new(9);
        for _ in 0..100 {
            let next = generator.next_arrival(100.0, &mut rng).unwrap();
            assert!((140.0..180.0).contains(&next));
        }
        assert_eq!(generator.takt_time(), 60.0);
    }
}
