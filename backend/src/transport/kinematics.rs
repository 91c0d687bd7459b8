//! Crane move timing

use crate::config::PlantConfig;

/// Timeline offsets of one pick-and-place move, relative to assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovePlan {
    pub lift_starts: f64,
    pub picked_up_at: f64,
    pub lower_starts: f64,
    pub dropped_at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CraneKinematics {
    pub speed: f64,
    /// Trapezoidal velocity profile when set, constant speed otherwise
    pub accel: Option<f64>,
    pub lift_time: f64,
    pub lower_time: f64,
}

impl CraneKinematics {
    pub fn new(config: &PlantConfig) -> Self {
        Self {
            speed: config.crane_speed,
            accel: config.crane_accel,
            lift_time: config.crane_lift_time,
            lower_time: config.crane_lower_time,
        }
    }

    /// Minutes to travel `distance` along the rail
    pub fn travel_time(&self, distance: f64) -> f64 {
        let distance = distance.abs();
        if distance == 0.0 {
            return 0.0;
        }
        match self.accel {
            None => distance / self.speed,
            Some(accel) => {
                let t_ramp = self.speed / accel;
                let d_ramp = 0.5 * accel * t_ramp * t_ramp;
                if distance < 2.0 * d_ramp {
                    // Triangular profile: never reaches full speed
                    2.0 * (distance / accel).sqrt()
                } else {
                    2.0 * t_ramp + (distance - 2.0 * d_ramp) / self.speed
                }
            }
        }
    }

    /// Travel to the pickup, lift, carry, lower
    pub fn plan(&self, crane_x: f64, from_x: f64, to_x: f64) -> MovePlan {
        let lift_starts = self.travel_time(from_x - crane_x);
        let picked_up_at = lift_starts + self.lift_time;
        let lower_starts = picked_up_at + self.travel_time(to_x - from_x);
        MovePlan {
            lift_starts,
            picked_up_at,
            lower_starts,
            dropped_at: lower_starts + self.lower_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinematics(accel: Option<f64>) -> CraneKinematics {
        CraneKinematics {
            speed: 100.0,
            accel,
            lift_time: 3.0,
            lower_time: 3.0,
        }
    }

    #[test]
    fn test_constant_speed_plan() {
        let plan = kinematics(None).plan(0.0, 50.0, 150.0);
        assert_eq!(plan.lift_starts, 0.5);
        assert_eq!(plan.picked_up_at, 3.5);
        assert_eq!(plan.lower_starts, 4.5);
        assert_eq!(plan.dropped_at, 7.5);
    }

    #[test]
    fn test_trapezoidal_profile() {
        let k = kinematics(Some(100.0));
        // Ramp takes 1 min and 50 units each way
        assert!((k.travel_time(300.0) - 4.0).abs() < 1e-12);
        // Short hop stays triangular: 2 * sqrt(25 / 100)
        assert!((k.travel_time(25.0) - 1.0).abs() < 1e-12);
        assert_eq!(k.travel_time(0.0), 0.0);
    }
}
