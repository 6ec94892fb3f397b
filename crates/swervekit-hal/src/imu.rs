//! Generic `Imu` trait for heading sensors.

/// A yaw sensor.  Readings are degrees, counter-clockwise positive and
/// unbounded (they keep accumulating past ±360°).
pub trait Imu {
    fn id(&self) -> &str;

    /// Accumulated yaw in degrees.
    fn get_angle(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockGyro {
        angle: f64,
    }

    impl Imu for MockGyro {
        fn id(&self) -> &str {
            "navx"
        }

        fn get_angle(&self) -> f64 {
            self.angle
        }
    }

    #[test]
    fn readings_are_not_wrapped() {
        let gyro = MockGyro { angle: 725.0 };
        assert_eq!(gyro.id(), "navx");
        assert!((gyro.get_angle() - 725.0).abs() < f64::EPSILON);
    }
}
