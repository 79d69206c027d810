use crate::hal::TemperatureSensor;

/// Value a DS18B20-style sensor reports when it is disconnected.
pub const SENSOR_FAULT_C: f32 = -127.0;

const PLAUSIBLE_MIN_C: f32 = -55.0;
const PLAUSIBLE_MAX_C: f32 = 125.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample(pub f32);

impl Sample {
    pub fn celsius(self) -> f32 {
        self.0
    }

    /// Whether the reading is within the sensor's physical range.
    pub fn is_plausible(self) -> bool {
        self.0.is_finite() && (PLAUSIBLE_MIN_C..=PLAUSIBLE_MAX_C).contains(&self.0)
    }
}

#[derive(Debug)]
pub struct TemperatureSampler<S> {
    sensor: S,
}

impl<S: TemperatureSensor> TemperatureSampler<S> {
    pub fn new(sensor: S) -> Self {
        Self { sensor }
    }

    pub fn sample(&mut self) -> Sample {
        Sample(self.sensor.read_celsius())
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSensor(f32);

    impl TemperatureSensor for FixedSensor {
        fn read_celsius(&mut self) -> f32 {
            self.0
        }
    }

    #[test]
    fn passes_readings_through_unclamped() {
        let mut sampler = TemperatureSampler::new(FixedSensor(SENSOR_FAULT_C));
        assert_eq!(sampler.sample(), Sample(-127.0));

        sampler.sensor_mut().0 = 52.25;
        assert_eq!(sampler.sample().celsius(), 52.25);
    }

    #[test]
    fn plausibility_rejects_fault_sentinel() {
        assert!(Sample(21.0).is_plausible());
        assert!(Sample(125.0).is_plausible());
        assert!(!Sample(SENSOR_FAULT_C).is_plausible());
        assert!(!Sample(f32::NAN).is_plausible());
        assert!(!Sample(85.0e3).is_plausible());
    }
}
