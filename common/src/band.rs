use serde::{Deserialize, Serialize};

pub const BAND_FLOOR_C: f32 = 0.0;
pub const BAND_CEIL_C: f32 = 120.0;

/// Acceptable temperature range. Actuation only happens outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    #[serde(rename = "minC")]
    pub min_c: f32,
    #[serde(rename = "maxC")]
    pub max_c: f32,
}

impl Default for Band {
    fn default() -> Self {
        Self {
            min_c: 45.0,
            max_c: 60.0,
        }
    }
}

impl Band {
    pub fn new(min_c: f32, max_c: f32) -> Self {
        Self { min_c, max_c }
    }

    /// Clamps both bounds into range and raises `max` to `min` if they cross.
    pub fn validate(&mut self) {
        self.min_c = clamp_bound(self.min_c);
        self.max_c = clamp_bound(self.max_c);
        if self.max_c < self.min_c {
            self.max_c = self.min_c;
        }
    }

    pub fn validated(mut self) -> Self {
        self.validate();
        self
    }

    pub fn is_valid(&self) -> bool {
        (BAND_FLOOR_C..=BAND_CEIL_C).contains(&self.min_c)
            && (BAND_FLOOR_C..=BAND_CEIL_C).contains(&self.max_c)
            && self.max_c >= self.min_c
    }

    pub fn shift(&mut self, delta_c: f32) {
        self.min_c += delta_c;
        self.max_c += delta_c;
    }

    pub fn contains(&self, temp_c: f32) -> bool {
        temp_c >= self.min_c && temp_c <= self.max_c
    }
}

fn clamp_bound(value: f32) -> f32 {
    if value.is_nan() {
        return BAND_FLOOR_C;
    }
    value.clamp(BAND_FLOOR_C, BAND_CEIL_C)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_clamps_each_bound() {
        let band = Band::new(-5.0, 140.0).validated();
        assert_eq!(band, Band::new(0.0, 120.0));
    }

    #[test]
    fn validate_raises_max_to_min() {
        let band = Band::new(70.0, 50.0).validated();
        assert_eq!(band, Band::new(70.0, 70.0));

        let band = Band::new(130.0, 10.0).validated();
        assert_eq!(band, Band::new(120.0, 120.0));
    }

    #[test]
    fn validated_band_always_ordered_and_in_range() {
        let samples = [-300.0, -0.1, 0.0, 12.5, 60.0, 119.9, 120.0, 120.1, 500.0, f32::NAN];
        for &min in &samples {
            for &max in &samples {
                let band = Band::new(min, max).validated();
                assert!(band.is_valid(), "{min} / {max} -> {band:?}");
                assert!(0.0 <= band.min_c && band.min_c <= band.max_c && band.max_c <= 120.0);
            }
        }
    }

    #[test]
    fn validation_is_idempotent() {
        let once = Band::new(45.0, 60.0).validated();
        let twice = once.validated();
        assert_eq!(once, twice);

        let once = Band::new(150.0, -3.0).validated();
        assert_eq!(once.validated(), once);
    }

    #[test]
    fn shift_moves_both_bounds_without_clamping() {
        let mut band = Band::new(118.0, 119.5);
        band.shift(5.0);
        assert_eq!(band, Band::new(123.0, 124.5));
        assert!(!band.is_valid());
    }

    #[test]
    fn contains_is_inclusive() {
        let band = Band::new(45.0, 60.0);
        assert!(band.contains(45.0));
        assert!(band.contains(60.0));
        assert!(!band.contains(44.99));
        assert!(!band.contains(60.01));
    }
}
