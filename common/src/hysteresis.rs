use serde::{Deserialize, Serialize};

use crate::{
    band::Band,
    types::{Action, ActuatorCommand},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlReference {
    #[default]
    LiveBand,
    CompiledDefaults,
}

#[derive(Debug, Clone)]
pub struct HysteresisController {
    reference: ControlReference,
    defaults: Band,
    pulse_ms: u64,
}

impl HysteresisController {
    pub fn new(reference: ControlReference, defaults: Band, pulse_ms: u64) -> Self {
        Self {
            reference,
            defaults: defaults.validated(),
            pulse_ms,
        }
    }

    /// NaN is neither below nor above the band and holds.
    pub fn evaluate(temp_c: f32, band: &Band) -> Action {
        if band.contains(temp_c) {
            Action::Hold
        } else if temp_c < band.min_c {
            Action::Widen
        } else if temp_c > band.max_c {
            Action::Narrow
        } else {
            Action::Hold
        }
    }

    pub fn reference_band(&self, live: &Band) -> Band {
        match self.reference {
            ControlReference::LiveBand => live.validated(),
            ControlReference::CompiledDefaults => self.defaults,
        }
    }

    pub fn decide(&self, temp_c: f32, live: &Band) -> ActuatorCommand {
        let action = Self::evaluate(temp_c, &self.reference_band(live));
        ActuatorCommand {
            action,
            duration_ms: match action {
                Action::Hold => 0,
                _ => self.pulse_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BAND: Band = Band {
        min_c: 45.0,
        max_c: 60.0,
    };

    #[test]
    fn below_band_widens() {
        assert_eq!(HysteresisController::evaluate(40.0, &BAND), Action::Widen);
    }

    #[test]
    fn above_band_narrows() {
        assert_eq!(HysteresisController::evaluate(70.0, &BAND), Action::Narrow);
    }

    #[test]
    fn inside_band_holds_inclusive() {
        assert_eq!(HysteresisController::evaluate(50.0, &BAND), Action::Hold);
        assert_eq!(HysteresisController::evaluate(45.0, &BAND), Action::Hold);
        assert_eq!(HysteresisController::evaluate(60.0, &BAND), Action::Hold);
    }

    #[test]
    fn nan_sample_holds() {
        assert_eq!(HysteresisController::evaluate(f32::NAN, &BAND), Action::Hold);
    }

    #[test]
    fn holds_exactly_where_band_contains_sample() {
        for temp_c in [44.9, 45.0, 52.5, 60.0, 60.1] {
            let holds = HysteresisController::evaluate(temp_c, &BAND) == Action::Hold;
            assert_eq!(holds, BAND.contains(temp_c), "{temp_c}");
        }
    }

    #[test]
    fn fault_sentinel_widens() {
        assert_eq!(HysteresisController::evaluate(-127.0, &BAND), Action::Widen);
    }

    #[test]
    fn decide_uses_live_band_by_default() {
        let controller = HysteresisController::new(ControlReference::default(), BAND, 2_000);
        let live = Band::new(30.0, 35.0);

        let command = controller.decide(40.0, &live);
        assert_eq!(command.action, Action::Narrow);
        assert_eq!(command.duration_ms, 2_000);
    }

    #[test]
    fn decide_can_consult_defaults() {
        let controller = HysteresisController::new(ControlReference::CompiledDefaults, BAND, 2_000);
        let live = Band::new(30.0, 35.0);

        let command = controller.decide(40.0, &live);
        assert_eq!(command.action, Action::Widen);
    }

    #[test]
    fn decide_validates_live_band() {
        let controller = HysteresisController::new(ControlReference::LiveBand, BAND, 2_000);
        let live = Band::new(130.0, 140.0);

        assert_eq!(controller.decide(119.0, &live).action, Action::Widen);
        assert_eq!(controller.decide(120.0, &live).action, Action::Hold);
    }

    #[test]
    fn hold_carries_no_duration() {
        let controller = HysteresisController::new(ControlReference::LiveBand, BAND, 2_000);
        assert_eq!(
            controller.decide(50.0, &BAND),
            ActuatorCommand {
                action: Action::Hold,
                duration_ms: 0
            }
        );
    }
}
