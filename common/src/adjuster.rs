use log::debug;

use crate::band::Band;

pub const INITIAL_RATE_C: f32 = 0.1;
pub const MEDIUM_RATE_C: f32 = 1.0;
pub const FAST_RATE_C: f32 = 5.0;

const MEDIUM_FROM_TICK: u32 = 5;
const FAST_FROM_TICK: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustDirection {
    Increase,
    Decrease,
}

impl AdjustDirection {
    fn sign(self) -> f32 {
        match self {
            Self::Increase => 1.0,
            Self::Decrease => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdjustState {
    Idle,
    Holding {
        direction: AdjustDirection,
        ticks: u32,
        rate_c: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustStep {
    pub direction: AdjustDirection,
    pub tick: u32,
    pub rate_c: f32,
}

impl AdjustStep {
    pub fn delta_c(&self) -> f32 {
        self.direction.sign() * self.rate_c
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdjustEvent {
    Stepped(AdjustStep),
    Released,
}

pub fn rate_for_tick(tick: u32) -> f32 {
    if tick >= FAST_FROM_TICK {
        FAST_RATE_C
    } else if tick >= MEDIUM_FROM_TICK {
        MEDIUM_RATE_C
    } else {
        INITIAL_RATE_C
    }
}

/// Turns held buttons into accelerating band shifts, one step per poll.
///
/// Never clamps; the caller validates the band before showing or using it.
#[derive(Debug, Clone)]
pub struct SetpointAdjuster {
    state: AdjustState,
}

impl Default for SetpointAdjuster {
    fn default() -> Self {
        Self::new()
    }
}

impl SetpointAdjuster {
    pub fn new() -> Self {
        Self {
            state: AdjustState::Idle,
        }
    }

    pub fn state(&self) -> AdjustState {
        self.state
    }

    /// Increase is checked first and wins if both buttons are held.
    pub fn poll(&mut self, increase: bool, decrease: bool, band: &mut Band) -> Option<AdjustEvent> {
        let held = if increase {
            Some(AdjustDirection::Increase)
        } else if decrease {
            Some(AdjustDirection::Decrease)
        } else {
            None
        };

        let Some(direction) = held else {
            return match std::mem::replace(&mut self.state, AdjustState::Idle) {
                AdjustState::Holding { .. } => Some(AdjustEvent::Released),
                AdjustState::Idle => None,
            };
        };

        let tick = match self.state {
            AdjustState::Holding {
                direction: current,
                ticks,
                ..
            } if current == direction => ticks.saturating_add(1),
            _ => 1,
        };
        let rate_c = rate_for_tick(tick);
        self.state = AdjustState::Holding {
            direction,
            ticks: tick,
            rate_c,
        };

        let step = AdjustStep {
            direction,
            tick,
            rate_c,
        };
        band.shift(step.delta_c());
        debug!("adjust {direction:?} tick {tick}: {:+.1} -> {band:?}", step.delta_c());

        Some(AdjustEvent::Stepped(step))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold_for(adjuster: &mut SetpointAdjuster, ticks: u32, band: &mut Band) -> Vec<f32> {
        (0..ticks)
            .map(|_| match adjuster.poll(true, false, band) {
                Some(AdjustEvent::Stepped(step)) => step.rate_c,
                other => panic!("expected a step, got {other:?}"),
            })
            .collect()
    }

    #[test]
    fn rate_schedule_accelerates() {
        for tick in 1..=4 {
            assert_eq!(rate_for_tick(tick), 0.1, "tick {tick}");
        }
        for tick in 5..=9 {
            assert_eq!(rate_for_tick(tick), 1.0, "tick {tick}");
        }
        for tick in [10, 11, 50, u32::MAX] {
            assert_eq!(rate_for_tick(tick), 5.0, "tick {tick}");
        }
    }

    #[test]
    fn holding_increase_shifts_both_bounds() {
        let mut adjuster = SetpointAdjuster::new();
        let mut band = Band::new(45.0, 60.0);

        let rates = hold_for(&mut adjuster, 11, &mut band);

        assert_eq!(
            rates,
            vec![0.1, 0.1, 0.1, 0.1, 1.0, 1.0, 1.0, 1.0, 1.0, 5.0, 5.0]
        );
        let total = 0.4 + 5.0 + 10.0;
        assert!((band.min_c - (45.0 + total)).abs() < 1e-3);
        assert!((band.max_c - (60.0 + total)).abs() < 1e-3);
    }

    #[test]
    fn holding_decrease_subtracts() {
        let mut adjuster = SetpointAdjuster::new();
        let mut band = Band::new(45.0, 60.0);

        let event = adjuster.poll(false, true, &mut band);

        assert!(matches!(
            event,
            Some(AdjustEvent::Stepped(AdjustStep {
                direction: AdjustDirection::Decrease,
                tick: 1,
                ..
            }))
        ));
        assert!((band.min_c - 44.9).abs() < 1e-4);
        assert!((band.max_c - 59.9).abs() < 1e-4);
    }

    #[test]
    fn release_resets_rate() {
        let mut adjuster = SetpointAdjuster::new();
        let mut band = Band::new(45.0, 60.0);

        hold_for(&mut adjuster, 7, &mut band);
        assert!(matches!(adjuster.state(), AdjustState::Holding { .. }));
        assert_eq!(
            adjuster.poll(false, false, &mut band),
            Some(AdjustEvent::Released)
        );
        assert_eq!(adjuster.state(), AdjustState::Idle);
        assert_eq!(adjuster.poll(false, false, &mut band), None);

        let rates = hold_for(&mut adjuster, 2, &mut band);
        assert_eq!(rates, vec![0.1, 0.1]);
    }

    #[test]
    fn switching_direction_restarts_hold() {
        let mut adjuster = SetpointAdjuster::new();
        let mut band = Band::new(45.0, 60.0);

        hold_for(&mut adjuster, 6, &mut band);
        let event = adjuster.poll(false, true, &mut band);

        match event {
            Some(AdjustEvent::Stepped(step)) => {
                assert_eq!(step.direction, AdjustDirection::Decrease);
                assert_eq!(step.tick, 1);
                assert_eq!(step.rate_c, 0.1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn increase_wins_when_both_held() {
        let mut adjuster = SetpointAdjuster::new();
        let mut band = Band::new(45.0, 60.0);

        adjuster.poll(true, true, &mut band);
        assert!(band.min_c > 45.0);
    }

    #[test]
    fn does_not_clamp() {
        let mut adjuster = SetpointAdjuster::new();
        let mut band = Band::new(115.0, 119.0);

        hold_for(&mut adjuster, 12, &mut band);
        assert!(band.max_c > 120.0);
        assert!(band.validated().is_valid());
    }
}
