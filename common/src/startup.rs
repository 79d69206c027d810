use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    BeforePrime,
    BeforeControl,
}

impl WaitPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::BeforePrime => "Priming in",
            Self::BeforeControl => "Control in",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupPhase {
    WaitDelay1 { remaining_s: u32 },
    PrimePulse,
    WaitDelay2 { remaining_s: u32 },
    FirstEvaluation,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupEvent {
    Countdown { phase: WaitPhase, remaining_s: u32 },
    Prime,
    Evaluate,
}

/// Power-on sequence: wait, prime, wait, first evaluation.
///
/// Each [`advance`](Self::advance) is one scheduler tick and consumes at most
/// one countdown second. Instantaneous phases following an expired wait run
/// in the same tick.
#[derive(Debug, Clone)]
pub struct StartupSequencer {
    phase: StartupPhase,
    settle_delay_s: u32,
}

impl StartupSequencer {
    pub fn new(startup_delay_s: u32, settle_delay_s: u32) -> Self {
        Self {
            phase: StartupPhase::WaitDelay1 {
                remaining_s: startup_delay_s,
            },
            settle_delay_s,
        }
    }

    pub fn phase(&self) -> StartupPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == StartupPhase::Done
    }

    pub fn advance(&mut self) -> Vec<StartupEvent> {
        let mut events = Vec::new();
        let mut counted = false;

        loop {
            match self.phase {
                StartupPhase::WaitDelay1 { remaining_s } if remaining_s > 0 => {
                    if counted {
                        break;
                    }
                    events.push(StartupEvent::Countdown {
                        phase: WaitPhase::BeforePrime,
                        remaining_s,
                    });
                    counted = true;
                    self.phase = StartupPhase::WaitDelay1 {
                        remaining_s: remaining_s - 1,
                    };
                }
                StartupPhase::WaitDelay1 { .. } => {
                    info!("startup delay elapsed, priming");
                    self.phase = StartupPhase::PrimePulse;
                }
                StartupPhase::PrimePulse => {
                    events.push(StartupEvent::Prime);
                    self.phase = StartupPhase::WaitDelay2 {
                        remaining_s: self.settle_delay_s,
                    };
                }
                StartupPhase::WaitDelay2 { remaining_s } if remaining_s > 0 => {
                    if counted {
                        break;
                    }
                    events.push(StartupEvent::Countdown {
                        phase: WaitPhase::BeforeControl,
                        remaining_s,
                    });
                    counted = true;
                    self.phase = StartupPhase::WaitDelay2 {
                        remaining_s: remaining_s - 1,
                    };
                }
                StartupPhase::WaitDelay2 { .. } => {
                    info!("settle delay elapsed, first evaluation");
                    self.phase = StartupPhase::FirstEvaluation;
                }
                StartupPhase::FirstEvaluation => {
                    events.push(StartupEvent::Evaluate);
                    self.phase = StartupPhase::Done;
                }
                StartupPhase::Done => break,
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countdown(phase: WaitPhase, remaining_s: u32) -> StartupEvent {
        StartupEvent::Countdown { phase, remaining_s }
    }

    #[test]
    fn runs_phases_in_order() {
        let mut sequencer = StartupSequencer::new(5, 3);
        let mut ticks = Vec::new();
        while !sequencer.is_done() {
            ticks.push(sequencer.advance());
        }

        use WaitPhase::*;
        assert_eq!(
            ticks,
            vec![
                vec![countdown(BeforePrime, 5)],
                vec![countdown(BeforePrime, 4)],
                vec![countdown(BeforePrime, 3)],
                vec![countdown(BeforePrime, 2)],
                vec![countdown(BeforePrime, 1), StartupEvent::Prime],
                vec![countdown(BeforeControl, 3)],
                vec![countdown(BeforeControl, 2)],
                vec![countdown(BeforeControl, 1), StartupEvent::Evaluate],
            ]
        );
    }

    #[test]
    fn zero_delays_complete_in_one_tick() {
        let mut sequencer = StartupSequencer::new(0, 0);
        assert_eq!(
            sequencer.advance(),
            vec![StartupEvent::Prime, StartupEvent::Evaluate]
        );
        assert!(sequencer.is_done());
        assert!(sequencer.advance().is_empty());
    }

    #[test]
    fn zero_settle_delay_evaluates_right_after_prime() {
        let mut sequencer = StartupSequencer::new(1, 0);
        assert_eq!(
            sequencer.advance(),
            vec![
                countdown(WaitPhase::BeforePrime, 1),
                StartupEvent::Prime,
                StartupEvent::Evaluate
            ]
        );
    }

    #[test]
    fn zero_startup_delay_primes_on_first_tick() {
        let mut sequencer = StartupSequencer::new(0, 2);
        assert_eq!(
            sequencer.advance(),
            vec![StartupEvent::Prime, countdown(WaitPhase::BeforeControl, 2)]
        );
        assert_eq!(
            sequencer.phase(),
            StartupPhase::WaitDelay2 { remaining_s: 1 }
        );
    }
}
