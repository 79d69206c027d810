use log::info;

use crate::{
    adjuster::{AdjustEvent, SetpointAdjuster},
    band::Band,
    config::ThermostatConfig,
    display::{self, LINE_ADJUST, LINE_BAND, LINE_STATUS, LINE_TEMPERATURE},
    hysteresis::HysteresisController,
    sampler::Sample,
    startup::{StartupEvent, StartupSequencer},
    store::{ADDR_BAND_MAX, ADDR_BAND_MIN},
    types::{ActuatorCommand, Direction, EngineAction},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    pub increase: bool,
    pub decrease: bool,
    pub temperature_c: f32,
}

#[derive(Debug, Clone)]
enum Phase {
    Starting(StartupSequencer),
    Running { countdown_s: u32 },
}

/// Pure control state: band, adjustment, startup progress and countdown.
///
/// Every tick returns the side effects to perform, in order.
#[derive(Debug, Clone)]
pub struct ThermostatEngine {
    pub config: ThermostatConfig,
    band: Band,
    adjuster: SetpointAdjuster,
    controller: HysteresisController,
    phase: Phase,
    last_sample: Option<Sample>,
    evaluations: u64,
}

impl ThermostatEngine {
    pub fn new(mut config: ThermostatConfig, band: Band) -> Self {
        config.sanitize();
        let controller = HysteresisController::new(
            config.control_reference,
            config.default_band,
            config.relay_pulse_ms,
        );
        let sequencer = StartupSequencer::new(config.startup_delay_s, config.settle_delay_s);
        Self {
            config,
            band: band.validated(),
            adjuster: SetpointAdjuster::new(),
            controller,
            phase: Phase::Starting(sequencer),
            last_sample: None,
            evaluations: 0,
        }
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn last_sample(&self) -> Option<Sample> {
        self.last_sample
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    pub fn countdown_s(&self) -> Option<u32> {
        match self.phase {
            Phase::Running { countdown_s } => Some(countdown_s),
            Phase::Starting(_) => None,
        }
    }

    pub fn start(&self) -> Vec<EngineAction> {
        vec![
            EngineAction::Backlight(self.config.backlight),
            EngineAction::write(LINE_BAND, display::band_line(&self.band)),
            EngineAction::write(LINE_ADJUST, display::adjust_line(None)),
        ]
    }

    pub fn tick(&mut self, input: TickInput) -> Vec<EngineAction> {
        let mut actions = Vec::new();

        self.poll_adjust(input, &mut actions);
        self.record_sample(input.temperature_c, &mut actions);

        let startup_events = match &mut self.phase {
            Phase::Starting(sequencer) => Some(sequencer.advance()),
            Phase::Running { .. } => None,
        };
        match startup_events {
            Some(events) => self.apply_startup(events, &mut actions),
            None => self.run_cycle(&mut actions),
        }

        actions
    }

    fn poll_adjust(&mut self, input: TickInput, actions: &mut Vec<EngineAction>) {
        match self
            .adjuster
            .poll(input.increase, input.decrease, &mut self.band)
        {
            Some(AdjustEvent::Stepped(step)) => {
                self.band.validate();
                actions.push(EngineAction::write(
                    LINE_BAND,
                    display::band_line(&self.band),
                ));
                actions.push(EngineAction::write(
                    LINE_ADJUST,
                    display::adjust_line(Some(&step)),
                ));
            }
            Some(AdjustEvent::Released) => {
                info!(
                    "band adjusted to {:.1}..{:.1}",
                    self.band.min_c, self.band.max_c
                );
                actions.push(EngineAction::write(LINE_ADJUST, display::adjust_line(None)));
            }
            None => {}
        }
    }

    fn record_sample(&mut self, temp_c: f32, actions: &mut Vec<EngineAction>) {
        self.last_sample = Some(Sample(temp_c));
        actions.push(EngineAction::write(
            LINE_TEMPERATURE,
            display::temperature_line(temp_c),
        ));
    }

    fn apply_startup(&mut self, events: Vec<StartupEvent>, actions: &mut Vec<EngineAction>) {
        for event in events {
            match event {
                StartupEvent::Countdown { phase, remaining_s } => {
                    actions.push(EngineAction::write(
                        LINE_STATUS,
                        display::countdown_line(phase.label(), remaining_s),
                    ));
                }
                StartupEvent::Prime => {
                    actions.push(EngineAction::Actuate(ActuatorCommand::pulse(
                        Direction::Narrow,
                        self.config.prime_pulse_ms,
                    )));
                }
                StartupEvent::Evaluate => {
                    self.evaluate(actions);
                    self.phase = Phase::Running {
                        countdown_s: self.config.evaluation_period_s,
                    };
                    info!("startup complete, control running");
                }
            }
        }
    }

    fn run_cycle(&mut self, actions: &mut Vec<EngineAction>) {
        let Phase::Running { countdown_s } = &mut self.phase else {
            return;
        };

        if *countdown_s == 0 {
            *countdown_s = self.config.evaluation_period_s;
            self.evaluate(actions);
            self.persist_band(actions);
        } else {
            actions.push(EngineAction::write(
                LINE_STATUS,
                display::countdown_line("Next check", *countdown_s),
            ));
            *countdown_s -= 1;
        }
    }

    fn evaluate(&mut self, actions: &mut Vec<EngineAction>) {
        let Some(sample) = self.last_sample else {
            return;
        };
        let command = self.controller.decide(sample.celsius(), &self.band);
        info!(
            "evaluation at {:.1}C against {:?}: {}",
            sample.celsius(),
            self.controller.reference_band(&self.band),
            command.action.as_str()
        );
        self.evaluations = self.evaluations.saturating_add(1);
        actions.push(EngineAction::Actuate(command));
    }

    fn persist_band(&self, actions: &mut Vec<EngineAction>) {
        let band = self.band.validated();
        actions.push(EngineAction::Persist {
            address: ADDR_BAND_MIN,
            value: band.min_c,
        });
        actions.push(EngineAction::Persist {
            address: ADDR_BAND_MAX,
            value: band.max_c,
        });
    }
}
