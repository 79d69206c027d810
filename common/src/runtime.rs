use log::{debug, info, warn};

use crate::{
    actuator::ActuatorDriver,
    config::ThermostatConfig,
    hal::{Clock, Display, InputLine, OutputLine, RecordStore, TemperatureSensor},
    sampler::TemperatureSampler,
    scheduler::DriftCorrectedScheduler,
    store::SetpointStore,
    thermostat::{ThermostatEngine, TickInput},
    types::EngineAction,
};

pub struct Board<S, R, D, I, O, C> {
    pub sensor: S,
    pub records: R,
    pub display: D,
    pub increase: I,
    pub decrease: I,
    pub widen: O,
    pub narrow: O,
    pub clock: C,
}

pub struct Runtime<S, R, D, I, O, C> {
    engine: ThermostatEngine,
    scheduler: DriftCorrectedScheduler,
    sampler: TemperatureSampler<S>,
    store: SetpointStore<R>,
    actuator: ActuatorDriver<O>,
    display: D,
    increase: I,
    decrease: I,
    clock: C,
}

impl<S, R, D, I, O, C> Runtime<S, R, D, I, O, C>
where
    S: TemperatureSensor,
    R: RecordStore,
    D: Display,
    I: InputLine,
    O: OutputLine,
    C: Clock,
{
    /// Reads the persisted band once and builds the engine around it.
    pub fn new(config: ThermostatConfig, board: Board<S, R, D, I, O, C>) -> Self {
        let mut store = SetpointStore::new(board.records);
        let band = store.load_band(config.default_band);
        info!("band loaded: {:.1}..{:.1}C", band.min_c, band.max_c);

        let scheduler =
            DriftCorrectedScheduler::new(config.drift_correction, config.drift_reducer_ms);
        Self {
            engine: ThermostatEngine::new(config, band),
            scheduler,
            sampler: TemperatureSampler::new(board.sensor),
            store,
            actuator: ActuatorDriver::new(board.widen, board.narrow),
            display: board.display,
            increase: board.increase,
            decrease: board.decrease,
            clock: board.clock,
        }
    }

    pub fn engine(&self) -> &ThermostatEngine {
        &self.engine
    }

    pub fn store(&self) -> &SetpointStore<R> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn start(&mut self) {
        info!(
            "starting: reducer {} ms, {:?} drift correction",
            self.scheduler.reducer_ms(),
            self.engine.config.drift_correction
        );
        let actions = self.engine.start();
        self.execute(actions);
    }

    pub fn step(&mut self) {
        self.scheduler.tick(&mut self.clock);

        let increase = self.increase.is_pressed();
        let decrease = self.decrease.is_pressed();
        let sample = self.sampler.sample();
        if !sample.is_plausible() {
            warn!("implausible temperature reading {:.1}C", sample.celsius());
        }
        let input = TickInput {
            increase,
            decrease,
            temperature_c: sample.celsius(),
        };
        let actions = self.engine.tick(input);
        self.execute(actions);
    }

    pub fn run(mut self) -> ! {
        self.start();
        loop {
            self.step();
        }
    }

    fn execute(&mut self, actions: Vec<EngineAction>) {
        for action in actions {
            match action {
                EngineAction::Backlight(on) => self.display.set_backlight(on),
                EngineAction::Write { line, column, text } => {
                    self.display.write(line, column, &text)
                }
                EngineAction::Actuate(command) => {
                    self.actuator
                        .execute(command, &mut self.clock, &mut self.display)
                }
                EngineAction::Persist { address, value } => {
                    debug!("persist {address:?} = {value}");
                    self.store.save(address, value);
                }
            }
        }
    }
}
