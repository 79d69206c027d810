pub mod actuator;
pub mod adjuster;
pub mod band;
pub mod config;
pub mod display;
pub mod hal;
pub mod hysteresis;
pub mod runtime;
pub mod sampler;
pub mod scheduler;
pub mod startup;
pub mod store;
pub mod thermostat;
pub mod types;

pub use band::Band;
pub use config::{ConfigError, ThermostatConfig};
pub use hal::{Address, Clock, Display, InputLine, OutputLine, RecordStore, TemperatureSensor};
pub use runtime::{Board, Runtime};
pub use thermostat::{ThermostatEngine, TickInput};
pub use types::{Action, ActuatorCommand, Direction, EngineAction};
