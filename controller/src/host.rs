use std::{
    cell::RefCell,
    collections::BTreeMap,
    io::{BufRead, ErrorKind},
    path::PathBuf,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{debug, info, warn};

use valvestat_common::{
    Address, Board, Clock, Direction, Display, InputLine, OutputLine, RecordStore, Runtime,
    TemperatureSensor, ThermostatConfig,
};

const RECORDS_FILE: &str = "records.json";

const AMBIENT_C: f32 = 18.0;
const SUPPLY_C: f32 = 85.0;
/// End-to-end valve travel time.
const VALVE_TRAVEL_MS: f32 = 120_000.0;
const THERMAL_TAU_MS: f32 = 600_000.0;

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = load_config()?;
    if let Err(err) = config.validate() {
        warn!("invalid config, falling back to defaults for bad fields: {err}");
        config.sanitize();
    }

    let time_scale = std::env::var("THERMOSTAT_TIME_SCALE")
        .ok()
        .map(|raw| raw.parse::<u32>())
        .transpose()
        .context("THERMOSTAT_TIME_SCALE must be a positive integer")?
        .unwrap_or(1)
        .max(1);
    let clock = SystemClock::new(time_scale);

    let data_dir = std::env::var("THERMOSTAT_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.thermostat"));
    let records_path = data_dir.join(RECORDS_FILE);
    let records = FileRecordStore::open(records_path.clone()).unwrap_or_else(|err| {
        warn!("failed to load records from {}: {err:#}", records_path.display());
        FileRecordStore::empty(records_path)
    });

    let plant = Rc::new(RefCell::new(Plant::new(0)));
    let buttons = spawn_button_reader().context("failed to spawn stdin button reader")?;

    info!(
        "simulation running at {time_scale}x; type `up`, `down` or `release` to use the buttons"
    );

    let board = Board {
        sensor: SimSensor {
            plant: plant.clone(),
            clock,
        },
        records,
        display: ConsoleDisplay::default(),
        increase: StdinButton(buttons.increase),
        decrease: StdinButton(buttons.decrease),
        widen: SimRelay {
            plant: plant.clone(),
            clock,
            direction: Direction::Widen,
        },
        narrow: SimRelay {
            plant,
            clock,
            direction: Direction::Narrow,
        },
        clock,
    };

    Runtime::new(config, board).run()
}

fn load_config() -> anyhow::Result<ThermostatConfig> {
    let Ok(path) = std::env::var("THERMOSTAT_CONFIG") else {
        return Ok(ThermostatConfig::default());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {path}"))?;
    ThermostatConfig::from_json_str(&raw).with_context(|| format!("failed to parse {path}"))
}

/// Monotonic clock whose time runs `scale` times faster than wall time.
#[derive(Debug, Clone, Copy)]
struct SystemClock {
    start: Instant,
    scale: u32,
}

impl SystemClock {
    fn new(scale: u32) -> Self {
        Self {
            start: Instant::now(),
            scale: scale.max(1),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        let elapsed: u64 = self
            .start
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(u64::MAX);
        elapsed.saturating_mul(self.scale.into())
    }

    fn sleep_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms / u64::from(self.scale)));
    }
}

/// Record file keyed by address, rewritten on every `put`.
#[derive(Debug)]
struct FileRecordStore {
    path: PathBuf,
    values: BTreeMap<u16, f32>,
}

impl FileRecordStore {
    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            values: BTreeMap::new(),
        }
    }

    fn open(path: PathBuf) -> anyhow::Result<Self> {
        let values = match std::fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, values })
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(&self.values)?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }
}

impl RecordStore for FileRecordStore {
    fn get(&mut self, address: Address) -> f32 {
        self.values.get(&address.0).copied().unwrap_or(0.0)
    }

    fn put(&mut self, address: Address, value: f32) {
        self.values.insert(address.0, value);
        if let Err(err) = self.flush() {
            warn!("failed to write {}: {err:#}", self.path.display());
        }
    }
}

/// Valve feeding a heat exchanger, with first-order thermal lag.
#[derive(Debug, Clone, PartialEq)]
struct Plant {
    /// 0.0 fully closed, 1.0 fully open.
    opening: f32,
    temperature_c: f32,
    driving: Option<Direction>,
    updated_ms: u64,
}

impl Plant {
    fn new(now_ms: u64) -> Self {
        Self {
            opening: 0.5,
            temperature_c: AMBIENT_C,
            driving: None,
            updated_ms: now_ms,
        }
    }

    fn advance(&mut self, now_ms: u64) {
        let dt_ms = now_ms.saturating_sub(self.updated_ms) as f32;
        self.updated_ms = self.updated_ms.max(now_ms);
        if dt_ms <= 0.0 {
            return;
        }

        let travel = dt_ms / VALVE_TRAVEL_MS;
        match self.driving {
            Some(Direction::Widen) => self.opening = (self.opening + travel).min(1.0),
            Some(Direction::Narrow) => self.opening = (self.opening - travel).max(0.0),
            None => {}
        }

        let target_c = AMBIENT_C + self.opening * (SUPPLY_C - AMBIENT_C);
        let approach = 1.0 - (-dt_ms / THERMAL_TAU_MS).exp();
        self.temperature_c += (target_c - self.temperature_c) * approach;
    }

    fn drive(&mut self, direction: Option<Direction>, now_ms: u64) {
        self.advance(now_ms);
        self.driving = direction;
    }

    fn temperature_at(&mut self, now_ms: u64) -> f32 {
        self.advance(now_ms);
        self.temperature_c
    }
}

struct SimSensor {
    plant: Rc<RefCell<Plant>>,
    clock: SystemClock,
}

impl TemperatureSensor for SimSensor {
    fn read_celsius(&mut self) -> f32 {
        self.plant.borrow_mut().temperature_at(self.clock.now_ms())
    }
}

struct SimRelay {
    plant: Rc<RefCell<Plant>>,
    clock: SystemClock,
    direction: Direction,
}

impl OutputLine for SimRelay {
    fn set_active(&mut self, active: bool) {
        let mut plant = self.plant.borrow_mut();
        let now_ms = self.clock.now_ms();
        if active {
            plant.drive(Some(self.direction), now_ms);
        } else if plant.driving == Some(self.direction) {
            plant.drive(None, now_ms);
            debug!("valve opening now {:.0}%", plant.opening * 100.0);
        }
    }
}

/// 4x20 character display rendered to the log, one record per changed line.
#[derive(Debug, Default)]
struct ConsoleDisplay {
    lines: [String; 4],
}

impl Display for ConsoleDisplay {
    fn write(&mut self, line: u8, column: u8, text: &str) {
        let Some(current) = self.lines.get_mut(usize::from(line)) else {
            warn!("display line {line} out of range");
            return;
        };
        let mut updated: String = current.chars().take(column.into()).collect();
        updated.push_str(text);
        if *current != updated {
            info!(target: "lcd", line, "|{updated}|");
            *current = updated;
        }
    }

    fn set_backlight(&mut self, on: bool) {
        info!(target: "lcd", "backlight {}", if on { "on" } else { "off" });
    }
}

struct StdinButton(Arc<AtomicBool>);

impl InputLine for StdinButton {
    fn is_pressed(&mut self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

struct ButtonState {
    increase: Arc<AtomicBool>,
    decrease: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonCommand {
    HoldIncrease,
    HoldDecrease,
    Release,
}

fn parse_button_command(line: &str) -> Option<ButtonCommand> {
    match line.trim().to_ascii_lowercase().as_str() {
        "up" | "+" => Some(ButtonCommand::HoldIncrease),
        "down" | "-" => Some(ButtonCommand::HoldDecrease),
        "release" | "r" | "" => Some(ButtonCommand::Release),
        _ => None,
    }
}

/// Reads button commands from stdin; each command holds until the next one.
fn spawn_button_reader() -> anyhow::Result<ButtonState> {
    let increase = Arc::new(AtomicBool::new(false));
    let decrease = Arc::new(AtomicBool::new(false));
    let (up, down) = (increase.clone(), decrease.clone());

    thread::Builder::new()
        .name("stdin-buttons".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        break;
                    }
                };
                match parse_button_command(&line) {
                    Some(command) => {
                        up.store(command == ButtonCommand::HoldIncrease, Ordering::Relaxed);
                        down.store(command == ButtonCommand::HoldDecrease, Ordering::Relaxed);
                        info!("buttons: {command:?}");
                    }
                    None => warn!("unknown button command `{}`", line.trim()),
                }
            }
        })?;

    Ok(ButtonState { increase, decrease })
}
