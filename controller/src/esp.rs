use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use display_interface::DisplayError;
use display_interface_i2c::I2CInterface;
use ds18b20::{Ds18b20, Resolution};
use esp_idf_hal::{
    delay::Ets,
    gpio::{AnyIOPin, AnyOutputPin, IOPin, Input, InputOutput, Output, OutputPin, PinDriver, Pull},
    i2c::{I2cConfig, I2cDriver},
    units::Hertz,
};
use esp_idf_svc::{
    hal::prelude::Peripherals,
    log::EspLogger,
    nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault},
    sys::{self, EspError},
};
use log::{info, warn};
use one_wire_bus::OneWire;

use valvestat_common::{
    sampler::SENSOR_FAULT_C, Address, Board, Clock, Display, InputLine, OutputLine, RecordStore,
    Runtime, TemperatureSensor, ThermostatConfig,
};

use crate::oled::{Ssd1306, CONTRAST_BRIGHT, CONTRAST_DIM, LINES};

const NVS_NAMESPACE: &str = "valvestat";
const NVS_CONFIG_KEY: &str = "config_json";

const ONE_WIRE_PIN: i32 = 4;
const OLED_ADDRESS: u8 = 0x3C;
const I2C_BAUDRATE_HZ: u32 = 400_000;
const WATCHDOG_TIMEOUT_SEC: u32 = 30;
/// Longest uninterrupted sleep before the watchdog is fed again.
const MAX_SLEEP_SLICE_MS: u64 = 1_000;

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let nvs_partition = EspDefaultNvsPartition::take()?;
    let mut config = load_config(nvs_partition.clone()).unwrap_or_else(|err| {
        warn!("failed to load config from NVS: {err:#}");
        ThermostatConfig::default()
    });
    if let Err(err) = config.validate() {
        warn!("invalid config, falling back to defaults for bad fields: {err}");
        config.sanitize();
    }

    let Peripherals { pins, i2c0, .. } = Peripherals::take()?;

    let sensor =
        Ds18b20Bus::new(pins.gpio4.downgrade()).context("failed to initialize DS18B20 bus")?;
    let records = NvsRecords::new(nvs_partition).context("failed to open NVS records")?;
    let i2c = I2cDriver::new(
        i2c0,
        pins.gpio21,
        pins.gpio22,
        &I2cConfig::new().baudrate(Hertz(I2C_BAUDRATE_HZ)),
    )
    .context("failed to claim OLED I2C bus")?;
    let display = PanelDisplay::new(i2c);
    let increase = Button::new(pins.gpio32.downgrade(), "increase")?;
    let decrease = Button::new(pins.gpio33.downgrade(), "decrease")?;
    let widen = Relay::new(pins.gpio26.downgrade_output(), "widen")?;
    let narrow = Relay::new(pins.gpio27.downgrade_output(), "narrow")?;

    let watchdog = TaskWatchdog::start(WATCHDOG_TIMEOUT_SEC)?;

    let board = Board {
        sensor,
        records,
        display,
        increase,
        decrease,
        widen,
        narrow,
        clock: EspClock {
            start: Instant::now(),
            watchdog,
        },
    };

    let control = thread::Builder::new()
        .name("control-loop".into())
        .stack_size(12 * 1024)
        .spawn(move || {
            if let Err(err) = watchdog.subscribe_current_task() {
                warn!("failed to register control loop with watchdog: {err:#}");
            }
            Runtime::new(config, board).run();
        })
        .context("failed to spawn control loop thread")?;

    control
        .join()
        .map_err(|_| anyhow!("control loop panicked"))
}

fn load_config(partition: EspDefaultNvsPartition) -> anyhow::Result<ThermostatConfig> {
    let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
    let mut buffer = vec![0_u8; 1024];

    match nvs.get_str(NVS_CONFIG_KEY, &mut buffer)? {
        Some(raw) => Ok(ThermostatConfig::from_json_str(raw)?),
        None => Ok(ThermostatConfig::default()),
    }
}

struct Ds18b20Bus {
    one_wire: OneWire<PinDriver<'static, AnyIOPin, InputOutput>>,
    sensor: Option<Ds18b20>,
    delay: Ets,
}

impl Ds18b20Bus {
    fn new(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut bus_pin = PinDriver::input_output_od(pin)?;
        bus_pin.set_pull(Pull::Up)?;
        bus_pin.set_high()?;

        let one_wire = OneWire::new(bus_pin)
            .map_err(|err| anyhow!("failed to initialize one-wire bus: {err:?}"))?;
        Ok(Self {
            one_wire,
            sensor: None,
            delay: Ets,
        })
    }

    fn locate(&mut self) -> anyhow::Result<Ds18b20> {
        let address = self
            .one_wire
            .devices(false, &mut self.delay)
            .map_while(Result::ok)
            .find(|address| address.family_code() == ds18b20::FAMILY_CODE)
            .ok_or_else(|| anyhow!("no DS18B20 on GPIO{ONE_WIRE_PIN}"))?;
        info!("DS18B20 on GPIO{ONE_WIRE_PIN}: {address:?}");
        Ds18b20::new::<core::convert::Infallible>(address)
            .map_err(|err| anyhow!("invalid DS18B20 address {address:?}: {err:?}"))
    }

    /// A failed conversion forgets the device so the next read searches again.
    fn convert(&mut self) -> anyhow::Result<f32> {
        let sensor = match self.sensor.take() {
            Some(sensor) => sensor,
            None => self.locate()?,
        };
        ds18b20::start_simultaneous_temp_measurement(&mut self.one_wire, &mut self.delay)
            .map_err(|err| anyhow!("conversion start failed: {err:?}"))?;
        Resolution::Bits12.delay_for_measurement_time(&mut self.delay);
        let data = sensor
            .read_data(&mut self.one_wire, &mut self.delay)
            .map_err(|err| anyhow!("scratchpad read failed: {err:?}"))?;
        self.sensor = Some(sensor);
        Ok(data.temperature)
    }
}

impl TemperatureSensor for Ds18b20Bus {
    fn read_celsius(&mut self) -> f32 {
        match self.convert() {
            Ok(celsius) => celsius,
            Err(err) => {
                warn!("DS18B20: {err:#}");
                SENSOR_FAULT_C
            }
        }
    }
}

/// Float records stored as raw bits under `rec<address>`.
struct NvsRecords {
    nvs: EspNvs<NvsDefault>,
}

impl NvsRecords {
    fn new(partition: EspDefaultNvsPartition) -> anyhow::Result<Self> {
        Ok(Self {
            nvs: EspNvs::new(partition, NVS_NAMESPACE, true)?,
        })
    }

    fn key(address: Address) -> String {
        format!("rec{}", address.0)
    }
}

impl RecordStore for NvsRecords {
    fn get(&mut self, address: Address) -> f32 {
        match self.nvs.get_u32(&Self::key(address)) {
            Ok(Some(bits)) => f32::from_bits(bits),
            Ok(None) => 0.0,
            Err(err) => {
                warn!("NVS read of {address:?} failed: {err}");
                0.0
            }
        }
    }

    fn put(&mut self, address: Address, value: f32) {
        if let Err(err) = self.nvs.set_u32(&Self::key(address), value.to_bits()) {
            warn!("NVS write of {address:?} failed: {err}");
        }
    }
}

struct Relay {
    pin: PinDriver<'static, AnyOutputPin, Output>,
    name: &'static str,
}

impl Relay {
    fn new(pin: AnyOutputPin, name: &'static str) -> anyhow::Result<Self> {
        let mut pin =
            PinDriver::output(pin).with_context(|| format!("failed to claim {name} output"))?;
        pin.set_low()?;
        Ok(Self { pin, name })
    }
}

impl OutputLine for Relay {
    fn set_active(&mut self, active: bool) {
        let result = if active {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if let Err(err) = result {
            warn!("failed to drive {}: {err}", self.name);
        }
    }
}

/// Push button to ground with the internal pull-up.
struct Button {
    pin: PinDriver<'static, AnyIOPin, Input>,
}

impl Button {
    fn new(pin: AnyIOPin, name: &'static str) -> anyhow::Result<Self> {
        let mut pin =
            PinDriver::input(pin).with_context(|| format!("failed to claim {name} button"))?;
        pin.set_pull(Pull::Up)?;
        Ok(Self { pin })
    }
}

impl InputLine for Button {
    fn is_pressed(&mut self) -> bool {
        self.pin.is_low()
    }
}

type Panel = Ssd1306<I2CInterface<I2cDriver<'static>>>;

/// SSD1306 panel on I2C with every line change mirrored to the log. A panel
/// that stops answering is dropped and the log keeps going.
struct PanelDisplay {
    panel: Option<Panel>,
    lines: [String; LINES],
}

impl PanelDisplay {
    fn new(i2c: I2cDriver<'static>) -> Self {
        let mut panel = Ssd1306::new(I2CInterface::new(i2c, OLED_ADDRESS, 0x40));
        let panel = match panel.init() {
            Ok(()) => Some(panel),
            Err(err) => {
                warn!("OLED init failed, display is log only: {err:?}");
                None
            }
        };
        Self {
            panel,
            lines: Default::default(),
        }
    }

    fn with_panel(&mut self, op: impl FnOnce(&mut Panel) -> Result<(), DisplayError>) {
        let Some(panel) = self.panel.as_mut() else {
            return;
        };
        if let Err(err) = op(panel) {
            warn!("OLED write failed, dropping panel: {err:?}");
            self.panel = None;
        }
    }
}

impl Display for PanelDisplay {
    fn write(&mut self, line: u8, column: u8, text: &str) {
        let index = usize::from(line);
        let Some(current) = self.lines.get_mut(index) else {
            return;
        };
        let mut updated: String = current.chars().take(column.into()).collect();
        updated.push_str(text);
        if *current == updated {
            return;
        }
        info!("lcd{line} |{updated}|");
        *current = updated.clone();
        self.with_panel(|panel| panel.show_line(index, &updated));
    }

    fn set_backlight(&mut self, on: bool) {
        let level = if on { CONTRAST_BRIGHT } else { CONTRAST_DIM };
        self.with_panel(|panel| panel.set_contrast(level));
    }
}

/// Feeds the task watchdog at least once a second while blocked.
struct EspClock {
    start: Instant,
    watchdog: TaskWatchdog,
}

impl Clock for EspClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn sleep_ms(&mut self, ms: u64) {
        let mut remaining = ms;
        loop {
            self.watchdog.feed();
            if remaining == 0 {
                break;
            }
            let slice = remaining.min(MAX_SLEEP_SLICE_MS);
            thread::sleep(Duration::from_millis(slice));
            remaining -= slice;
        }
    }
}

#[derive(Clone, Copy)]
struct TaskWatchdog;

impl TaskWatchdog {
    fn start(timeout_sec: u32) -> anyhow::Result<Self> {
        let config = sys::esp_task_wdt_config_t {
            timeout_ms: timeout_sec.saturating_mul(1000),
            idle_core_mask: 0,
            trigger_panic: true,
        };
        accept_invalid_state(unsafe { sys::esp_task_wdt_init(&config) })
            .context("esp_task_wdt_init")?;
        Ok(Self)
    }

    fn subscribe_current_task(self) -> anyhow::Result<()> {
        accept_invalid_state(unsafe { sys::esp_task_wdt_add(core::ptr::null_mut()) })
            .context("esp_task_wdt_add")
    }

    fn feed(self) {
        unsafe { sys::esp_task_wdt_reset() };
    }
}

// INVALID_STATE means already initialized or already subscribed.
fn accept_invalid_state(rc: sys::esp_err_t) -> Result<(), EspError> {
    match EspError::from(rc) {
        Some(err) if err.code() != sys::ESP_ERR_INVALID_STATE => Err(err),
        _ => Ok(()),
    }
}
