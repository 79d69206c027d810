/// Blocking temperature read. A disconnected sensor surfaces as an
/// implausible value rather than an error.
pub trait TemperatureSensor {
    fn read_celsius(&mut self) -> f32;
}

/// Non-volatile key to float storage. Absent or erased records read as `0.0`.
pub trait RecordStore {
    fn get(&mut self, address: Address) -> f32;
    fn put(&mut self, address: Address, value: f32);
}

pub trait Display {
    fn write(&mut self, line: u8, column: u8, text: &str);

    fn set_backlight(&mut self, _on: bool) {}
}

pub trait InputLine {
    fn is_pressed(&mut self) -> bool;
}

pub trait OutputLine {
    fn set_active(&mut self, active: bool);
}

pub trait Clock {
    fn now_ms(&self) -> u64;
    fn sleep_ms(&mut self, ms: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub u16);

impl<T: RecordStore + ?Sized> RecordStore for &mut T {
    fn get(&mut self, address: Address) -> f32 {
        (**self).get(address)
    }

    fn put(&mut self, address: Address, value: f32) {
        (**self).put(address, value)
    }
}
