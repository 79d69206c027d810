use std::collections::BTreeMap;

use log::debug;

use crate::{
    band::Band,
    hal::{Address, RecordStore},
};

pub const ADDR_BAND_MIN: Address = Address(0);
/// Record holding the upper band bound. Floats take four bytes of storage.
pub const ADDR_BAND_MAX: Address = Address(4);

pub const MAX_PERSISTED_VALUE: f32 = 300.0;

/// Validating front-end over a [`RecordStore`].
///
/// Stored values outside `(0, 300]` read as absent: erased storage is
/// indistinguishable from a stored zero.
#[derive(Debug)]
pub struct SetpointStore<S> {
    records: S,
}

impl<S: RecordStore> SetpointStore<S> {
    pub fn new(records: S) -> Self {
        Self { records }
    }

    pub fn load(&mut self, address: Address, default: f32) -> f32 {
        let value = self.records.get(address);
        if is_acceptable(value) {
            value
        } else {
            debug!("record {address:?} holds {value}, using default {default}");
            default
        }
    }

    pub fn save(&mut self, address: Address, value: f32) {
        self.records.put(address, value);
    }

    pub fn load_band(&mut self, defaults: Band) -> Band {
        Band {
            min_c: self.load(ADDR_BAND_MIN, defaults.min_c),
            max_c: self.load(ADDR_BAND_MAX, defaults.max_c),
        }
    }

    pub fn save_band(&mut self, band: &Band) {
        self.save(ADDR_BAND_MIN, band.min_c);
        self.save(ADDR_BAND_MAX, band.max_c);
    }

    pub fn records(&self) -> &S {
        &self.records
    }
}

fn is_acceptable(value: f32) -> bool {
    value > 0.0 && value <= MAX_PERSISTED_VALUE
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStore {
    values: BTreeMap<Address, f32>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, address: Address, value: f32) -> Self {
        self.values.insert(address, value);
        self
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn value(&self, address: Address) -> Option<f32> {
        self.values.get(&address).copied()
    }
}

impl RecordStore for MemoryStore {
    fn get(&mut self, address: Address) -> f32 {
        self.values.get(&address).copied().unwrap_or(0.0)
    }

    fn put(&mut self, address: Address, value: f32) {
        self.values.insert(address, value);
        self.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_one(stored: f32) -> f32 {
        let mut store = SetpointStore::new(MemoryStore::new().with(ADDR_BAND_MIN, stored));
        store.load(ADDR_BAND_MIN, 42.0)
    }

    #[test]
    fn accepts_values_in_range() {
        assert_eq!(load_one(0.5), 0.5);
        assert_eq!(load_one(55.0), 55.0);
        assert_eq!(load_one(300.0), 300.0);
    }

    #[test]
    fn zero_reads_as_absent() {
        assert_eq!(load_one(0.0), 42.0);
    }

    #[test]
    fn out_of_range_reads_as_absent() {
        assert_eq!(load_one(300.0001), 42.0);
        assert_eq!(load_one(-1.0), 42.0);
        assert_eq!(load_one(f32::NAN), 42.0);
        assert_eq!(load_one(f32::INFINITY), 42.0);
    }

    #[test]
    fn missing_record_uses_default() {
        let mut store = SetpointStore::new(MemoryStore::new());
        assert_eq!(store.load(ADDR_BAND_MAX, 60.0), 60.0);
    }

    #[test]
    fn band_falls_back_per_field() {
        let records = MemoryStore::new().with(ADDR_BAND_MIN, 50.0);
        let mut store = SetpointStore::new(records);

        let band = store.load_band(Band::new(45.0, 60.0));
        assert_eq!(band, Band::new(50.0, 60.0));
    }

    #[test]
    fn save_band_writes_both_records() {
        let mut records = MemoryStore::new();
        {
            let mut store = SetpointStore::new(&mut records);
            store.save_band(&Band::new(47.5, 58.0));
        }

        assert_eq!(records.value(ADDR_BAND_MIN), Some(47.5));
        assert_eq!(records.value(ADDR_BAND_MAX), Some(58.0));
        assert_eq!(records.writes(), 2);
    }

    #[test]
    fn save_is_unconditional() {
        let mut store = SetpointStore::new(MemoryStore::new());
        store.save(ADDR_BAND_MIN, 999.0);

        assert_eq!(store.records().value(ADDR_BAND_MIN), Some(999.0));
        assert_eq!(store.load(ADDR_BAND_MIN, 45.0), 45.0);
    }
}
