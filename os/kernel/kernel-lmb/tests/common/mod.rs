#![allow(dead_code)]

use kernel_lmb::{ChangeEvent, ChangeNotifier, LmbConfig, MemoryModel};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, Once};

pub const RAM: u64 = 0x4000_0000;
pub const RAM_SIZE: u64 = 0x2000_0000;
pub const RAM_END: u64 = RAM + RAM_SIZE;

/// Keeps every change event for later inspection.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub events: Vec<ChangeEvent>,
}

impl ChangeNotifier for Recorder {
    fn notify(&mut self, event: &ChangeEvent) {
        self.events.push(*event);
    }
}

pub fn model_with_ram() -> MemoryModel<Recorder> {
    let mut model = MemoryModel::with_config(LmbConfig::new(), Recorder::default());
    model.add_memory(RAM, RAM_SIZE).unwrap();
    model
}

/// `(base, size)` of every reservation.
pub fn reserved<N: ChangeNotifier>(model: &MemoryModel<N>) -> Vec<(u64, u64)> {
    model
        .reserved()
        .iter()
        .map(|r| (r.base(), r.size()))
        .collect()
}

/// In-memory `log` sink, formatting records like the kernel's serial logger.
pub struct CaptureLogger {
    max_level: LevelFilter,
    lines: Mutex<Vec<(Level, String)>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    max_level: LevelFilter::Trace,
    lines: Mutex::new(Vec::new()),
};
static INIT: Once = Once::new();

impl CaptureLogger {
    /// Install the capture logger once per test binary.
    pub fn install() -> &'static Self {
        INIT.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(LevelFilter::Trace);
        });
        &LOGGER
    }

    /// Messages logged at exactly `level`.
    pub fn lines_at(&self, level: Level) -> Vec<String> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, line)| line.clone())
            .collect()
    }
}

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.lines
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}
