mod common;

use common::{CaptureLogger, RAM, RAM_SIZE};
use kernel_lmb::{DtReservation, MemoryModel, RegionFlags, reserve_device_tree};
use log::Level;

#[test]
fn dump_goes_through_the_log_facade() {
    let logger = CaptureLogger::install();

    let mut model = MemoryModel::new();
    model.add_memory(RAM, RAM_SIZE).unwrap();
    model.reserve(RAM, 0x1000, RegionFlags::NO_MAP).unwrap();
    model.log_dump(Level::Info);

    assert_eq!(
        logger.lines_at(Level::Info),
        [
            " memory.count = 0x1",
            " memory[0]\t[0x40000000-0x5fffffff], 0x20000000 bytes, flags: none",
            " reserved.count = 0x1",
            " reserved[0]\t[0x40000000-0x40000fff], 0x00001000 bytes, flags: no-map",
        ]
    );
    assert!(
        logger
            .lines_at(Level::Trace)
            .iter()
            .any(|line| line.starts_with("Reserve 0x40000000+0x1000"))
    );
}

#[test]
fn failed_import_is_reported() {
    let logger = CaptureLogger::install();

    let mut model = MemoryModel::new();
    let entries = [
        DtReservation::new(0x8000_0000, 0x1000, false),
        DtReservation::new(0x8000_0000, 0x1000, true),
    ];
    assert!(reserve_device_tree(&mut model, entries).is_err());

    let warnings = logger.lines_at(Level::Warn);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("device tree range 0x80000000+0x1000 not reserved"));
}
