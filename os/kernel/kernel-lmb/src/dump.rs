//! Human-readable dumps of the region tables.
//!
//! ```text
//!  memory.count = 0x1
//!  memory[0]	[0x40000000-0x5fffffff], 0x20000000 bytes, flags: none
//!  reserved.count = 0x0
//! ```

use crate::model::MemoryModel;
use crate::notify::ChangeNotifier;
use crate::region_set::RegionSet;
use core::fmt;
use log::{Level, log};

/// A [`RegionSet`] printed under a table name.
#[derive(Debug, Clone, Copy)]
pub struct TableDump<'a> {
    name: &'a str,
    set: &'a RegionSet,
}

impl RegionSet {
    /// Dump view labelling every line with `name`.
    #[must_use]
    pub const fn dump<'a>(&'a self, name: &'a str) -> TableDump<'a> {
        TableDump { name, set: self }
    }
}

impl fmt::Display for TableDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " {}.count = 0x{:x}", self.name, self.set.len())?;
        for (i, region) in self.set.iter().enumerate() {
            writeln!(f, " {}[{i}]\t{region}", self.name)?;
        }
        Ok(())
    }
}

impl fmt::Display for RegionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump("regions").fmt(f)
    }
}

impl<N: ChangeNotifier> fmt::Display for MemoryModel<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.available().dump("memory").fmt(f)?;
        self.reserved().dump("reserved").fmt(f)
    }
}

impl<N: ChangeNotifier> MemoryModel<N> {
    /// Emit the dump through the `log` facade, one record per line.
    pub fn log_dump(&self, level: Level) {
        for (name, set) in [("memory", self.available()), ("reserved", self.reserved())] {
            log!(level, " {name}.count = 0x{:x}", set.len());
            for (i, region) in set.iter().enumerate() {
                log!(level, " {name}[{i}]\t{region}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{MemoryModel, RegionFlags, RegionSet};
    use alloc::string::ToString;

    #[test]
    fn model_dump_lists_both_tables() {
        let mut model = MemoryModel::new();
        model.add_memory(0x4000_0000, 0x2000_0000).unwrap();
        assert_eq!(
            model.to_string(),
            " memory.count = 0x1\n \
             memory[0]\t[0x40000000-0x5fffffff], 0x20000000 bytes, flags: none\n \
             reserved.count = 0x0\n"
        );
    }

    #[test]
    fn set_dump_uses_given_name() {
        let mut set = RegionSet::new(4);
        set.insert_flagged(0x1000, 0x10, RegionFlags::NO_MAP).unwrap();
        set.insert_flagged(0x3000, 0x10, RegionFlags::NONE).unwrap();
        let text = set.dump("rsv").to_string();
        let lines: alloc::vec::Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " rsv.count = 0x2");
        assert_eq!(
            lines[1],
            " rsv[0]\t[0x1000-0x100f], 0x00000010 bytes, flags: no-map"
        );
        assert!(lines[2].starts_with(" rsv[1]\t[0x3000-"));
        assert!(set.to_string().starts_with(" regions.count = 0x2\n"));
    }
}
