//! Randomized operation sequences checked against the table invariants.

use kernel_lmb::{FlagPolicy, LmbConfig, MemoryModel, NoopNotifier, RegionFlags};

/// Small deterministic generator, enough to shuffle operations.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }

    fn flags(&mut self) -> RegionFlags {
        RegionFlags::from_bits(u32::try_from(self.below(4)).unwrap())
    }
}

const PAGE: u64 = 0x1000;
const BANKS: [(u64, u64); 3] = [
    (0x0010_0000, 0x0040_0000),
    (0x0100_0000, 0x0080_0000),
    (0x0400_0000, 0x0020_0000),
];

fn run(seed: u64, policy: FlagPolicy) {
    let mut rng = XorShift(seed);
    let config = LmbConfig::new()
        .with_reserved_regions(12)
        .with_flag_policy(policy);
    let mut model = MemoryModel::with_config(config, NoopNotifier);
    model.add_memory_banks(BANKS).unwrap();

    let mut live: Vec<(u64, u64)> = Vec::new();

    for _ in 0..2_000 {
        match rng.below(5) {
            0 => {
                let base = rng.below(0x0500_0000 / PAGE) * PAGE;
                let size = (1 + rng.below(16)) * PAGE;
                let before = model.reserved().clone();
                let untouched = before.find_overlap(base, size).is_none();
                match model.reserve(base, size, rng.flags()) {
                    Err(_) => {
                        assert_eq!(model.reserved(), &before, "failed reserve changed the table");
                    }
                    Ok(()) if untouched && rng.below(4) == 0 => {
                        // reserving free space and freeing it again is a round trip
                        if model.free(base, size).is_ok() {
                            assert_eq!(model.reserved(), &before);
                        }
                    }
                    Ok(()) => {}
                }
            }
            1 | 2 => {
                let size = (1 + rng.below(32)) * PAGE;
                let align = 1 << rng.below(16);
                let max = rng.below(2).eq(&1).then(|| rng.below(0x0500_0000));
                if let Some(addr) = model.alloc_top_down(size, align, max) {
                    assert_ne!(addr, 0);
                    assert_eq!(addr % align, 0);
                    if let Some(max) = max {
                        assert!(addr + size <= max);
                    }
                    assert!(
                        BANKS
                            .iter()
                            .any(|&(b, s)| b <= addr && addr + size <= b + s),
                        "allocation outside memory"
                    );
                    assert!(model.is_reserved(addr) && model.is_reserved(addr + size - 1));
                    live.push((addr, size));
                }
            }
            3 if !live.is_empty() => {
                let index = usize::try_from(rng.below(live.len() as u64)).unwrap();
                let (addr, size) = live.swap_remove(index);
                let before = model.reserved().clone();
                if model.free(addr, size).is_err() {
                    assert_eq!(model.reserved(), &before, "failed free changed the table");
                }
            }
            _ => {
                let addr = rng.below(0x0500_0000);
                let exact = model.free_size_in_bank(addr);
                if exact > 0 {
                    assert!(!model.is_reserved(addr));
                    assert!(!model.is_reserved(addr + exact - 1));
                    assert!(model.free_size_from(addr) >= exact);
                }
            }
        }

        let reserved = model.reserved();
        assert!(reserved.is_well_formed(), "broken table: {reserved}");
        assert!(reserved.len() <= reserved.capacity());
    }
}

#[test]
fn random_sequences_keep_tables_well_formed() {
    for seed in [0x2545_f491_4f6c_dd1d, 0x9e37_79b9_7f4a_7c15, 0xdead_beef_cafe_f00d] {
        run(seed, FlagPolicy::Legacy);
        run(seed, FlagPolicy::Strict);
    }
}

#[test]
fn fresh_allocations_never_overlap() {
    let mut model = MemoryModel::new();
    model.add_memory_banks(BANKS).unwrap();
    let mut rng = XorShift(7);
    let mut taken: Vec<(u64, u64)> = Vec::new();

    loop {
        let size = (1 + rng.below(64)) * PAGE;
        let Some(addr) = model.alloc(size, PAGE) else {
            break;
        };
        assert!(taken.iter().all(|&(b, s)| addr + size <= b || b + s <= addr));
        taken.push((addr, size));
    }

    let total: u64 = taken.iter().map(|&(_, s)| s).sum();
    assert!(!taken.is_empty());
    assert_eq!(model.reserved_size(), total);
    assert!(total <= model.total_memory());
}
