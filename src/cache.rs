use std::fmt;

use anyhow::{Result, bail};

use crate::trace::{TraceEntry, TraceOp};

// Simulated addresses are 32-bit unsigned, as in valgrind lackey traces.
pub const ADDRESS_BITS: u32 = 32;

#[derive(Debug, Clone, Copy)]
pub struct CacheGeometry {
    pub set_index_bits: u32,    // s
    pub block_offset_bits: u32, // b
    pub associativity: usize,   // E, set to 1 for Direct-Mapped
}

impl CacheGeometry {
    pub fn new(set_index_bits: u32, block_offset_bits: u32, associativity: usize) -> Result<Self> {
        if set_index_bits == 0 || block_offset_bits == 0 || associativity == 0 {
            bail!("set index bits, block offset bits and associativity must all be positive");
        }
        if set_index_bits.saturating_add(block_offset_bits) >= ADDRESS_BITS {
            bail!(
                "geometry leaves no tag bits: s + b must be less than {}",
                ADDRESS_BITS
            );
        }
        Ok(Self {
            set_index_bits,
            block_offset_bits,
            associativity,
        })
    }

    pub fn num_sets(&self) -> usize {
        1 << self.set_index_bits
    }

    pub fn tag_bits(&self) -> u32 {
        ADDRESS_BITS - self.set_index_bits - self.block_offset_bits
    }

    fn tag(&self, address: u32) -> u32 {
        address >> (self.block_offset_bits + self.set_index_bits)
    }

    fn set_index(&self, address: u32) -> usize {
        (address >> self.block_offset_bits) as usize & (self.num_sets() - 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit,
    MissFill,
    MissEvict,
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessOutcome::Hit => write!(f, "hit"),
            AccessOutcome::MissFill => write!(f, "miss"),
            AccessOutcome::MissEvict => write!(f, "miss eviction"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn record(&mut self, outcome: AccessOutcome) {
        match outcome {
            AccessOutcome::Hit => self.hits += 1,
            AccessOutcome::MissFill => self.misses += 1,
            AccessOutcome::MissEvict => {
                self.misses += 1;
                self.evictions += 1;
            }
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits:{} misses:{} evictions:{}",
            self.hits, self.misses, self.evictions
        )
    }
}

pub struct Cache {
    geometry: CacheGeometry,
    sets: Vec<CacheSet>,
    clock: u64,
}

impl Cache {
    pub fn new(geometry: CacheGeometry) -> Self {
        let sets = (0..geometry.num_sets())
            .map(|_| CacheSet::new(geometry.associativity))
            .collect();
        Self {
            geometry,
            sets,
            clock: 0,
        }
    }

    pub fn access(&mut self, address: u32) -> AccessOutcome {
        let tag = self.geometry.tag(address);
        let set_index = self.geometry.set_index(address);
        let outcome = self.sets[set_index].access(tag, self.clock);
        self.clock += 1;
        outcome
    }

    pub fn load(&mut self, address: u32) -> AccessOutcome {
        self.access(address)
    }

    // Stores behave exactly like loads: no dirty bits, no write-back accounting.
    pub fn store(&mut self, address: u32) -> AccessOutcome {
        self.access(address)
    }

    // A modify is a load immediately followed by a store to the same address,
    // so the second access always hits the line the first one touched.
    pub fn modify(&mut self, address: u32) -> (AccessOutcome, AccessOutcome) {
        (self.access(address), self.access(address))
    }

    pub fn run_trace(&mut self, entries: &[TraceEntry], verbose: bool) -> CacheStats {
        let mut stats = CacheStats::default();
        for entry in entries {
            match entry.op {
                TraceOp::Load => {
                    let outcome = self.load(entry.address);
                    stats.record(outcome);
                    echo(verbose, entry, &[outcome]);
                }
                TraceOp::Store => {
                    let outcome = self.store(entry.address);
                    stats.record(outcome);
                    echo(verbose, entry, &[outcome]);
                }
                TraceOp::Modify => {
                    let (first, second) = self.modify(entry.address);
                    stats.record(first);
                    stats.record(second);
                    echo(verbose, entry, &[first, second]);
                }
            }
        }
        stats
    }
}

fn echo(verbose: bool, entry: &TraceEntry, outcomes: &[AccessOutcome]) {
    if !verbose {
        return;
    }
    let mut line = format!("{} {:x},{}", entry.op, entry.address, entry.size);
    for outcome in outcomes {
        line.push(' ');
        line.push_str(&outcome.to_string());
    }
    eprintln!("{line}");
}

#[derive(Clone)]
struct CacheLine {
    tag: u32,
    last_used: u64,
    valid: bool,
}

impl CacheLine {
    fn invalid() -> Self {
        Self {
            tag: 0,
            last_used: 0,
            valid: false,
        }
    }
}

struct CacheSet {
    lines: Vec<CacheLine>,
}

impl CacheSet {
    fn new(ways: usize) -> Self {
        Self {
            lines: vec![CacheLine::invalid(); ways],
        }
    }

    fn access(&mut self, tag: u32, tick: u64) -> AccessOutcome {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.valid && line.tag == tag)
        {
            line.last_used = tick;
            return AccessOutcome::Hit;
        }
        // Miss: fill the first empty way if there is one.
        if let Some(line) = self.lines.iter_mut().find(|line| !line.valid) {
            line.valid = true;
            line.tag = tag;
            line.last_used = tick;
            return AccessOutcome::MissFill;
        }
        // Set full: evict the LRU way. min_by_key keeps the first minimum,
        // so timestamp ties break toward the lowest way index.
        let idx = self
            .lines
            .iter()
            .enumerate()
            .min_by_key(|(_, line)| line.last_used)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let line = &mut self.lines[idx];
        line.tag = tag;
        line.last_used = tick;
        AccessOutcome::MissEvict
    }
}
