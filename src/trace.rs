use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOp {
    Load,
    Store,
    Modify,
}

impl fmt::Display for TraceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceOp::Load => write!(f, "L"),
            TraceOp::Store => write!(f, "S"),
            TraceOp::Modify => write!(f, "M"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceEntry {
    pub op: TraceOp,
    pub address: u32,
    // Access width in bytes; carried for the verbose echo, never used for
    // classification (block contents are not modeled).
    pub size: u32,
}

#[derive(Debug, Clone)]
pub struct TraceFile {
    pub name: String,
    pub entries: Vec<TraceEntry>,
}

impl TraceFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Unable to open trace file {}", path.display()))?;
        let name = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::parse(BufReader::new(file), name)
    }

    pub fn parse(reader: impl BufRead, name: String) -> Result<Self> {
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line.context("Failed to read line from trace")?;
            if let Some(entry) = parse_record(&line) {
                entries.push(entry);
            }
        }
        Ok(Self { name, entries })
    }
}

// Valgrind lackey format: " OP ADDR,SIZE" with OP in {L, S, M}. Instruction
// fetches ("I ..." with no leading space), blank lines and anything malformed
// are skipped without reaching the cache model.
fn parse_record(line: &str) -> Option<TraceEntry> {
    let trimmed = line.trim();
    let mut parts = trimmed.split_whitespace();
    let op = match parts.next()? {
        "L" => TraceOp::Load,
        "S" => TraceOp::Store,
        "M" => TraceOp::Modify,
        _ => return None,
    };
    let operand = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let (addr, size) = operand.split_once(',')?;
    let address = u32::from_str_radix(addr, 16).ok()?;
    let size = size.parse::<u32>().ok()?;
    Some(TraceEntry { op, address, size })
}
