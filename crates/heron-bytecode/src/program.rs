//! Instruction streams, label tables and protected regions

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::{Read, Write};

use crate::error::{BytecodeError, Result};
use crate::instruction::Instruction;
use crate::operand::{LabelId, Target};
use crate::{BYTECODE_MAGIC, BYTECODE_VERSION};

/// A try/catch/finally range of the instruction stream
///
/// `start..end` is half-open. When an exception is raised at a position
/// inside it, the operand stack is truncated to `stack_depth` and control
/// moves to `catch` (exception value pushed) or, without a catch, to
/// `finally` (exception parked until `END_FINALLY`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectedRegion {
    /// First covered position
    pub start: u32,
    /// One past the last covered position
    pub end: u32,
    /// Catch handler entry
    pub catch: Option<Target>,
    /// Finally handler entry
    pub finally: Option<Target>,
    /// Operand stack height restored before entering a handler
    pub stack_depth: u32,
}

impl ProtectedRegion {
    /// Whether `pc` is covered by this region
    #[inline]
    pub fn covers(&self, pc: usize) -> bool {
        (self.start as usize) <= pc && pc < (self.end as usize)
    }

    /// Number of covered positions
    #[inline]
    pub fn span(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

/// A validated instruction stream
///
/// Either unresolved (jumps reference labels, `LABEL` markers present) or
/// resolved (all targets are absolute positions, markers stripped). Both
/// forms execute identically.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    code: Vec<Instruction>,
    regions: Vec<ProtectedRegion>,
    labels: FxHashMap<LabelId, u32>,
}

#[derive(Serialize)]
struct EncodedRef<'a> {
    code: &'a [Instruction],
    regions: &'a [ProtectedRegion],
}

#[derive(Deserialize)]
struct Encoded {
    code: Vec<Instruction>,
    #[serde(default)]
    regions: Vec<ProtectedRegion>,
}

impl Program {
    /// Validate a stream and index its labels
    pub fn new(code: Vec<Instruction>, regions: Vec<ProtectedRegion>) -> Result<Self> {
        let mut labels = FxHashMap::default();
        for (pos, insn) in code.iter().enumerate() {
            if let Instruction::Label { id } = insn {
                if labels.insert(*id, pos as u32).is_some() {
                    return Err(BytecodeError::DuplicateLabel(*id));
                }
            }
        }

        let program = Self {
            code,
            regions,
            labels,
        };

        for target in program.code.iter().filter_map(Instruction::target) {
            program.check_target(target)?;
        }

        let len = program.code.len() as u32;
        for (index, region) in program.regions.iter().enumerate() {
            if region.catch.is_none() && region.finally.is_none() {
                return Err(BytecodeError::InvalidRegion(index));
            }
            if region.start > region.end || region.end > len {
                return Err(BytecodeError::InvalidRegion(index));
            }
            for target in region.catch.iter().chain(region.finally.iter()) {
                program.check_target(*target)?;
            }
        }

        Ok(program)
    }

    fn check_target(&self, target: Target) -> Result<()> {
        match target {
            Target::Label(id) if !self.labels.contains_key(&id) => {
                Err(BytecodeError::UnresolvedLabel(id))
            }
            Target::Position(pos) if pos as usize > self.code.len() => {
                Err(BytecodeError::TargetOutOfRange(pos))
            }
            _ => Ok(()),
        }
    }

    /// Create a builder
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::new()
    }

    /// The instruction stream
    #[inline]
    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    /// Instruction at `pc`
    #[inline]
    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.code.get(pc)
    }

    /// Number of instructions
    #[inline]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether the stream is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Protected regions
    #[inline]
    pub fn regions(&self) -> &[ProtectedRegion] {
        &self.regions
    }

    /// Whether every target is an absolute position and no markers remain
    pub fn is_resolved(&self) -> bool {
        self.labels.is_empty()
            && self
                .code
                .iter()
                .filter_map(Instruction::target)
                .all(|t| t.as_position().is_some())
    }

    /// Position of a label marker
    #[inline]
    pub fn label_position(&self, id: LabelId) -> Option<usize> {
        self.labels.get(&id).map(|&pos| pos as usize)
    }

    /// Absolute position of a target in this stream
    pub fn position_of(&self, target: Target) -> Option<usize> {
        match target {
            Target::Position(pos) => Some(pos as usize),
            Target::Label(id) => self.label_position(id),
        }
    }

    /// The innermost protected region covering `pc`
    pub fn covering_region(&self, pc: usize) -> Option<&ProtectedRegion> {
        self.regions
            .iter()
            .filter(|r| r.covers(pc))
            .min_by_key(|r| r.span())
    }

    /// Rewrite every label reference to an absolute position and strip the
    /// `LABEL` markers
    ///
    /// Positions after a stripped marker shift down; jumps, function entries
    /// and regions are rewritten accordingly.
    pub fn resolve(&self) -> Program {
        // shifted[p] = position of old p once markers before it are gone
        let mut shifted = Vec::with_capacity(self.code.len() + 1);
        let mut next = 0u32;
        for insn in &self.code {
            shifted.push(next);
            if !matches!(insn, Instruction::Label { .. }) {
                next += 1;
            }
        }
        shifted.push(next);

        let map = |target: Target| -> Target {
            let old = match target {
                Target::Position(pos) => pos,
                Target::Label(id) => self.labels.get(&id).copied().unwrap_or(next),
            };
            Target::Position(shifted.get(old as usize).copied().unwrap_or(next))
        };

        let code = self
            .code
            .iter()
            .filter(|insn| !matches!(insn, Instruction::Label { .. }))
            .cloned()
            .map(|mut insn| {
                if let Some(target) = insn.target_mut() {
                    *target = map(*target);
                }
                insn
            })
            .collect();

        let regions = self
            .regions
            .iter()
            .map(|r| ProtectedRegion {
                start: shifted[r.start as usize],
                end: shifted[r.end as usize],
                catch: r.catch.map(map),
                finally: r.finally.map(map),
                stack_depth: r.stack_depth,
            })
            .collect();

        Program {
            code,
            regions,
            labels: FxHashMap::default(),
        }
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&EncodedRef {
            code: &self.code,
            regions: &self.regions,
        })?)
    }

    /// Decode from JSON, re-validating the stream
    pub fn from_json(json: &str) -> Result<Self> {
        let encoded: Encoded = serde_json::from_str(json)?;
        Self::new(encoded.code, encoded.regions)
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();

        bytes.extend_from_slice(&BYTECODE_MAGIC);
        bytes.extend_from_slice(&BYTECODE_VERSION.to_le_bytes());

        let data = serde_json::to_vec(&EncodedRef {
            code: &self.code,
            regions: &self.regions,
        })?;
        bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&data);

        Ok(bytes)
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 16 {
            return Err(BytecodeError::UnexpectedEnd);
        }

        if bytes[0..8] != BYTECODE_MAGIC {
            return Err(BytecodeError::InvalidMagic);
        }

        let version = read_u32(bytes, 8)?;
        if version != BYTECODE_VERSION {
            return Err(BytecodeError::UnsupportedVersion(version));
        }

        let data_len = read_u32(bytes, 12)? as usize;
        let data = bytes
            .get(16..16 + data_len)
            .ok_or(BytecodeError::UnexpectedEnd)?;

        let encoded: Encoded = serde_json::from_slice(data)?;
        Self::new(encoded.code, encoded.regions)
    }

    /// Write program to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Read program from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    /// Render one instruction per line, followed by the region table
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (pos, insn) in self.code.iter().enumerate() {
            let _ = writeln!(out, "{:04}  {}", pos, insn);
        }
        for region in &self.regions {
            let handler = |t: Option<Target>| t.map_or_else(|| "-".to_string(), |t| t.to_string());
            let _ = writeln!(
                out,
                "try [{:04}, {:04})  catch={}  finally={}  depth={}",
                region.start,
                region.end,
                handler(region.catch),
                handler(region.finally),
                region.stack_depth
            );
        }
        out
    }
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32> {
    bytes
        .get(at..at + 4)
        .and_then(|slice| slice.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(BytecodeError::UnexpectedEnd)
}

/// Builder for emitting programs
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    code: Vec<Instruction>,
    regions: Vec<ProtectedRegion>,
    next_label: u32,
}

impl ProgramBuilder {
    /// Create a new program builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh label id
    pub fn new_label(&mut self) -> LabelId {
        let id = LabelId(self.next_label);
        self.next_label += 1;
        id
    }

    /// Emit the marker for `id` at the current position
    pub fn place_label(&mut self, id: LabelId) -> &mut Self {
        self.code.push(Instruction::Label { id });
        self
    }

    /// Emit an instruction, returning its position
    pub fn emit(&mut self, insn: Instruction) -> u32 {
        if let Instruction::Label { id } = insn {
            self.next_label = self.next_label.max(id.0 + 1);
        }
        self.code.push(insn);
        self.code.len() as u32 - 1
    }

    /// Emit several instructions
    pub fn emit_all(&mut self, insns: impl IntoIterator<Item = Instruction>) -> &mut Self {
        for insn in insns {
            self.emit(insn);
        }
        self
    }

    /// Position the next emitted instruction will get
    #[inline]
    pub fn position(&self) -> u32 {
        self.code.len() as u32
    }

    /// Register a protected region
    pub fn protect(&mut self, region: ProtectedRegion) -> &mut Self {
        self.regions.push(region);
        self
    }

    /// Validate labels and regions and produce the program
    pub fn build(self) -> Result<Program> {
        Program::new(self.code, self.regions)
    }
}
