//! Byte-labeled automaton over `fst::raw`.
//!
//! Keys are byte strings; each key maps to a `u64` output that accumulates
//! by addition along its path. The builder pushes common output prefixes
//! towards the root, so on every node below the root the cheapest
//! continuation costs nothing extra: the output accumulated on a partial
//! path equals the cheapest completion under it. The exact engine's top-N
//! search relies on this.

use std::io::{Cursor, Read, Write};
use std::ops::Range;

use fst::raw::{Builder, CompiledAddr, Fst, Node, Transition};
use memmap2::Mmap;

use crate::lookup::SuggestError;
use crate::store::{DataInput, DataOutput};

/// Output algebra attached to arcs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outputs {
    /// Every output is the identity; used by the bucketed engine.
    NoOutput,
    /// Non-negative integers combined by addition; used by the exact engine.
    PositiveInt,
}

impl Outputs {
    pub fn identity(self) -> u64 {
        0
    }

    pub fn combine(self, prefix: u64, output: u64) -> u64 {
        match self {
            Self::NoOutput => 0,
            Self::PositiveInt => prefix + output,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::NoOutput => 0,
            Self::PositiveInt => 1,
        }
    }
}

/// Backing bytes: built in memory or mapped from a stored file.
enum AutomatonBytes {
    Owned(Vec<u8>),
    Mapped { map: Mmap, range: Range<usize> },
}

impl AsRef<[u8]> for AutomatonBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes,
            Self::Mapped { map, range } => &map[range.clone()],
        }
    }
}

/// An outgoing arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub label: u8,
    pub output: u64,
    pub target: CompiledAddr,
}

impl From<Transition> for Edge {
    fn from(t: Transition) -> Self {
        Self {
            label: t.inp,
            output: t.out.value(),
            target: t.addr,
        }
    }
}

/// Arcs of one node in ascending label order.
pub struct Edges<'a> {
    node: Node<'a>,
    next: usize,
}

impl Iterator for Edges<'_> {
    type Item = Edge;

    fn next(&mut self) -> Option<Edge> {
        if self.next >= self.node.len() {
            return None;
        }
        let edge = self.node.transition(self.next).into();
        self.next += 1;
        Some(edge)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.node.len() - self.next;
        (n, Some(n))
    }
}

pub struct Automaton {
    fst: Fst<AutomatonBytes>,
    outputs: Outputs,
}

impl std::fmt::Debug for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Automaton")
            .field("outputs", &self.outputs)
            .field("len", &self.len())
            .field("size_in_bytes", &self.size_in_bytes())
            .finish()
    }
}

impl Automaton {
    pub fn from_bytes(bytes: Vec<u8>, outputs: Outputs) -> Result<Self, SuggestError> {
        Self::from_data(AutomatonBytes::Owned(bytes), outputs)
    }

    fn from_data(data: AutomatonBytes, outputs: Outputs) -> Result<Self, SuggestError> {
        Ok(Self {
            fst: Fst::new(data)?,
            outputs,
        })
    }

    pub fn outputs(&self) -> Outputs {
        self.outputs
    }

    pub fn root(&self) -> CompiledAddr {
        self.fst.root().addr()
    }

    pub fn edges(&self, node: CompiledAddr) -> Edges<'_> {
        Edges {
            node: self.fst.node(node),
            next: 0,
        }
    }

    pub fn find_edge(&self, node: CompiledAddr, label: u8) -> Option<Edge> {
        let node = self.fst.node(node);
        node.find_input(label).map(|i| node.transition(i).into())
    }

    pub fn is_final(&self, node: CompiledAddr) -> bool {
        self.fst.node(node).is_final()
    }

    pub fn final_output(&self, node: CompiledAddr) -> u64 {
        self.fst.node(node).final_output().value()
    }

    /// Follow `key` from `node`. Returns the node reached and the output
    /// accumulated on the way, or `None` if some byte has no arc.
    pub fn descend(&self, node: CompiledAddr, key: &[u8]) -> Option<(CompiledAddr, u64)> {
        let mut addr = node;
        let mut output = self.outputs.identity();
        for &b in key {
            let edge = self.find_edge(addr, b)?;
            output = self.outputs.combine(output, edge.output);
            addr = edge.target;
        }
        Some((addr, output))
    }

    /// Full output of an accepted key.
    pub fn get(&self, key: &[u8]) -> Option<u64> {
        let (addr, output) = self.descend(self.root(), key)?;
        self.is_final(addr)
            .then(|| self.outputs.combine(output, self.final_output(addr)))
    }

    /// Number of accepted keys.
    pub fn len(&self) -> usize {
        self.fst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fst.len() == 0
    }

    pub fn size_in_bytes(&self) -> usize {
        self.fst.as_bytes().len()
    }

    /// Write the automaton block: outputs tag, vlong length, CRC-32 of the
    /// bytes, then the bytes.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), SuggestError> {
        let bytes = self.fst.as_bytes();
        out.write_byte(self.outputs.tag())?;
        out.write_vlong(bytes.len() as u64)?;
        out.write_u32_be(crc32fast::hash(bytes))?;
        out.write_all(bytes)?;
        Ok(())
    }

    pub fn read_from<R: Read + ?Sized>(input: &mut R, outputs: Outputs) -> Result<Self, SuggestError> {
        let (len, crc) = read_block_header(input, outputs)?;
        let mut bytes = vec![0u8; len];
        input.read_exact(&mut bytes)?;
        verify_checksum(&bytes, crc)?;
        Self::from_bytes(bytes, outputs)
    }

    /// Open the automaton block that starts at `offset` in `map` without
    /// copying it.
    pub fn from_mapped(map: Mmap, offset: usize, outputs: Outputs) -> Result<Self, SuggestError> {
        let block = map.get(offset..).ok_or(SuggestError::InvalidHeader)?;
        let mut cursor = Cursor::new(block);
        let (len, crc) = read_block_header(&mut cursor, outputs)?;
        let start = offset + cursor.position() as usize;
        let end = start.checked_add(len).ok_or(SuggestError::InvalidHeader)?;
        let bytes = map.get(start..end).ok_or(SuggestError::InvalidHeader)?;
        verify_checksum(bytes, crc)?;
        Self::from_data(
            AutomatonBytes::Mapped {
                map,
                range: start..end,
            },
            outputs,
        )
    }
}

fn read_block_header<R: Read + ?Sized>(
    input: &mut R,
    outputs: Outputs,
) -> Result<(usize, u32), SuggestError> {
    let tag = input.read_byte()?;
    if tag != outputs.tag() {
        return Err(SuggestError::OutputsMismatch(tag, outputs.tag()));
    }
    let len = usize::try_from(input.read_vlong()?).map_err(|_| SuggestError::InvalidHeader)?;
    let crc = input.read_u32_be()?;
    Ok((len, crc))
}

fn verify_checksum(bytes: &[u8], stored: u32) -> Result<(), SuggestError> {
    let computed = crc32fast::hash(bytes);
    if computed != stored {
        return Err(SuggestError::ChecksumMismatch { stored, computed });
    }
    Ok(())
}

/// Incremental construction. Keys must arrive in strictly increasing byte
/// order; suffixes are shared as the automaton is compiled.
///
/// There is no shared-tail-length limit to tune. Suffix sharing always runs
/// through `fst`'s bounded node cache, which behaves like an unbounded tail
/// length for typical dictionaries but does not guarantee a minimal automaton.
pub struct AutomatonBuilder {
    builder: Builder<Vec<u8>>,
    outputs: Outputs,
    count: usize,
}

impl AutomatonBuilder {
    pub fn new(outputs: Outputs) -> Self {
        Self {
            builder: Builder::memory(),
            outputs,
            count: 0,
        }
    }

    pub fn add(&mut self, key: &[u8], output: u64) -> Result<(), SuggestError> {
        match self.outputs {
            Outputs::NoOutput => self.builder.add(key)?,
            Outputs::PositiveInt => self.builder.insert(key, output)?,
        }
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Compile the automaton; `None` if no key was added.
    pub fn finish(self) -> Result<Option<Automaton>, SuggestError> {
        if self.count == 0 {
            return Ok(None);
        }
        let bytes = self.builder.into_inner()?;
        Automaton::from_bytes(bytes, self.outputs).map(Some)
    }
}
