//! Index partitioning for kernel sweeps
//!
//! A kernel touching `k` target qubits of an `n`-qubit state visits
//! `2^(n-k)` independent groups of `2^k` amplitudes. Each group is named by
//! a *free-bit counter*: the `n - k` non-target index bits packed next to
//! each other. [`IterationGeometry`] records where each run of free bits
//! lives in the state index so that a counter value can be spread back into
//! a base index whose target bits are all zero.
//!
//! Example, `n = 5`, targets `{1, 3}`:
//!
//! ```text
//! state index bit:  4 | 3 | 2 | 1 | 0
//! role:             f | T | f | T | f
//! segment:          0 |   | 1 |   | 2
//! ```
//!
//! Segment 0 holds the bits above the highest target, segment `N` the bits
//! below the lowest one, and the segments in between the gaps.

use crate::error::{Result, SimulatorError};
use qfuse_fusion::MAX_FUSED_QUBITS;
use smallvec::SmallVec;
use std::fmt;

/// Integer width of the free-bit counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IndexWidth {
    U8,
    U16,
    U32,
}

impl IndexWidth {
    /// Largest width the sweep supports, in bytes
    pub const MAX_BYTES: usize = 4;

    /// Narrowest width holding `bits` counter bits
    ///
    /// Widths go in whole bytes; 3-byte counters use 32 bits.
    pub fn for_bits(bits: u32) -> Result<Self> {
        let bytes = bits.div_ceil(8) as usize;
        match bytes {
            0 | 1 => Ok(IndexWidth::U8),
            2 => Ok(IndexWidth::U16),
            3 | 4 => Ok(IndexWidth::U32),
            _ => Err(SimulatorError::Capacity {
                what: "free-bit index width in bytes",
                requested: bytes,
                limit: Self::MAX_BYTES,
            }),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            IndexWidth::U8 => u8::BITS,
            IndexWidth::U16 => u16::BITS,
            IndexWidth::U32 => u32::BITS,
        }
    }
}

impl fmt::Display for IndexWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.bits())
    }
}

/// Bit layout mapping a free-bit counter to a state-vector base index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationGeometry {
    num_qubits: usize,
    /// `2^(q+1)` for every target `q`, descending
    strides: SmallVec<[usize; MAX_FUSED_QUBITS]>,
    /// Counter bits of each segment, shifted into place
    masks: SmallVec<[u64; 8]>,
    /// Position of each segment inside the counter
    offsets: SmallVec<[u32; 8]>,
    free_bits: u32,
    width: IndexWidth,
}

impl IterationGeometry {
    /// Partition an `num_qubits`-qubit index space around `targets`
    ///
    /// # Errors
    /// - [`SimulatorError::InvalidOperation`] for empty, duplicate or out-of-range targets
    /// - [`SimulatorError::Capacity`] for more than [`MAX_FUSED_QUBITS`] targets,
    ///   or when the counter needs more than 4 bytes
    pub fn new(num_qubits: usize, targets: &[usize]) -> Result<Self> {
        if targets.is_empty() {
            return Err(SimulatorError::InvalidOperation(
                "a kernel needs at least one target qubit".to_string(),
            ));
        }
        if targets.len() > MAX_FUSED_QUBITS {
            return Err(SimulatorError::Capacity {
                what: "target qubit count",
                requested: targets.len(),
                limit: MAX_FUSED_QUBITS,
            });
        }

        let mut sorted: SmallVec<[usize; MAX_FUSED_QUBITS]> = targets.iter().copied().collect();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        if let Some(&highest) = sorted.first() {
            if highest >= num_qubits {
                return Err(SimulatorError::InvalidOperation(format!(
                    "target qubit {} out of range for {} qubits",
                    highest, num_qubits
                )));
            }
        }
        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(SimulatorError::InvalidOperation(format!(
                "target qubit {} listed twice",
                pair[0]
            )));
        }

        // Bits per segment: above the highest target, between neighbours,
        // below the lowest target.
        let n = targets.len();
        let mut sizes: SmallVec<[usize; 8]> = SmallVec::with_capacity(n + 1);
        sizes.push(num_qubits - 1 - sorted[0]);
        for pair in sorted.windows(2) {
            sizes.push(pair[0] - pair[1] - 1);
        }
        sizes.push(sorted[n - 1]);

        // Width first: it bounds every segment and target before the shifts below.
        let free_bits = u32::try_from(sizes.iter().sum::<usize>()).unwrap_or(u32::MAX);
        let width = IndexWidth::for_bits(free_bits)?;

        let mut masks = SmallVec::with_capacity(n + 1);
        let mut offsets = SmallVec::with_capacity(n + 1);
        let mut offset = 0u32;
        for &size in &sizes {
            let size = size as u32;
            masks.push(((1u64 << size) - 1) << offset);
            offsets.push(offset);
            offset += size;
        }

        Ok(Self {
            num_qubits,
            strides: sorted.iter().map(|&q| 1usize << (q + 1)).collect(),
            masks,
            offsets,
            free_bits,
            width,
        })
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of target qubits
    pub fn num_targets(&self) -> usize {
        self.strides.len()
    }

    /// Index bits not occupied by a target (`n - k`)
    pub fn free_bits(&self) -> u32 {
        self.free_bits
    }

    /// Counter width chosen for the sweep
    pub fn width(&self) -> IndexWidth {
        self.width
    }

    /// Number of amplitude groups, `2^free_bits`
    pub fn group_count(&self) -> u64 {
        1u64 << self.free_bits
    }

    /// Last counter value
    ///
    /// The bulk sweep covers `0..upper_bound()`; this value runs on its own
    /// afterwards so the range end never overflows the counter type.
    pub fn upper_bound(&self) -> u64 {
        (1u64 << self.free_bits) - 1
    }

    /// Spread the bits of `counter` into a state index with all target bits clear
    #[inline]
    pub fn base_index(&self, counter: u64) -> usize {
        let last = self.strides.len();
        let mut index = ((counter & self.masks[last]) >> self.offsets[last]) as usize;
        for (segment, &stride) in self.strides.iter().enumerate() {
            index += ((counter & self.masks[segment]) >> self.offsets[segment]) as usize * stride;
        }
        index
    }
}
