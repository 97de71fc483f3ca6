//! Fusion accumulator
//!
//! A [`FusedOperator`] collects gate operations (local matrix, target
//! qubits, control qubits) and defers building the combined matrix until
//! [`FusedOperator::perform_fusion`] is called.
//!
//! # Control bookkeeping
//!
//! Every control the accumulator knows about is in exactly one of two
//! places:
//!
//! - the *global* control set, when it controls literally every
//!   accumulated item; it is then applied by the kernel as a bitmask and
//!   costs nothing in matrix size, or
//! - the target set, when at least one item does not share it; every item
//!   that is controlled by it carries it as an extra, padded target bit.
//!
//! Inserting a gate keeps that invariant: a control that is new while items
//! already exist is padded into the new item only; a global control the new
//! gate lacks is demoted, i.e. padded into every existing item and moved to
//! the target set. Targets and global controls are therefore always
//! disjoint.
//!
//! # Composition order
//!
//! Items compose in insertion order: for items `G1, G2, ..., Gm` the fused
//! matrix is `Gm ⋯ G2 · G1`, so applying it equals applying the gates one
//! after another.

use crate::error::{FusionError, Result};
use crate::matrix_utils::DenseMatrix;
use num_complex::Complex64;
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// Largest target count the kernel family can apply in one dispatch
pub const MAX_FUSED_QUBITS: usize = 5;

/// Ordered list of qubit indices
pub type QubitList = SmallVec<[usize; 8]>;

/// One pending gate: a local dense matrix and the global qubits it touches
///
/// Entry `l` of [`Item::qubits`] is bit `l` of the matrix's row/column index.
#[derive(Clone)]
pub struct Item {
    matrix: DenseMatrix,
    qubits: QubitList,
}

impl Item {
    fn new(matrix: DenseMatrix, qubits: &[usize]) -> Self {
        Self {
            matrix,
            qubits: qubits.iter().copied().collect(),
        }
    }

    /// Local matrix, `2^k × 2^k` for `k = qubits().len()`
    pub fn matrix(&self) -> &DenseMatrix {
        &self.matrix
    }

    /// Global qubit index of every local bit, least significant first
    pub fn qubits(&self) -> &[usize] {
        &self.qubits
    }

    /// Fold `controls` into the matrix as new most-significant bits
    fn pad_controls(&mut self, controls: &[usize]) {
        if controls.is_empty() {
            return;
        }
        self.matrix = self.matrix.with_controls(controls.len());
        self.qubits.extend_from_slice(controls);
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item")
            .field("qubits", &self.qubits)
            .field("dim", &self.matrix.dim())
            .finish()
    }
}

/// The materialized result of a fusion: one matrix, its targets and its global controls
#[derive(Clone, Debug)]
pub struct FusedGate {
    matrix: DenseMatrix,
    targets: Vec<usize>,
    controls: Vec<usize>,
}

impl FusedGate {
    /// Dense matrix over [`FusedGate::targets`], `2^n × 2^n`
    pub fn matrix(&self) -> &DenseMatrix {
        &self.matrix
    }

    /// Target qubits in ascending order; entry `l` is local bit `l`
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Controls shared by every fused gate, ascending
    pub fn controls(&self) -> &[usize] {
        &self.controls
    }

    /// Number of target qubits
    pub fn num_qubits(&self) -> usize {
        self.targets.len()
    }

    /// Bitmask with one bit set per global control
    pub fn control_mask(&self) -> usize {
        self.controls.iter().fold(0, |mask, &c| mask | (1usize << c))
    }

    /// Split into `(matrix, targets, controls)`
    pub fn into_parts(self) -> (DenseMatrix, Vec<usize>, Vec<usize>) {
        (self.matrix, self.targets, self.controls)
    }
}

/// Incremental accumulator of gate operations
#[derive(Clone, Debug)]
pub struct FusedOperator {
    targets: BTreeSet<usize>,
    items: Vec<Item>,
    controls: BTreeSet<usize>,
    max_qubits: usize,
}

impl Default for FusedOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl FusedOperator {
    /// Create an empty accumulator with the default ceiling of [`MAX_FUSED_QUBITS`]
    pub fn new() -> Self {
        Self::with_max_qubits(MAX_FUSED_QUBITS)
    }

    /// Create an empty accumulator that refuses to materialize more than `max_qubits` targets
    pub fn with_max_qubits(max_qubits: usize) -> Self {
        Self {
            targets: BTreeSet::new(),
            items: Vec::new(),
            controls: BTreeSet::new(),
            max_qubits,
        }
    }

    /// Number of accumulated target qubits (padded controls included)
    pub fn num_qubits(&self) -> usize {
        self.targets.len()
    }

    /// Number of accumulated items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ceiling checked by [`FusedOperator::perform_fusion`]
    pub fn max_qubits(&self) -> usize {
        self.max_qubits
    }

    /// Accumulated target qubits, ascending
    pub fn targets(&self) -> impl Iterator<Item = usize> + '_ {
        self.targets.iter().copied()
    }

    /// Global controls, ascending
    pub fn controls(&self) -> impl Iterator<Item = usize> + '_ {
        self.controls.iter().copied()
    }

    /// Pending items in insertion order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Drop every pending item and control
    pub fn clear(&mut self) {
        self.targets.clear();
        self.items.clear();
        self.controls.clear();
    }

    /// Append a gate
    ///
    /// `matrix` must be `2^k × 2^k` for `k = targets.len()`; entry `l` of
    /// `targets` is local bit `l`. `controls` must be disjoint from
    /// `targets`. The accumulator is left unchanged on error.
    pub fn insert(&mut self, matrix: DenseMatrix, targets: &[usize], controls: &[usize]) -> Result<()> {
        validate_gate(&matrix, targets, controls)?;

        let mut item = Item::new(matrix, targets);
        self.targets.extend(targets.iter().copied());

        // Globals the new gate does not share must leave the global set.
        let mut demoted = self.controls.clone();
        let mut padded = QubitList::new();

        for &control in controls {
            if self.controls.contains(&control) {
                demoted.remove(&control);
            } else if !self.items.is_empty() {
                padded.push(control);
                self.targets.insert(control);
            } else {
                self.controls.insert(control);
            }
        }
        item.pad_controls(&padded);

        if !demoted.is_empty() {
            let demoted: QubitList = demoted.into_iter().collect();
            for control in &demoted {
                self.controls.remove(control);
                self.targets.insert(*control);
            }
            for existing in &mut self.items {
                existing.pad_controls(&demoted);
            }
        }

        self.items.push(item);
        debug_assert!(self.check_invariants());

        tracing::trace!(
            items = self.items.len(),
            targets = self.targets.len(),
            controls = self.controls.len(),
            "gate inserted into fused operator"
        );
        Ok(())
    }

    /// Materialize the combined matrix
    ///
    /// # Errors
    /// [`FusionError::CapacityExceeded`] if more than [`FusedOperator::max_qubits`]
    /// targets have accumulated.
    pub fn perform_fusion(&self) -> Result<FusedGate> {
        let n = self.targets.len();
        if n > self.max_qubits {
            return Err(FusionError::CapacityExceeded {
                qubits: n,
                max: self.max_qubits,
            });
        }

        let targets: Vec<usize> = self.targets.iter().copied().collect();
        let dim = 1usize << n;
        let mut fused = DenseMatrix::identity(dim).into_vec();

        for item in &self.items {
            apply_item_to_columns(&mut fused, dim, &targets, item);
        }

        tracing::debug!(
            items = self.items.len(),
            targets = ?targets,
            controls = ?self.controls,
            "fused operator materialized"
        );

        Ok(FusedGate {
            matrix: DenseMatrix::from_row_major(dim, fused)?,
            targets,
            controls: self.controls.iter().copied().collect(),
        })
    }

    /// [`FusedOperator::perform_fusion`], then [`FusedOperator::clear`] on success
    pub fn take(&mut self) -> Result<FusedGate> {
        let fused = self.perform_fusion()?;
        self.clear();
        Ok(fused)
    }

    fn check_invariants(&self) -> bool {
        self.controls.is_disjoint(&self.targets)
            && self.items.iter().all(|item| {
                item.matrix.dim() == 1usize << item.qubits.len()
                    && item.qubits.iter().all(|q| self.targets.contains(q))
            })
    }
}

fn validate_gate(matrix: &DenseMatrix, targets: &[usize], controls: &[usize]) -> Result<()> {
    if targets.is_empty() {
        return Err(FusionError::NoTargets);
    }
    if targets.len() >= usize::BITS as usize || matrix.dim() != 1usize << targets.len() {
        return Err(FusionError::DimensionMismatch {
            dim: matrix.dim(),
            targets: targets.len(),
        });
    }

    let limit = usize::BITS as usize;
    let mut seen = BTreeSet::new();
    for &qubit in targets.iter().chain(controls) {
        if qubit >= limit {
            return Err(FusionError::QubitOutOfRange { qubit, limit });
        }
        if !seen.insert(qubit) {
            return if targets.contains(&qubit) && controls.contains(&qubit) {
                Err(FusionError::TargetIsControl { qubit })
            } else {
                Err(FusionError::DuplicateQubit { qubit })
            };
        }
    }
    Ok(())
}

/// Left-multiply the running `dim × dim` matrix by `item` embedded over `targets`
///
/// For every column, each group of rows that differ only in the item's
/// bits is gathered, multiplied by the item matrix and scattered back.
fn apply_item_to_columns(fused: &mut [Complex64], dim: usize, targets: &[usize], item: &Item) {
    let local: &[Complex64] = item.matrix.as_slice();
    let local_dim = item.matrix.dim();

    // Position of every item qubit within the sorted target list.
    let positions: SmallVec<[usize; 8]> = item
        .qubits
        .iter()
        .map(|q| {
            let p = targets.partition_point(|t| t < q);
            debug_assert_eq!(targets.get(p), Some(q));
            p
        })
        .collect();

    let item_mask = positions.iter().fold(0usize, |m, &p| m | (1 << p));
    let offsets: SmallVec<[usize; 32]> = (0..local_dim)
        .map(|j| {
            positions
                .iter()
                .enumerate()
                .filter(|(l, _)| j & (1 << l) != 0)
                .fold(0usize, |acc, (_, &p)| acc | (1 << p))
        })
        .collect();

    let mut gathered: SmallVec<[Complex64; 32]> = SmallVec::from_elem(Complex64::new(0.0, 0.0), local_dim);

    for col in 0..dim {
        for base in (0..dim).filter(|b| b & item_mask == 0) {
            for (slot, &off) in gathered.iter_mut().zip(&offsets) {
                *slot = fused[(base | off) * dim + col];
            }
            for (row, &off) in offsets.iter().enumerate() {
                let mut acc = Complex64::new(0.0, 0.0);
                for (m, v) in local[row * local_dim..(row + 1) * local_dim].iter().zip(&gathered) {
                    acc += m * v;
                }
                fused[(base | off) * dim + col] = acc;
            }
        }
    }
}
