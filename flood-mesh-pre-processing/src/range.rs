/// Global min/max reduction over valid cells
use crate::error::{Diagnostic, RangeQuantity, RangeScope};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Chunk size for the parallel one-shot reduction.
const PARALLEL_CHUNK: usize = 25_000;

/// Scalar `(min, max)` pair over valid cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    /// Create an empty range initialised to infinity values
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Update the range with a new value
    pub fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Merge two partial ranges
    pub fn merge(mut self, other: Self) -> Self {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Normalise `value` to 0-1, clamped. A degenerate range maps to 0.
    pub fn normalize(&self, value: f64) -> f32 {
        if self.span() <= 0.0 {
            return 0.0;
        }
        ((value - self.min) / self.span()).clamp(0.0, 1.0) as f32
    }
}

/// Min/max of `values` over cells where `valid` is set.
///
/// Runs in parallel chunks and is not resumable; the pipeline uses
/// [`RangeScan`] instead so it can yield between chunks.
pub fn compute_range(
    values: &[f64],
    valid: &[bool],
    quantity: RangeQuantity,
) -> Result<ValueRange, Diagnostic> {
    let range = values
        .par_chunks(PARALLEL_CHUNK)
        .zip(valid.par_chunks(PARALLEL_CHUNK))
        .map(|(chunk, mask)| {
            let mut local = ValueRange::empty();
            for (value, _) in chunk.iter().zip(mask).filter(|(_, v)| **v) {
                local.update(*value);
            }
            local
        })
        .reduce_with(ValueRange::merge)
        .unwrap_or_else(ValueRange::empty);

    if range.is_empty() {
        Err(Diagnostic::EmptyValidRange {
            quantity,
            scope: RangeScope::Grid,
        })
    } else {
        Ok(range)
    }
}

/// Resumable range reduction. Only the final pair is observable.
#[derive(Debug, Clone)]
pub struct RangeScan {
    quantity: RangeQuantity,
    cursor: usize,
    partial: ValueRange,
}

impl RangeScan {
    pub fn new(quantity: RangeQuantity) -> Self {
        Self {
            quantity,
            cursor: 0,
            partial: ValueRange::empty(),
        }
    }

    pub fn quantity(&self) -> RangeQuantity {
        self.quantity
    }

    /// Cells consumed so far.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Scan at most `budget` further cells. Returns `None` while cells
    /// remain, and the finished reduction once the slice is exhausted.
    pub fn advance(
        &mut self,
        values: &[f64],
        valid: &[bool],
        budget: usize,
    ) -> Option<Result<ValueRange, Diagnostic>> {
        let end = (self.cursor + budget).min(values.len());
        for i in self.cursor..end {
            if valid[i] {
                self.partial.update(values[i]);
            }
        }
        self.cursor = end;

        if self.cursor < values.len() {
            return None;
        }

        if self.partial.is_empty() {
            Some(Err(Diagnostic::EmptyValidRange {
                quantity: self.quantity,
                scope: RangeScope::Grid,
            }))
        } else {
            Some(Ok(self.partial))
        }
    }
}
