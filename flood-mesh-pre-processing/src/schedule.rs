/// Cooperative yield points and cancellation
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    SamplingElevation,
    ReducingElevation,
    ReducingDepth,
    BuildingTiles,
    Complete,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::SamplingElevation => "Sampling elevation",
            Stage::ReducingElevation => "Reducing elevation range",
            Stage::ReducingDepth => "Reducing water depth range",
            Stage::BuildingTiles => "Building tiles",
            Stage::Complete => "Complete",
        }
    }
}

/// Where the pipeline stands after a chunk of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub stage: Stage,
    /// Units finished within the stage (cells or tiles)
    pub done: usize,
    pub total: usize,
}

/// Decision returned by a yield point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Abandon,
}

/// Called after every bounded chunk of pipeline work.
///
/// Single-threaded hosts suspend here; threaded hosts can treat it as a
/// no-op or a cancellation check.
pub trait YieldPoint {
    fn yield_now(&mut self, progress: &JobProgress) -> Flow;
}

impl<F> YieldPoint for F
where
    F: FnMut(&JobProgress) -> Flow,
{
    fn yield_now(&mut self, progress: &JobProgress) -> Flow {
        self(progress)
    }
}

/// Never suspends, never abandons.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYield;

impl YieldPoint for NoYield {
    fn yield_now(&mut self, _progress: &JobProgress) -> Flow {
        Flow::Continue
    }
}

/// Shared cancellation flag, checked at every yield point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl YieldPoint for CancelToken {
    fn yield_now(&mut self, _progress: &JobProgress) -> Flow {
        if self.is_cancelled() {
            Flow::Abandon
        } else {
            Flow::Continue
        }
    }
}
