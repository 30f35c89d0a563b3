/// Late-arriving grid publication and reload detection
use crate::grid::FloodGrid;
use crate::schedule::{Flow, JobProgress, YieldPoint};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct SlotState {
    grid: Option<Arc<FloodGrid>>,
    generation: u64,
    waiters: Vec<Sender<Arc<FloodGrid>>>,
}

/// Holds the most recently loaded grid.
///
/// The loader publishes into the slot whenever a dataset finishes loading;
/// consumers either read the current grid or subscribe to the next one.
/// Every publication bumps the generation so running jobs can tell their
/// input has been replaced.
#[derive(Clone, Default)]
pub struct GridSlot {
    state: Arc<Mutex<SlotState>>,
}

impl GridSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // A panicking publisher cannot leave the state half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the current grid and wake every subscriber.
    pub fn publish(&self, grid: FloodGrid) -> Arc<FloodGrid> {
        let grid = Arc::new(grid);
        let mut state = self.lock();
        state.generation += 1;
        state.grid = Some(Arc::clone(&grid));
        for waiter in state.waiters.drain(..) {
            let _ = waiter.send(Arc::clone(&grid));
        }
        log::info!(
            "Published {}x{} grid (generation {})",
            grid.height(),
            grid.width(),
            state.generation
        );
        grid
    }

    pub fn current(&self) -> Option<Arc<FloodGrid>> {
        self.lock().grid.clone()
    }

    /// Number of publications so far.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Receive the next published grid. Resolves immediately when a grid is
    /// already present.
    pub fn subscribe(&self) -> Receiver<Arc<FloodGrid>> {
        let (tx, rx) = mpsc::channel();
        let mut state = self.lock();
        match &state.grid {
            Some(grid) => {
                let _ = tx.send(Arc::clone(grid));
            }
            None => state.waiters.push(tx),
        }
        rx
    }

    /// Yield point that abandons once a newer grid is published.
    pub fn guard(&self) -> ReloadGuard {
        ReloadGuard {
            slot: self.clone(),
            generation: self.generation(),
        }
    }
}

/// Abandons a running job when its grid is superseded.
#[derive(Clone)]
pub struct ReloadGuard {
    slot: GridSlot,
    generation: u64,
}

impl ReloadGuard {
    pub fn is_stale(&self) -> bool {
        self.slot.generation() != self.generation
    }
}

impl YieldPoint for ReloadGuard {
    fn yield_now(&mut self, progress: &JobProgress) -> Flow {
        if self.is_stale() {
            log::info!(
                "Grid reloaded during {} ({}/{}), abandoning",
                progress.stage.label(),
                progress.done,
                progress.total
            );
            Flow::Abandon
        } else {
            Flow::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GeodeticPoint;
    use crate::schedule::Stage;
    use std::thread;

    fn grid(depth: f64) -> FloodGrid {
        FloodGrid::from_geodetic(
            1,
            2,
            vec![GeodeticPoint::new(0.0, 0.0), GeodeticPoint::new(1.0, 0.0)],
            vec![depth; 2],
            vec![true; 2],
        )
        .unwrap()
    }

    #[test]
    fn test_subscriber_receives_later_publication() {
        let slot = GridSlot::new();
        let rx = slot.subscribe();
        assert!(slot.current().is_none());

        let publisher = slot.clone();
        let handle = thread::spawn(move || {
            publisher.publish(grid(1.5));
        });

        let received = rx.recv().unwrap();
        handle.join().unwrap();
        assert_eq!(received.water_depth(0, 1), 1.5);
        assert_eq!(slot.generation(), 1);
    }

    #[test]
    fn test_subscribe_after_publish_resolves_immediately() {
        let slot = GridSlot::new();
        slot.publish(grid(2.0));
        let received = slot.subscribe().try_recv().unwrap();
        assert_eq!(received.water_depth(0, 0), 2.0);
    }

    #[test]
    fn test_guard_abandons_after_republish() {
        let slot = GridSlot::new();
        slot.publish(grid(1.0));
        let mut guard = slot.guard();
        let progress = JobProgress {
            stage: Stage::BuildingTiles,
            done: 0,
            total: 1,
        };

        assert_eq!(guard.yield_now(&progress), Flow::Continue);
        slot.publish(grid(3.0));
        assert!(guard.is_stale());
        assert_eq!(guard.yield_now(&progress), Flow::Abandon);
        assert_eq!(slot.current().unwrap().water_depth(0, 0), 3.0);
    }
}
