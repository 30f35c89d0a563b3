/// Resumable meshing pipeline orchestrating sampling, range reduction and tile generation.
use crate::assembler::{MeshAssembler, MeshSink};
use crate::config::FloodMeshConfig;
use crate::elevation::{ElevationField, ElevationResolver, ElevationSampler};
use crate::error::{Diagnostic, MeshError, RangeQuantity};
use crate::frame::LocalFrameResolver;
use crate::grid::FloodGrid;
use crate::mesher::{TileMesh, VolumetricTileMesher};
use crate::range::{RangeScan, ValueRange};
use crate::schedule::{Flow, JobProgress, Stage, YieldPoint};
use crate::tiling::{TileDescriptor, partition};
use indicatif::{ProgressBar, ProgressStyle};

/// Outcome of a completed pass.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    /// Global depth range, `None` when the grid holds no valid cell
    pub depth_range: Option<ValueRange>,
    /// Range over sampled valid cells
    pub elevation_range: Option<ValueRange>,
    pub tiles_assembled: usize,
    pub tiles_empty: usize,
    /// Tiles the sink refused, each also listed in `diagnostics`
    pub tiles_rejected: usize,
    /// Every recoverable diagnostic, in the order raised
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of one [`MeshingJob::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    Pending(JobProgress),
    Complete(JobReport),
}

enum JobState {
    Sampling,
    ReducingElevation(RangeScan),
    ReducingDepth(RangeScan),
    Building { next_tile: usize },
    Complete,
    Abandoned,
}

/// One pass over a grid: elevation sampling, range reduction, then tile
/// generation, each split into bounded chunks.
///
/// Each call to [`step`](Self::step) performs one chunk. The job holds all
/// intermediate state, so dropping it abandons the pass.
pub struct MeshingJob<'g, R, F> {
    grid: &'g FloodGrid,
    resolver: R,
    frame: F,
    config: FloodMeshConfig,
    tiles: Vec<TileDescriptor>,
    state: JobState,
    sampler: ElevationSampler,
    elevation_range: Option<ValueRange>,
    depth_range: Option<ValueRange>,
    assembler: MeshAssembler,
    diagnostics: Vec<Diagnostic>,
}

impl<'g, R: ElevationResolver, F: LocalFrameResolver> MeshingJob<'g, R, F> {
    /// Validate configuration and partition the grid. Fails before any
    /// work is done when the configuration or tiling is unusable.
    pub fn new(
        grid: &'g FloodGrid,
        resolver: R,
        frame: F,
        config: FloodMeshConfig,
    ) -> Result<Self, MeshError> {
        config.validate()?;
        let tiles = partition(grid.height(), grid.width(), config.tiles_per_side)?;
        log::info!(
            "Meshing {}x{} grid ({} valid cells) into {} tiles",
            grid.height(),
            grid.width(),
            grid.valid_count(),
            tiles.len()
        );

        Ok(Self {
            grid,
            resolver,
            frame,
            config,
            tiles,
            state: JobState::Sampling,
            sampler: ElevationSampler::new(grid),
            elevation_range: None,
            depth_range: None,
            assembler: MeshAssembler::new(),
            diagnostics: Vec::new(),
        })
    }

    pub fn tiles(&self) -> &[TileDescriptor] {
        &self.tiles
    }

    pub fn config(&self) -> &FloodMeshConfig {
        &self.config
    }

    pub fn frame(&self) -> &F {
        &self.frame
    }

    /// Elevation field as populated so far. Complete once sampling ends.
    pub fn elevation(&self) -> &ElevationField {
        self.sampler.field()
    }

    pub fn stage(&self) -> Stage {
        match self.state {
            JobState::Sampling => Stage::SamplingElevation,
            JobState::ReducingElevation(_) => Stage::ReducingElevation,
            JobState::ReducingDepth(_) => Stage::ReducingDepth,
            JobState::Building { .. } => Stage::BuildingTiles,
            JobState::Complete | JobState::Abandoned => Stage::Complete,
        }
    }

    pub fn progress(&self) -> JobProgress {
        let cells = self.grid.cell_count();
        let (done, total) = match &self.state {
            JobState::Sampling => (self.sampler.position(), cells),
            JobState::ReducingElevation(scan) | JobState::ReducingDepth(scan) => {
                (scan.position(), cells)
            }
            JobState::Building { next_tile } => (*next_tile, self.tiles.len()),
            JobState::Complete | JobState::Abandoned => (self.tiles.len(), self.tiles.len()),
        };
        JobProgress {
            stage: self.stage(),
            done,
            total,
        }
    }

    pub fn report(&self) -> JobReport {
        JobReport {
            depth_range: self.depth_range,
            elevation_range: self.elevation_range,
            tiles_assembled: self.assembler.assembled(),
            tiles_empty: self.assembler.empty(),
            tiles_rejected: self.assembler.rejected(),
            diagnostics: self.diagnostics.clone(),
        }
    }

    /// Stop the pass. Later steps fail with [`MeshError::Abandoned`].
    pub fn abandon(&mut self) {
        self.state = JobState::Abandoned;
    }

    /// Perform one bounded chunk of work.
    pub fn step<S: MeshSink + ?Sized>(&mut self, sink: &mut S) -> Result<JobStatus, MeshError> {
        let next = match &mut self.state {
            JobState::Sampling => {
                let raised =
                    self.sampler
                        .advance(self.grid, &mut self.resolver, self.config.elevation_batch);
                self.diagnostics.extend(raised);
                if self.sampler.is_finished() {
                    log::info!(
                        "Elevation sampled, {} cells missing",
                        self.sampler.missing().len()
                    );
                    Some(JobState::ReducingElevation(RangeScan::new(
                        RangeQuantity::Elevation,
                    )))
                } else {
                    None
                }
            }
            JobState::ReducingElevation(scan) => {
                let field = self.sampler.field();
                match scan.advance(field.values(), field.sampled(), self.config.range_batch) {
                    Some(result) => {
                        self.elevation_range = settle(result, &mut self.diagnostics);
                        Some(JobState::ReducingDepth(RangeScan::new(RangeQuantity::WaterDepth)))
                    }
                    None => None,
                }
            }
            JobState::ReducingDepth(scan) => {
                match scan.advance(
                    self.grid.water_depths(),
                    self.grid.validity(),
                    self.config.range_batch,
                ) {
                    Some(result) => {
                        self.depth_range = settle(result, &mut self.diagnostics);
                        Some(JobState::Building { next_tile: 0 })
                    }
                    None => None,
                }
            }
            JobState::Building { next_tile } => {
                let end = (*next_tile + self.config.tile_batch).min(self.tiles.len());
                let mesher = VolumetricTileMesher::new(
                    self.grid,
                    self.sampler.field(),
                    self.depth_range,
                    &self.config.palette,
                    self.config.bottom_offset,
                    &self.frame,
                );

                for tile in &self.tiles[*next_tile..end] {
                    let mesh = build_or_empty(&mesher, tile, &mut self.diagnostics);
                    if let Some(diagnostic) = self.assembler.submit(sink, mesh)? {
                        log::warn!("{}", diagnostic);
                        self.diagnostics.push(diagnostic);
                    }
                    *next_tile += 1;
                }

                (*next_tile >= self.tiles.len()).then_some(JobState::Complete)
            }
            JobState::Complete => return Ok(JobStatus::Complete(self.report())),
            JobState::Abandoned => return Err(MeshError::Abandoned),
        };

        if let Some(state) = next {
            self.state = state;
            log::info!("{}", self.stage().label());
        }

        match self.state {
            JobState::Complete => {
                log::info!(
                    "Meshing complete: {} tiles assembled, {} empty, {} rejected, {} diagnostics",
                    self.assembler.assembled(),
                    self.assembler.empty(),
                    self.assembler.rejected(),
                    self.diagnostics.len()
                );
                Ok(JobStatus::Complete(self.report()))
            }
            _ => Ok(JobStatus::Pending(self.progress())),
        }
    }

    /// Drive the job to completion, consulting `yielder` after every chunk.
    pub fn run<S, Y>(&mut self, sink: &mut S, yielder: &mut Y) -> Result<JobReport, MeshError>
    where
        S: MeshSink + ?Sized,
        Y: YieldPoint + ?Sized,
    {
        let mut bars = StageBars::new(self.config.show_progress);
        loop {
            match self.step(sink)? {
                JobStatus::Complete(report) => {
                    bars.finish();
                    return Ok(report);
                }
                JobStatus::Pending(progress) => {
                    bars.update(&progress);
                    if yielder.yield_now(&progress) == Flow::Abandon {
                        bars.abandon();
                        log::warn!(
                            "Meshing abandoned during {} ({}/{})",
                            progress.stage.label(),
                            progress.done,
                            progress.total
                        );
                        self.abandon();
                        return Err(MeshError::Abandoned);
                    }
                }
            }
        }
    }
}

/// Build one tile, substituting an empty mesh when the mesher reports why
/// it cannot.
fn build_or_empty<F: LocalFrameResolver + ?Sized>(
    mesher: &VolumetricTileMesher<'_, F>,
    tile: &TileDescriptor,
    diagnostics: &mut Vec<Diagnostic>,
) -> TileMesh {
    mesher.build(tile).unwrap_or_else(|diagnostic| {
        log::warn!("{}", diagnostic);
        diagnostics.push(diagnostic);
        TileMesh::empty(*tile)
    })
}

/// Record an empty range as a diagnostic and carry on without it.
fn settle(
    result: Result<ValueRange, Diagnostic>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ValueRange> {
    match result {
        Ok(range) => {
            log::info!("Range [{:.3}, {:.3}]", range.min, range.max);
            Some(range)
        }
        Err(diagnostic) => {
            log::warn!("{}", diagnostic);
            diagnostics.push(diagnostic);
            None
        }
    }
}

/// One progress bar per stage, replaced on every stage transition.
struct StageBars {
    enabled: bool,
    current: Option<(Stage, ProgressBar)>,
}

impl StageBars {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            current: None,
        }
    }

    fn style(stage: Stage) -> ProgressStyle {
        let template = match stage {
            Stage::BuildingTiles => "[{bar:40.green/blue}] {pos}/{len} tiles ({percent}%) {msg}",
            _ => "[{bar:40.cyan/blue}] {pos}/{len} cells ({percent}%) {msg}",
        };
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("▉▊▋▌▍▎▏ ")
    }

    fn update(&mut self, progress: &JobProgress) {
        if !self.enabled {
            return;
        }
        let stale = !matches!(&self.current, Some((stage, _)) if *stage == progress.stage);
        if stale {
            self.finish();
            let pb = ProgressBar::new(progress.total as u64);
            pb.set_style(Self::style(progress.stage));
            pb.set_message(progress.stage.label());
            self.current = Some((progress.stage, pb));
        }
        if let Some((_, pb)) = &self.current {
            pb.set_position(progress.done as u64);
        }
    }

    fn finish(&mut self) {
        if let Some((stage, pb)) = self.current.take() {
            pb.set_position(pb.length().unwrap_or(0));
            pb.finish_with_message(format!("{} done", stage.label()));
        }
    }

    fn abandon(&mut self) {
        if let Some((_, pb)) = self.current.take() {
            pb.abandon_with_message("Abandoned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::SinkError;
    use crate::colour::WaterPalette;
    use crate::elevation::FlatElevation;
    use crate::frame::EnuFrame;
    use crate::grid::GeodeticPoint;
    use crate::schedule::{CancelToken, NoYield};

    fn grid(height: usize, width: usize, valid: Vec<bool>) -> FloodGrid {
        let geodetic = (0..height * width)
            .map(|i| {
                GeodeticPoint::new(
                    -87.6 + (i % width) as f64 * 1e-5,
                    41.8 - (i / width) as f64 * 1e-5,
                )
            })
            .collect();
        let depth = (0..height * width).map(|i| 0.25 * (i % 5) as f64).collect();
        FloodGrid::from_geodetic(height, width, geodetic, depth, valid).unwrap()
    }

    fn config(tiles_per_side: usize) -> FloodMeshConfig {
        FloodMeshConfig {
            tiles_per_side,
            elevation_batch: 7,
            range_batch: 9,
            tile_batch: 3,
            ..FloodMeshConfig::default()
        }
    }

    #[test]
    fn test_stages_run_in_order() {
        let grid = grid(8, 8, vec![true; 64]);
        let mut job = MeshingJob::new(
            &grid,
            FlatElevation(2.0),
            EnuFrame::new(-87.6, 41.8, 0.0),
            config(4),
        )
        .unwrap();

        let mut sink = Vec::new();
        let mut stages = vec![job.stage()];
        let report = loop {
            match job.step(&mut sink).unwrap() {
                JobStatus::Pending(progress) => {
                    assert!(progress.done <= progress.total);
                    if stages.last() != Some(&progress.stage) {
                        stages.push(progress.stage);
                    }
                }
                JobStatus::Complete(report) => break report,
            }
        };

        assert_eq!(
            stages,
            vec![
                Stage::SamplingElevation,
                Stage::ReducingElevation,
                Stage::ReducingDepth,
                Stage::BuildingTiles
            ]
        );
        assert_eq!(sink.len(), 16);
        assert_eq!(report.tiles_assembled, 16);
        assert_eq!(report.elevation_range, Some(ValueRange { min: 2.0, max: 2.0 }));
        assert_eq!(report.depth_range, Some(ValueRange { min: 0.0, max: 1.0 }));
        assert!(report.diagnostics.is_empty());
        assert!(matches!(job.step(&mut sink), Ok(JobStatus::Complete(_))));
    }

    #[test]
    fn test_excess_tiles_fail_before_work() {
        let grid = grid(3, 3, vec![true; 9]);
        let result = MeshingJob::new(
            &grid,
            FlatElevation(0.0),
            EnuFrame::new(-87.6, 41.8, 0.0),
            config(4),
        );
        assert!(matches!(result, Err(MeshError::InvalidTiling { .. })));
    }

    #[test]
    fn test_cancel_stops_at_next_yield() {
        let grid = grid(8, 8, vec![true; 64]);
        let mut job = MeshingJob::new(
            &grid,
            FlatElevation(0.0),
            EnuFrame::new(-87.6, 41.8, 0.0),
            config(4),
        )
        .unwrap();

        let token = CancelToken::new();
        let mut watcher = token.clone();
        let mut sink = Vec::new();
        let mut yielder = |p: &JobProgress| {
            if p.stage == Stage::BuildingTiles && p.done > 0 {
                token.cancel();
            }
            watcher.yield_now(p)
        };

        let result = job.run(&mut sink, &mut yielder);
        assert!(matches!(result, Err(MeshError::Abandoned)));
        // One tile batch landed before the yield point saw the cancel.
        assert_eq!(sink.len(), 3);
        assert!(matches!(job.step(&mut sink), Err(MeshError::Abandoned)));
    }

    #[test]
    fn test_missing_elevation_is_reported_not_fatal() {
        let grid = grid(4, 4, vec![true; 16]);
        let resolver = |p: GeodeticPoint| (p.lon > -87.6).then_some(1.0);
        let mut job = MeshingJob::new(
            &grid,
            resolver,
            EnuFrame::new(-87.6, 41.8, 0.0),
            config(1),
        )
        .unwrap();

        let mut sink = Vec::new();
        let report = job.run(&mut sink, &mut NoYield).unwrap();
        let missing = report
            .diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::MissingElevationSample { x: 0, .. }))
            .count();
        assert_eq!(missing, 4);
        assert_eq!(report.elevation_range, Some(ValueRange { min: 1.0, max: 1.0 }));
        assert_eq!(report.tiles_assembled, 1);
    }

    /// Refuses one tile and keeps the rest.
    struct RefuseOne {
        tile: (usize, usize),
        kept: Vec<TileMesh>,
    }

    impl MeshSink for RefuseOne {
        fn accept(&mut self, mesh: TileMesh) -> Result<(), SinkError> {
            if (mesh.tile.py, mesh.tile.px) == self.tile {
                return Err(SinkError::Rejected("write failed".into()));
            }
            self.kept.push(mesh);
            Ok(())
        }
    }

    #[test]
    fn test_rejected_tile_does_not_stop_its_siblings() {
        let grid = grid(8, 8, vec![true; 64]);
        let mut job = MeshingJob::new(
            &grid,
            FlatElevation(0.0),
            EnuFrame::new(-87.6, 41.8, 0.0),
            config(2),
        )
        .unwrap();

        let mut sink = RefuseOne {
            tile: (0, 1),
            kept: Vec::new(),
        };
        let report = job.run(&mut sink, &mut NoYield).unwrap();

        let kept: Vec<_> = sink.kept.iter().map(|m| (m.tile.py, m.tile.px)).collect();
        assert_eq!(kept, vec![(0, 0), (1, 0), (1, 1)]);
        assert_eq!(report.tiles_assembled, 3);
        assert_eq!(report.tiles_rejected, 1);
        assert_eq!(
            report.diagnostics,
            vec![Diagnostic::TileRejected {
                py: 0,
                px: 1,
                reason: "write failed".into()
            }]
        );
    }

    #[test]
    fn test_unanchored_tile_is_built_empty_and_reported() {
        let grid = grid(4, 4, vec![true; 16]);
        let elevation = ElevationField::from_values(4, 4, vec![0.0; 16]).unwrap();
        let palette = WaterPalette::default();
        let frame = EnuFrame::new(-87.6, 41.8, 0.0);
        let mesher = VolumetricTileMesher::new(&grid, &elevation, None, &palette, 0.1, &frame);

        let mut tile = partition(4, 4, 2).unwrap()[3];
        tile.center_y = 4;
        let mut diagnostics = Vec::new();
        let mesh = build_or_empty(&mesher, &tile, &mut diagnostics);

        assert!(mesh.is_empty());
        assert_eq!(mesh.tile, tile);
        assert_eq!(
            diagnostics,
            vec![Diagnostic::OutOfBoundsTileAnchor {
                py: 1,
                px: 1,
                center_y: 4,
                center_x: 3
            }]
        );
    }
}
