/// Terrain elevation oracle and the per-cell elevation field
use crate::error::Diagnostic;
use crate::grid::{FloodGrid, GeodeticPoint};
use constants::tiling::ELEVATION_SENTINEL;

/// External terrain elevation oracle.
///
/// Results are positionally aligned with the request. A `None` entry, or a
/// response shorter than the request, marks those points as unsampled.
pub trait ElevationResolver {
    fn sample_elevation(&mut self, points: &[GeodeticPoint]) -> Vec<Option<f64>>;
}

/// Constant terrain height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatElevation(pub f64);

impl ElevationResolver for FlatElevation {
    fn sample_elevation(&mut self, points: &[GeodeticPoint]) -> Vec<Option<f64>> {
        vec![Some(self.0); points.len()]
    }
}

impl<F> ElevationResolver for F
where
    F: FnMut(GeodeticPoint) -> Option<f64>,
{
    fn sample_elevation(&mut self, points: &[GeodeticPoint]) -> Vec<Option<f64>> {
        points.iter().map(|p| self(*p)).collect()
    }
}

/// Terrain height per grid cell. Invalid and unsampled cells hold the sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationField {
    height: usize,
    width: usize,
    values: Vec<f64>,
    sampled: Vec<bool>,
}

impl ElevationField {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            values: vec![ELEVATION_SENTINEL; height * width],
            sampled: vec![false; height * width],
        }
    }

    /// Wrap precomputed row-major values, all treated as sampled.
    pub fn from_values(height: usize, width: usize, values: Vec<f64>) -> Option<Self> {
        (values.len() == height * width).then(|| Self {
            height,
            width,
            sampled: vec![true; values.len()],
            values,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize) -> f64 {
        self.values[y * self.width + x]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Cells holding a real sample rather than the sentinel.
    pub fn sampled(&self) -> &[bool] {
        &self.sampled
    }
}

/// Resumable population of an [`ElevationField`] from a resolver.
#[derive(Debug)]
pub struct ElevationSampler {
    field: ElevationField,
    cursor: usize,
    missing: Vec<Diagnostic>,
}

impl ElevationSampler {
    pub fn new(grid: &FloodGrid) -> Self {
        Self {
            field: ElevationField::new(grid.height(), grid.width()),
            cursor: 0,
            missing: Vec::new(),
        }
    }

    /// Cells visited so far, valid or not.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.field.values.len()
    }

    /// Query up to `batch` further valid cells in a single resolver call.
    /// Returns the diagnostics raised by this batch.
    pub fn advance<R: ElevationResolver + ?Sized>(
        &mut self,
        grid: &FloodGrid,
        resolver: &mut R,
        batch: usize,
    ) -> Vec<Diagnostic> {
        let total = grid.cell_count();
        let mut cells = Vec::with_capacity(batch.min(total - self.cursor));
        let mut points = Vec::with_capacity(cells.capacity());

        while self.cursor < total && cells.len() < batch {
            let i = self.cursor;
            self.cursor += 1;
            if !grid.validity()[i] {
                continue;
            }
            let (y, x) = (i / grid.width(), i % grid.width());
            cells.push(i);
            points.push(grid.geodetic(y, x));
        }

        if points.is_empty() {
            return Vec::new();
        }

        let samples = resolver.sample_elevation(&points);
        let mut raised = Vec::new();
        for (k, &i) in cells.iter().enumerate() {
            match samples.get(k).copied().flatten() {
                Some(h) if h.is_finite() => {
                    self.field.values[i] = h;
                    self.field.sampled[i] = true;
                }
                _ => {
                    let p = points[k];
                    let diagnostic = Diagnostic::MissingElevationSample {
                        y: i / grid.width(),
                        x: i % grid.width(),
                        lon: p.lon,
                        lat: p.lat,
                    };
                    log::warn!("{}", diagnostic);
                    raised.push(diagnostic);
                }
            }
        }

        self.missing.extend(raised.iter().cloned());
        raised
    }

    pub fn field(&self) -> &ElevationField {
        &self.field
    }

    /// All missing-sample diagnostics raised so far.
    pub fn missing(&self) -> &[Diagnostic] {
        &self.missing
    }

    pub fn into_field(self) -> ElevationField {
        self.field
    }
}

/// Populate a full field without yielding.
pub fn sample_field<R: ElevationResolver + ?Sized>(
    grid: &FloodGrid,
    resolver: &mut R,
    batch: usize,
) -> (ElevationField, Vec<Diagnostic>) {
    let mut sampler = ElevationSampler::new(grid);
    while !sampler.is_finished() {
        sampler.advance(grid, resolver, batch.max(1));
    }
    let missing = sampler.missing.clone();
    (sampler.into_field(), missing)
}
