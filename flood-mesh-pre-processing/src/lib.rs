/// Volumetric flood mesh generation from gridded water depth simulations
pub mod assembler;
pub mod colour;
pub mod config;
pub mod dds;
pub mod elevation;
pub mod error;
pub mod frame;
pub mod grid;
pub mod heightmap;
pub mod job;
pub mod loader;
pub mod manifest;
pub mod mesher;
pub mod range;
pub mod schedule;
pub mod source;
pub mod tiling;

pub use assembler::{MeshAssembler, MeshSink, SinkError};
pub use config::FloodMeshConfig;
pub use elevation::{ElevationField, ElevationResolver, FlatElevation};
pub use error::{Diagnostic, MeshError};
pub use frame::{EnuFrame, LocalFrameResolver};
pub use grid::{FloodGrid, GeodeticPoint};
pub use job::{JobReport, JobStatus, MeshingJob};
pub use mesher::{TileMesh, VolumetricTileMesher};
pub use range::ValueRange;
pub use schedule::{CancelToken, Flow, JobProgress, NoYield, Stage, YieldPoint};
pub use source::{GridSlot, ReloadGuard};
pub use tiling::{TileDescriptor, partition};
