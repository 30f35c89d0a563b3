/// Hand-off of finished tiles to the presentation layer
use crate::error::{Diagnostic, MeshError};
use crate::mesher::TileMesh;
use std::sync::mpsc::Sender;

/// Why a sink refused a tile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// This tile was lost. Later tiles can still be delivered.
    #[error("{0}")]
    Rejected(String),
    /// Nothing further can be delivered.
    #[error("{0}")]
    Closed(String),
}

/// Receives each tile once it is fully assembled.
pub trait MeshSink {
    fn accept(&mut self, mesh: TileMesh) -> Result<(), SinkError>;
}

impl MeshSink for Vec<TileMesh> {
    fn accept(&mut self, mesh: TileMesh) -> Result<(), SinkError> {
        self.push(mesh);
        Ok(())
    }
}

/// Surfaces tiles to another thread as they complete.
impl MeshSink for Sender<TileMesh> {
    fn accept(&mut self, mesh: TileMesh) -> Result<(), SinkError> {
        self.send(mesh)
            .map_err(|_| SinkError::Closed("receiver dropped".into()))
    }
}

impl<S: MeshSink + ?Sized> MeshSink for &mut S {
    fn accept(&mut self, mesh: TileMesh) -> Result<(), SinkError> {
        (**self).accept(mesh)
    }
}

/// Forwards tiles to a sink without waiting for the rest of the pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MeshAssembler {
    assembled: usize,
    empty: usize,
    rejected: usize,
}

impl MeshAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand `mesh` to `sink`. A rejected tile comes back as a diagnostic,
    /// a closed sink as [`MeshError::Sink`].
    pub fn submit<S: MeshSink + ?Sized>(
        &mut self,
        sink: &mut S,
        mesh: TileMesh,
    ) -> Result<Option<Diagnostic>, MeshError> {
        let (py, px) = (mesh.tile.py, mesh.tile.px);
        let empty = mesh.is_empty();
        match sink.accept(mesh) {
            Ok(()) => {
                if empty {
                    self.empty += 1;
                } else {
                    self.assembled += 1;
                }
                Ok(None)
            }
            Err(SinkError::Rejected(reason)) => {
                self.rejected += 1;
                Ok(Some(Diagnostic::TileRejected { py, px, reason }))
            }
            Err(SinkError::Closed(reason)) => Err(MeshError::Sink { py, px, reason }),
        }
    }

    /// Tiles with geometry handed over so far.
    pub fn assembled(&self) -> usize {
        self.assembled
    }

    /// Empty tiles handed over so far.
    pub fn empty(&self) -> usize {
        self.empty
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }
}
