/// R32F DDS raster IO for elevation fields
use crate::error::MeshError;
use ddsfile::{AlphaMode, D3D10ResourceDimension, Dds, DxgiFormat, NewDxgiParams};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Single channel f32 raster, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct R32fRaster {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

pub fn write_r32f_dds(
    path: &Path,
    width: usize,
    height: usize,
    data: &[f32],
) -> Result<(), MeshError> {
    if data.len() != width * height {
        return Err(MeshError::MalformedGrid(format!(
            "raster holds {} values, {}x{} needs {}",
            data.len(),
            width,
            height,
            width * height
        )));
    }

    let mut bytes = Vec::with_capacity(data.len() * 4);
    for &value in data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let params = NewDxgiParams {
        height: height as u32,
        width: width as u32,
        depth: None,
        format: DxgiFormat::R32_Float,
        mipmap_levels: Some(1),
        array_layers: Some(1),
        caps2: None,
        is_cubemap: false,
        resource_dimension: D3D10ResourceDimension::Texture2D,
        alpha_mode: AlphaMode::Unknown,
    };

    let mut dds = Dds::new_dxgi(params)?;
    dds.data = bytes;
    dds.write(&mut File::create(path)?)?;
    Ok(())
}

pub fn read_r32f_dds(path: &Path) -> Result<R32fRaster, MeshError> {
    let mut reader = BufReader::new(File::open(path)?);
    let dds = Dds::read(&mut reader)?;

    if dds.get_dxgi_format() != Some(DxgiFormat::R32_Float) {
        return Err(MeshError::MalformedGrid(format!(
            "{} is not an R32F texture",
            path.display()
        )));
    }

    let width = dds.get_width() as usize;
    let height = dds.get_height() as usize;
    let expected = width * height * 4;
    if dds.data.len() < expected {
        return Err(MeshError::MalformedGrid(format!(
            "{} holds {} bytes, {}x{} R32F needs {}",
            path.display(),
            dds.data.len(),
            width,
            height,
            expected
        )));
    }

    // Only the top mip level.
    let data = dds.data[..expected]
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok(R32fRaster {
        width,
        height,
        data,
    })
}
