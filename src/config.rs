//! Configuration for loading a cascaded field and tracing rays through it.

use crate::{
    consts::WORLD_SIZE,
    global_sdf::GlobalSdf,
    io,
    layout::{Cascade, CascadeLayout},
    trace::SdfTrace,
};
use anyhow::{Context, Result};
use nalgebra::{Point3, UnitVector3};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Describes a cascaded field whose textures are stored as raw files.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalSdfConfig {
    /// Number of texels along each axis of the precise textures.
    pub resolution: usize,
    /// Cascades ordered from finest to coarsest.
    pub cascades: Vec<CascadeConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CascadeConfig {
    pub center: [f32; 3],
    pub half_extent: f32,
    /// Defaults to the cascade side length divided by the resolution.
    #[serde(default)]
    pub voxel_size: Option<f32>,
    pub texture_path: PathBuf,
    pub flood_texture_path: PathBuf,
    /// Defaults to the resolution of the precise textures.
    #[serde(default)]
    pub flood_resolution: Option<usize>,
}

/// Parameters for the rays traced through a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    pub min_distance: f32,
    pub max_distance: f32,
    pub step_scale: f32,
    pub needs_hit_normal: bool,
}

impl GlobalSdfConfig {
    /// Reads the configuration from the given RON file.
    pub fn from_ron_file(file_path: impl AsRef<Path>) -> Result<Self> {
        io::parse_ron_file(file_path)
    }

    /// Creates the cascade layout described by the configuration.
    pub fn layout(&self) -> Result<CascadeLayout> {
        let resolution = self.resolution as f32;
        let cascades: Vec<_> = self
            .cascades
            .iter()
            .map(|cascade| {
                Cascade::new(
                    Point3::from(cascade.center),
                    cascade.half_extent,
                    cascade
                        .voxel_size
                        .unwrap_or(2.0 * cascade.half_extent / resolution),
                )
            })
            .collect();
        CascadeLayout::from_cascades(&cascades, resolution)
    }

    /// Loads the textures and creates the field described by the
    /// configuration. Relative texture paths are resolved against
    /// `root_dir`.
    pub fn load(&self, root_dir: impl AsRef<Path>) -> Result<GlobalSdf> {
        let root_dir = root_dir.as_ref();
        let layout = self.layout()?;

        let mut textures = Vec::with_capacity(self.cascades.len());
        let mut flood_textures = Vec::with_capacity(self.cascades.len());

        for (idx, cascade) in self.cascades.iter().enumerate() {
            textures.push(
                io::load_cascade_texture(root_dir.join(&cascade.texture_path), self.resolution)
                    .with_context(|| format!("Failed to load texture for cascade {idx}"))?,
            );
            flood_textures.push(
                io::load_cascade_texture(
                    root_dir.join(&cascade.flood_texture_path),
                    cascade.flood_resolution.unwrap_or(self.resolution),
                )
                .with_context(|| format!("Failed to load flood texture for cascade {idx}"))?,
            );
        }

        GlobalSdf::new(layout, textures, flood_textures)
    }

    /// Reads the configuration from the given RON file and loads the field it
    /// describes, resolving texture paths relative to the file.
    pub fn load_from_ron_file(file_path: impl AsRef<Path>) -> Result<GlobalSdf> {
        let file_path = file_path.as_ref();
        let config = Self::from_ron_file(file_path)?;
        config.load(file_path.parent().unwrap_or_else(|| Path::new(".")))
    }
}

impl Default for GlobalSdfConfig {
    fn default() -> Self {
        Self {
            resolution: 256,
            cascades: Vec::new(),
        }
    }
}

impl TraceConfig {
    /// Creates a trace with these parameters for the given ray.
    pub fn trace(&self, origin: Point3<f32>, direction: UnitVector3<f32>) -> SdfTrace {
        SdfTrace::new(
            origin,
            direction,
            self.min_distance,
            self.max_distance,
            self.needs_hit_normal,
        )
        .with_step_scale(self.step_scale)
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            min_distance: 0.0,
            max_distance: WORLD_SIZE,
            step_scale: 1.0,
            needs_hit_normal: false,
        }
    }
}
