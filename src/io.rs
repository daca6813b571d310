//! Reading and writing configuration and texture files.

use crate::texture::CascadeTexture;
use anyhow::{Context, Result};
use std::{
    fs::{self, File},
    io::{BufReader, Read, Write},
    path::Path,
};

/// Reads and returns the content of the specified text file.
pub fn read_text_file(file_path: impl AsRef<Path>) -> std::io::Result<String> {
    let file = File::open(file_path)?;
    let mut text = String::new();
    let _ = BufReader::new(file).read_to_string(&mut text)?;
    Ok(text)
}

/// Reads the RON (Rusty Object Notation) file at the given path and
/// deserializes the contents into an object of type `T`.
pub fn parse_ron_file<T>(file_path: impl AsRef<Path>) -> Result<T>
where
    T: for<'de> serde::de::Deserialize<'de>,
{
    let file_path = file_path.as_ref();

    let text = read_text_file(file_path)
        .with_context(|| format!("Could not open {}", file_path.display()))?;

    ron::from_str::<T>(&text)
        .map_err(anyhow::Error::from)
        .with_context(|| format!("Invalid syntax in {}", file_path.display()))
}

/// Serializes the given value to RON and writes it to the given path,
/// creating any missing parent directories.
pub fn write_ron_file<T>(value: &T, output_file_path: impl AsRef<Path>) -> Result<()>
where
    T: serde::ser::Serialize,
{
    let text = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())?;
    let mut file = create_file_and_required_directories(output_file_path)?;
    write!(&mut file, "{text}")?;
    Ok(())
}

/// Loads a cascade texture with the given resolution from a file of raw
/// little-endian `f32` texel values.
pub fn load_cascade_texture(
    file_path: impl AsRef<Path>,
    resolution: usize,
) -> Result<CascadeTexture> {
    let file_path = file_path.as_ref();
    log_elapsed!(log::Level::Info, "Loaded cascade texture from {}", file_path.display(); {
        let bytes = fs::read(file_path)
            .with_context(|| format!("Could not read {}", file_path.display()))?;
        CascadeTexture::from_le_bytes(resolution, &bytes)
            .with_context(|| format!("Invalid texture data in {}", file_path.display()))
    })
}

/// Saves the given cascade texture as raw little-endian `f32` texel values.
pub fn save_cascade_texture(
    texture: &CascadeTexture,
    output_file_path: impl AsRef<Path>,
) -> Result<()> {
    let mut file = create_file_and_required_directories(output_file_path)?;
    file.write_all(&texture.to_le_bytes())?;
    Ok(())
}

fn create_file_and_required_directories(file_path: impl AsRef<Path>) -> std::io::Result<File> {
    let file_path = file_path.as_ref();
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(file_path)
}
