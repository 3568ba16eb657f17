use std::path::{Path, PathBuf};

use crate::shared::tile::Tile;
use crate::video::domain::tile_writer::TileWriter;

/// Writes each tile as an 8-bit grayscale PNG named `tile_<sequence>.png`.
pub struct PngTileWriter {
    dir: PathBuf,
}

impl PngTileWriter {
    /// Creates the output directory if needed.
    pub fn new(dir: &Path) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, sequence: usize) -> PathBuf {
        self.dir.join(format!("tile_{sequence:06}.png"))
    }
}

impl TileWriter for PngTileWriter {
    fn write(&mut self, tile: &Tile, sequence: usize) -> Result<(), Box<dyn std::error::Error>> {
        let img = image::GrayImage::from_raw(tile.width(), tile.height(), tile.to_luma8())
            .ok_or("Failed to create image from tile data")?;
        img.save(self.path_for(sequence))?;
        Ok(())
    }

    fn destination(&self) -> &Path {
        &self.dir
    }
}
