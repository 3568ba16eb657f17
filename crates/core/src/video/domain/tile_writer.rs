use std::path::Path;

use crate::shared::tile::Tile;

/// Persists normalized tiles for offline inspection.
pub trait TileWriter: Send {
    /// Writes one tile; `sequence` numbers tiles in arrival order.
    fn write(&mut self, tile: &Tile, sequence: usize) -> Result<(), Box<dyn std::error::Error>>;

    /// Directory or sink description for log messages.
    fn destination(&self) -> &Path;
}
