use ndarray::Array5;

use crate::shared::tile::Tile;

/// Ordered buffer of the tiles collected for the next classification.
///
/// Holds at most `capacity` tiles, all of the configured size. The controller
/// clears it after every classification attempt and on start/stop.
#[derive(Debug)]
pub struct SequenceWindow {
    tiles: Vec<Tile>,
    capacity: usize,
    tile_width: u32,
    tile_height: u32,
}

impl SequenceWindow {
    pub fn new(capacity: usize, tile_width: u32, tile_height: u32) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        Self {
            tiles: Vec::with_capacity(capacity),
            capacity,
            tile_width,
            tile_height,
        }
    }

    /// Appends a tile and returns the new fill level.
    ///
    /// # Panics
    ///
    /// If the window is already full or the tile has the wrong size.
    pub fn push(&mut self, tile: Tile) -> usize {
        assert!(!self.is_full(), "sequence window overflow");
        assert_eq!(
            (tile.width(), tile.height()),
            (self.tile_width, self.tile_height),
            "tile size does not match the window"
        );
        self.tiles.push(tile);
        self.tiles.len()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.tiles.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Stacks the buffered tiles into a `(1, len, height, width, 1)` tensor.
    pub fn to_tensor(&self) -> Array5<f32> {
        let h = self.tile_height as usize;
        let w = self.tile_width as usize;
        let mut tensor = Array5::<f32>::zeros((1, self.tiles.len(), h, w, 1));
        for (t, tile) in self.tiles.iter().enumerate() {
            let view = tile.as_ndarray();
            tensor
                .slice_mut(ndarray::s![0, t, .., .., 0])
                .assign(&view);
        }
        tensor
    }
}
