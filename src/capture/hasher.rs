//! Change detection using xxhash
//!
//! Frames are cut into square tiles and each tile row-slice is hashed; two
//! frames differ in a tile when the tile hashes differ.

use crate::geometry::Rectangle;
use xxhash_rust::xxh64::xxh64;

/// Hasher configuration
#[derive(Debug, Clone)]
pub struct HasherConfig {
    /// Hash seed
    pub seed: u64,

    /// Tile edge in pixels
    pub tile_size: u32,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EC0_4D1F_0000_0001,
            tile_size: 64,
        }
    }
}

/// Per-tile hashes of one frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileHashes {
    pub columns: u32,
    pub rows: u32,
    pub hashes: Vec<u64>,
}

/// xxhash-based hasher for change detection
#[derive(Debug, Clone, Default)]
pub struct Hasher {
    config: HasherConfig,
}

impl Hasher {
    pub fn new(config: HasherConfig) -> Self {
        Self { config }
    }

    pub fn tile_size(&self) -> u32 {
        self.config.tile_size.max(1)
    }

    /// Hash a slice of data
    pub fn hash(&self, data: &[u8]) -> u64 {
        xxh64(data, self.config.seed)
    }

    /// True when the buffers differ in length or content
    pub fn has_changed(&self, a: &[u8], b: &[u8]) -> bool {
        a.len() != b.len() || self.hash(a) != self.hash(b)
    }

    /// Hash every tile of a `width` x `height` buffer with `bytes_per_pixel`
    pub fn hash_tiles(&self, data: &[u8], width: u32, height: u32, bytes_per_pixel: usize) -> TileHashes {
        let tile = self.tile_size();
        let columns = width.div_ceil(tile);
        let rows = height.div_ceil(tile);
        let stride = width as usize * bytes_per_pixel;
        let mut hashes = Vec::with_capacity((columns * rows) as usize);

        for row in 0..rows {
            for col in 0..columns {
                let x0 = (col * tile) as usize;
                let x1 = ((col + 1) * tile).min(width) as usize;
                let y0 = row * tile;
                let y1 = ((row + 1) * tile).min(height);

                let mut seed = self.config.seed;
                for y in y0..y1 {
                    let start = y as usize * stride + x0 * bytes_per_pixel;
                    let end = y as usize * stride + x1 * bytes_per_pixel;
                    match data.get(start..end) {
                        Some(slice) => seed = xxh64(slice, seed),
                        None => {
                            seed = 0;
                            break;
                        }
                    }
                }
                hashes.push(seed);
            }
        }

        TileHashes { columns, rows, hashes }
    }

    /// Tiles whose hashes differ, in frame-local pixel coordinates.
    ///
    /// Mismatched grids count as a full-frame change.
    pub fn changed_tiles(&self, previous: &TileHashes, current: &TileHashes, width: u32, height: u32) -> Vec<Rectangle> {
        if previous.columns != current.columns || previous.rows != current.rows {
            return vec![Rectangle::new(0, 0, width as i32, height as i32)];
        }

        let tile = self.tile_size();
        current
            .hashes
            .iter()
            .zip(previous.hashes.iter())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(index, _)| {
                let col = index as u32 % current.columns;
                let row = index as u32 / current.columns;
                let x = col * tile;
                let y = row * tile;
                Rectangle::new(
                    x as i32,
                    y as i32,
                    (tile.min(width - x)) as i32,
                    (tile.min(height - y)) as i32,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash() {
        let hasher = Hasher::default();
        assert_eq!(hasher.hash(b"frame"), hasher.hash(b"frame"));
        assert_ne!(hasher.hash(b"frame"), hasher.hash(b"frame!"));
    }

    #[test]
    fn test_has_changed() {
        let hasher = Hasher::default();
        assert!(!hasher.has_changed(b"same", b"same"));
        assert!(hasher.has_changed(b"same", b"diff"));
        assert!(hasher.has_changed(b"same", b"longer"));
    }

    #[test]
    fn single_pixel_change_marks_one_tile() {
        let hasher = Hasher::new(HasherConfig {
            tile_size: 4,
            ..HasherConfig::default()
        });
        let (width, height) = (8u32, 6u32);
        let before = vec![0u8; (width * height * 4) as usize];
        let mut after = before.clone();
        // pixel (5, 1) lives in tile column 1, row 0
        after[(1 * width as usize + 5) * 4] = 0xFF;

        let a = hasher.hash_tiles(&before, width, height, 4);
        let b = hasher.hash_tiles(&after, width, height, 4);
        assert_eq!((a.columns, a.rows), (2, 2));

        let changed = hasher.changed_tiles(&a, &b, width, height);
        assert_eq!(changed, vec![Rectangle::new(4, 0, 4, 4)]);
    }

    #[test]
    fn edge_tiles_are_clipped() {
        let hasher = Hasher::new(HasherConfig {
            tile_size: 4,
            ..HasherConfig::default()
        });
        let a = TileHashes { columns: 2, rows: 2, hashes: vec![0, 0, 0, 0] };
        let b = TileHashes { columns: 2, rows: 2, hashes: vec![0, 0, 0, 1] };
        assert_eq!(hasher.changed_tiles(&a, &b, 6, 6), vec![Rectangle::new(4, 4, 2, 2)]);
    }
}
