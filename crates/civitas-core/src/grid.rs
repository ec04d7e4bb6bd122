//! Hex grid geometry: adjacency, distance, and pixel conversion.
//!
//! Tiles are pointy-top hexes addressed with odd-r offset coordinates
//! (`TileXy`). The grid is pure geometry -- it holds no simulation state and
//! every operation is a function of its fixed width and height. Out-of-bounds
//! queries return empty/`None` sentinels rather than errors.

use crate::fixed::Fixed64;
use serde::{Deserialize, Serialize};

/// Pixel edge length used for grid/pixel conversion. Rendering may scale
/// freely; the simulation only needs the conversion to be exact and
/// reversible on tile centers.
pub const TILE_SIZE: i64 = 64;

/// Neighbor offsets for even rows (odd-r layout).
const EVEN_ROW_NEIGHBORS: [(i32, i32); 6] =
    [(1, 0), (-1, 0), (0, -1), (-1, -1), (0, 1), (-1, 1)];

/// Neighbor offsets for odd rows (odd-r layout).
const ODD_ROW_NEIGHBORS: [(i32, i32); 6] =
    [(1, 0), (-1, 0), (1, -1), (0, -1), (1, 1), (0, 1)];

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// An odd-r offset hex coordinate. `Ord` so tile maps iterate
/// deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TileXy {
    pub x: i32,
    pub y: i32,
}

impl TileXy {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cube-coordinate conversion for distance math.
    fn to_cube(self) -> (i64, i64, i64) {
        let q = self.x as i64 - (self.y as i64 - self.y.rem_euclid(2) as i64) / 2;
        let r = self.y as i64;
        (q, -q - r, r)
    }
}

impl std::fmt::Display for TileXy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// A pixel position. Fixed-point so cached shipment endpoints stay
/// deterministic across platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: Fixed64,
    pub y: Fixed64,
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// A fixed-topology hex grid of `width` columns by `height` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexGrid {
    width: u32,
    height: u32,
}

impl HexGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the coordinate lies inside the grid.
    pub fn contains(&self, xy: TileXy) -> bool {
        xy.x >= 0 && xy.y >= 0 && (xy.x as u32) < self.width && (xy.y as u32) < self.height
    }

    /// Whether the coordinate lies on the outer ring of the grid.
    pub fn is_edge(&self, xy: TileXy) -> bool {
        self.contains(xy)
            && (xy.x == 0
                || xy.y == 0
                || xy.x as u32 == self.width - 1
                || xy.y as u32 == self.height - 1)
    }

    /// The center tile, where the headquarter is placed at world generation.
    pub fn center(&self) -> TileXy {
        TileXy::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// In-bounds neighbors of a tile (at most 6). Out-of-bounds input yields
    /// an empty set.
    pub fn neighbors(&self, xy: TileXy) -> Vec<TileXy> {
        if !self.contains(xy) {
            return Vec::new();
        }
        let offsets = if xy.y.rem_euclid(2) == 0 {
            &EVEN_ROW_NEIGHBORS
        } else {
            &ODD_ROW_NEIGHBORS
        };
        offsets
            .iter()
            .map(|&(dx, dy)| TileXy::new(xy.x + dx, xy.y + dy))
            .filter(|&n| self.contains(n))
            .collect()
    }

    /// Hex distance between two tiles, in tiles.
    pub fn distance(&self, a: TileXy, b: TileXy) -> u32 {
        let (ax, ay, az) = a.to_cube();
        let (bx, by, bz) = b.to_cube();
        (((ax - bx).abs() + (ay - by).abs() + (az - bz).abs()) / 2) as u32
    }

    /// Pixel center of a tile. Exact rational arithmetic: odd rows shift
    /// right by half a tile, rows stack at 3/4 tile spacing.
    pub fn grid_to_position(&self, xy: TileXy) -> Position {
        let parity = xy.y.rem_euclid(2) as i64;
        let px = Fixed64::from_num(TILE_SIZE * (2 * xy.x as i64 + parity + 1) / 2);
        let py = Fixed64::from_num(TILE_SIZE * (3 * xy.y as i64 + 2) / 4);
        Position { x: px, y: py }
    }

    /// Inverse of [`grid_to_position`](Self::grid_to_position): the tile whose
    /// center is nearest to `pos`. Exact on tile centers. Returns `None` when
    /// the position is outside the grid (beyond one tile of slack).
    pub fn position_to_grid(&self, pos: Position) -> Option<TileXy> {
        let tile = Fixed64::from_num(TILE_SIZE);
        let half = Fixed64::from_num(TILE_SIZE / 2);
        let row_spacing = Fixed64::from_num(TILE_SIZE * 3) / Fixed64::from_num(4);
        let row_guess: i32 = ((pos.y - half) / row_spacing).round().to_num();

        let mut best: Option<(Fixed64, TileXy)> = None;
        for dy in -1..=1 {
            let y = row_guess + dy;
            let parity = y.rem_euclid(2) as i64;
            let col_guess: i32 =
                ((pos.x - half - Fixed64::from_num(TILE_SIZE * parity / 2)) / tile)
                    .round()
                    .to_num();
            for dx in -1..=1 {
                let candidate = TileXy::new(col_guess + dx, y);
                if !self.contains(candidate) {
                    continue;
                }
                let center = self.grid_to_position(candidate);
                let ddx = pos.x - center.x;
                let ddy = pos.y - center.y;
                if ddx.abs() > tile || ddy.abs() > tile {
                    continue;
                }
                let dist2 = ddx * ddx + ddy * ddy;
                if best.is_none_or(|(d, _)| dist2 < d) {
                    best = Some((dist2, candidate));
                }
            }
        }
        best.map(|(_, xy)| xy)
    }

    /// All tiles in row-major order (deterministic).
    pub fn tiles(&self) -> impl Iterator<Item = TileXy> + '_ {
        (0..self.height as i32)
            .flat_map(move |y| (0..self.width as i32).map(move |x| TileXy::new(x, y)))
    }
}

// ===========================================================================
// Tests
// ===========================================================================
