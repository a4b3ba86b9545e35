/// Maze graph: generation, dead-end simplification, pickup overlay.
///
/// The maze is a width×height grid of cells, each a wall bitmask.
/// `reset` carves a spanning tree (exactly one path between any two
/// cells, open-edge count = cells − 1), then `simplify` opens most
/// dead ends so agents don't get cornered as easily.
///
/// Out-of-bounds queries are a caller bug but happen on the simulation
/// hot path, so they log and return false instead of panicking.

use rand::Rng;
use rand_pcg::Pcg32;

use super::cell::{CellMask, Dir, OCCUPANT, PICKUP, POWERUP, WALL_ALL, WALL_DOWN, WALL_LEFT, WALL_RIGHT, WALL_UP};

/// Carve probability numerator; decisions carve when
/// `rng % 8192 > CARVE_BIAS` (~61% open).
const CARVE_BIAS: u32 = 3192;

pub struct MazeGraph {
    width: usize,
    height: usize,
    cells: Vec<CellMask>,
    /// Precomputed y → row offset, for O(1) (x, y) lookup.
    row_off: Vec<usize>,
    pickups_left: usize,
}

impl MazeGraph {
    /// Allocate a maze. Caller contract: width, height ≥ 1.
    /// Cells start fully walled; call `reset` to carve passages.
    pub fn new(width: usize, height: usize) -> Self {
        let mut m = MazeGraph {
            width,
            height,
            cells: vec![],
            row_off: vec![],
            pickups_left: 0,
        };
        m.resize(width, height);
        m
    }

    /// Reallocate for new dimensions. Contents are left fully walled.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells = vec![WALL_ALL; width * height];
        self.row_off = (0..height).map(|y| y * width).collect();
        self.pickups_left = 0;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Regenerate connectivity and pickups in place.
    pub fn reset(&mut self, rng: &mut Pcg32) {
        log::info!("maze reset {}x{}", self.width, self.height);
        self.generate(rng);
        self.simplify();
        self.add_pickups();
    }

    // ── Queries ──

    pub fn is_inside(&self, x: i32, y: i32) -> bool {
        x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height
    }

    /// Does the cell carry any of the masked flags?
    /// Out of bounds logs an error and reads as false.
    pub fn is_element(&self, x: i32, y: i32, element: CellMask) -> bool {
        if !self.is_inside(x, y) {
            log::error!("is_element out of bounds {},{}", x, y);
            return false;
        }
        self.cells[self.row_off[y as usize] + x as usize] & element != 0
    }

    pub fn add_element(&mut self, x: i32, y: i32, element: CellMask) {
        if self.is_inside(x, y) {
            self.cells[self.row_off[y as usize] + x as usize] |= element;
        }
    }

    pub fn remove_element(&mut self, x: i32, y: i32, element: CellMask) {
        if self.is_inside(x, y) {
            self.cells[self.row_off[y as usize] + x as usize] &= !element;
        }
    }

    /// Raw wall bits of a cell (in-bounds contract).
    pub fn walls(&self, x: usize, y: usize) -> CellMask {
        self.cells[self.row_off[y] + x] & WALL_ALL
    }

    // ── Pickups overlay ──

    /// Seed a common pickup on every cell.
    pub fn add_pickups(&mut self) {
        for c in self.cells.iter_mut() {
            *c |= PICKUP;
        }
        self.pickups_left = self.width * self.height;
    }

    /// Scatter `n` power pickups uniformly at random.
    /// Duplicates land on the same cell and collapse; that is fine.
    pub fn add_powerups(&mut self, n: usize, rng: &mut Pcg32) {
        for _ in 0..n {
            let pos = rng.random_range(0..self.cells.len());
            self.cells[pos] |= POWERUP;
        }
    }

    /// Consume the common pickup at (x, y).
    pub fn clear_pickup(&mut self, x: i32, y: i32) {
        if self.is_element(x, y, PICKUP) {
            self.remove_element(x, y, PICKUP);
            self.pickups_left -= 1;
        }
    }

    /// Remaining common pickups; zero means the level is done.
    pub fn pickups_left(&self) -> usize {
        self.pickups_left
    }

    /// Drop all occupant markers (they are rebuilt every tick).
    pub fn clear_occupants(&mut self) {
        for c in self.cells.iter_mut() {
            *c &= !OCCUPANT;
        }
    }

    // ── Wall mutation (always symmetric) ──

    fn open_wall(&mut self, x: usize, y: usize, dir: Dir) {
        let (dx, dy) = dir.delta();
        let (nx, ny) = (x as i32 + dx, y as i32 + dy);
        debug_assert!(self.is_inside(nx, ny), "opening a boundary wall");
        self.cells[self.row_off[y] + x] &= !dir.mask();
        self.cells[self.row_off[ny as usize] + nx as usize] &= !dir.opposite().mask();
    }

    // ── Generation ──

    /// Eller-style row sweep over circular set rings.
    ///
    /// Column set membership is a pair of arrays forming doubly linked
    /// rings: columns on the same ring share a set. Adjacent columns in
    /// different sets merge at random (forced on the last row); each set
    /// carves downward at least once per row so no set is orphaned.
    /// The result is a spanning tree.
    fn generate(&mut self, rng: &mut Pcg32) {
        let w = self.width;
        let h = self.height;

        for c in self.cells.iter_mut() {
            *c = WALL_ALL;
        }

        let mut next: Vec<usize> = (0..w).collect();
        let mut prev: Vec<usize> = (0..w).collect();

        let same_set = |next: &[usize], a: usize, b: usize| -> bool {
            let mut c = a;
            loop {
                c = next[c];
                if c == b {
                    return true;
                }
                if c == a {
                    return false;
                }
            }
        };

        for y in 0..h {
            let last_row = y == h - 1;

            // Left-right merges.
            for x in 1..w {
                if same_set(&next, x - 1, x) {
                    continue;
                }
                if last_row || rng.random_range(0..8192u32) > CARVE_BIAS {
                    self.open_wall(x - 1, y, Dir::Right);
                    // Splice the two rings into one.
                    let na = next[x - 1];
                    let nb = next[x];
                    next[x - 1] = nb;
                    prev[nb] = x - 1;
                    next[x] = na;
                    prev[na] = x;
                }
            }

            if last_row {
                break;
            }

            // Downward carves: random per cell, at least one per set.
            let mut carved = vec![false; w];
            for c in carved.iter_mut() {
                *c = rng.random_range(0..8192u32) > CARVE_BIAS;
            }

            let mut seen = vec![false; w];
            for x in 0..w {
                if seen[x] {
                    continue;
                }
                let mut members = vec![x];
                let mut c = next[x];
                while c != x {
                    members.push(c);
                    c = next[c];
                }
                for &m in &members {
                    seen[m] = true;
                }
                if !members.iter().any(|&m| carved[m]) {
                    carved[members[rng.random_range(0..members.len())]] = true;
                }
            }

            for x in 0..w {
                if carved[x] {
                    self.open_wall(x, y, Dir::Down);
                } else {
                    // Leave the set: singleton ring for the next row.
                    let (p, n) = (prev[x], next[x]);
                    next[p] = n;
                    prev[n] = p;
                    next[x] = x;
                    prev[x] = x;
                }
            }
        }
    }

    // ── Simplification ──

    /// Open most dead ends: any cell with exactly three walls loses one,
    /// chosen by a fixed priority per case, falling back when the
    /// preferred wall sits on the maze boundary. Corner cells where both
    /// options are boundary walls keep their dead end.
    ///
    /// The sweep mutates in place, so a removal can feed the cells that
    /// follow it in row-major order.
    fn simplify(&mut self) {
        let w = self.width;
        let h = self.height;
        for y in 0..h {
            for x in 0..w {
                match self.cells[self.row_off[y] + x] & WALL_ALL {
                    // Open up: prefer opening down, else right.
                    m if m == WALL_DOWN | WALL_LEFT | WALL_RIGHT => {
                        if y != h - 1 {
                            self.open_wall(x, y, Dir::Down);
                        } else if x != w - 1 {
                            self.open_wall(x, y, Dir::Right);
                        }
                    }
                    // Open down: prefer opening up, else left.
                    m if m == WALL_UP | WALL_LEFT | WALL_RIGHT => {
                        if y != 0 {
                            self.open_wall(x, y, Dir::Up);
                        } else if x != 0 {
                            self.open_wall(x, y, Dir::Left);
                        }
                    }
                    // Open left: prefer opening right, else down.
                    m if m == WALL_UP | WALL_DOWN | WALL_RIGHT => {
                        if x != w - 1 {
                            self.open_wall(x, y, Dir::Right);
                        } else if y != h - 1 {
                            self.open_wall(x, y, Dir::Down);
                        }
                    }
                    // Open right (or sealed box): prefer opening left, else up.
                    m if m == WALL_UP | WALL_DOWN | WALL_LEFT || m == WALL_ALL => {
                        if x != 0 {
                            self.open_wall(x, y, Dir::Left);
                        } else if y != 0 {
                            self.open_wall(x, y, Dir::Up);
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}
