/// Nearest-element search over the maze graph.
///
/// The maze is an undirected graph: a missing wall bit is an edge.
/// `find_direction` runs a breadth-first search from an agent's cell and
/// returns the set of first-step directions that lead to the nearest
/// cell carrying the wanted flag. When two or more equally-near targets
/// lie in different directions, all of their first steps are reported so
/// the caller can break the tie at random.
///
/// The search radius is adaptive: once targets are found well inside the
/// current radius, it halves, which keeps the average cost down as
/// pickups thin out late in a level. The starting radius is a tunable,
/// not a correctness knob.

use std::collections::VecDeque;

use super::cell::{CellMask, Dir};
use super::maze::MazeGraph;

pub struct PathFinder {
    /// Per-call scratch, sized to the maze; cleared on every search.
    visited: Vec<bool>,
    queue: VecDeque<Node>,
    max_dist: u32,
    initial_max_dist: u32,
}

#[derive(Clone, Copy)]
struct Node {
    x: i32,
    y: i32,
    /// First step taken from the start on the path to this node.
    first_dir: CellMask,
    dist: u32,
}

impl PathFinder {
    pub fn new(maze: &MazeGraph, max_dist: u32) -> Self {
        PathFinder {
            visited: vec![false; maze.width() * maze.height()],
            queue: VecDeque::with_capacity(256),
            max_dist,
            initial_max_dist: max_dist,
        }
    }

    /// Re-fit the scratch buffer after a maze resize and restore the
    /// search radius for a fresh level.
    pub fn reset(&mut self, maze: &MazeGraph) {
        self.visited = vec![false; maze.width() * maze.height()];
        self.max_dist = self.initial_max_dist;
    }

    /// Directions from (x, y) toward the nearest cell carrying `element`,
    /// as a wall-bit mask; 0 when nothing is in radius. The start cell
    /// itself is never examined — repeated calls while standing on a
    /// target would otherwise never move off it.
    pub fn find_direction(&mut self, maze: &MazeGraph, x: i32, y: i32, element: CellMask) -> CellMask {
        let w = maze.width();
        self.visited.iter_mut().for_each(|v| *v = false);
        self.queue.clear();

        self.visited[y as usize * w + x as usize] = true;
        for dir in Dir::ALL {
            if maze.is_element(x, y, dir.mask()) {
                continue;
            }
            let (dx, dy) = dir.delta();
            self.push(w, x + dx, y + dy, dir.mask(), 1);
        }

        let mut possible_dirs: CellMask = 0;
        let mut limit = self.max_dist;

        while let Some(node) = self.queue.pop_front() {
            if node.dist > limit {
                break;
            }

            if maze.is_element(node.x, node.y, element) {
                // Tighten the horizon so only equally-near finds from
                // here on can still contribute a direction.
                limit = limit.min(node.dist);
                possible_dirs |= node.first_dir;
                continue;
            }

            for dir in Dir::ALL {
                if maze.is_element(node.x, node.y, dir.mask()) {
                    continue;
                }
                let (dx, dy) = dir.delta();
                self.push(w, node.x + dx, node.y + dy, node.first_dir, node.dist + 1);
            }
        }
        self.queue.clear();

        if possible_dirs != 0 && self.max_dist > 16 && limit < self.max_dist / 2 {
            self.max_dist /= 2;
            log::info!("search radius now {}", self.max_dist);
        }

        possible_dirs
    }

    fn push(&mut self, w: usize, x: i32, y: i32, first_dir: CellMask, dist: u32) {
        let idx = y as usize * w + x as usize;
        if !self.visited[idx] {
            self.visited[idx] = true;
            self.queue.push_back(Node { x, y, first_dir, dist });
        }
    }
}
