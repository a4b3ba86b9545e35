/// Continuous agent movement against the maze walls.
///
/// Agents live in cell-center coordinates: cell (x, y) is centered at
/// (x as f32, y as f32), walls sit on the half-cell planes at ±0.5.
/// Each call rebuilds transient wall segments from the agent's rounded
/// cell and its 4-neighborhood — the maze is the single source of truth,
/// nothing is cached between calls.
///
/// Resolution is axis-separated: X motion is clamped against vertical
/// wall segments, then Y motion against horizontal ones, so agents slide
/// along walls instead of sticking to them. The guarantee callers rely
/// on: a resolved position never crosses a wall segment of the occupied
/// cell or its neighbors.

use glam::Vec2;

use super::cell::{WALL_DOWN, WALL_LEFT, WALL_RIGHT, WALL_UP};
use super::maze::MazeGraph;

/// Collision radius shared by every maze agent.
pub const OBJECT_RADIUS: f32 = 0.25;

/// A wall segment: a plane at `at` on one axis, spanning
/// [span − 0.5, span + 0.5] on the other.
#[derive(Clone, Copy)]
struct WallSeg {
    at: f32,
    span: f32,
}

pub fn resolve(maze: &MazeGraph, pos: Vec2, vel: Vec2, radius: f32) -> Vec2 {
    let cx = pos.x.round() as i32;
    let cy = pos.y.round() as i32;

    // Vertical wall planes near the agent: scan the agent's column,
    // one row up and one row down.
    let mut v_walls: [Option<WallSeg>; 6] = [None; 6];
    let mut vn = 0;
    for dy in -1..=1 {
        let y = cy + dy;
        if !maze.is_inside(cx, y) {
            continue;
        }
        if maze.is_element(cx, y, WALL_LEFT) {
            v_walls[vn] = Some(WallSeg { at: cx as f32 - 0.5, span: y as f32 });
            vn += 1;
        }
        if maze.is_element(cx, y, WALL_RIGHT) {
            v_walls[vn] = Some(WallSeg { at: cx as f32 + 0.5, span: y as f32 });
            vn += 1;
        }
    }

    // Horizontal wall planes: the agent's row, one column each side.
    let mut h_walls: [Option<WallSeg>; 6] = [None; 6];
    let mut hn = 0;
    for dx in -1..=1 {
        let x = cx + dx;
        if !maze.is_inside(x, cy) {
            continue;
        }
        if maze.is_element(x, cy, WALL_UP) {
            h_walls[hn] = Some(WallSeg { at: cy as f32 - 0.5, span: x as f32 });
            hn += 1;
        }
        if maze.is_element(x, cy, WALL_DOWN) {
            h_walls[hn] = Some(WallSeg { at: cy as f32 + 0.5, span: x as f32 });
            hn += 1;
        }
    }

    // X axis first.
    let mut new_x = pos.x + vel.x;
    for seg in v_walls.iter().flatten() {
        // Skip walls whose span doesn't reach the agent's Y extent.
        if pos.y + radius <= seg.span - 0.5 || pos.y - radius >= seg.span + 0.5 {
            continue;
        }
        if pos.x <= seg.at && new_x > seg.at - radius {
            new_x = seg.at - radius;
        } else if pos.x > seg.at && new_x < seg.at + radius {
            new_x = seg.at + radius;
        }
    }

    // Then Y, against the X we just settled on.
    let mut new_y = pos.y + vel.y;
    for seg in h_walls.iter().flatten() {
        if new_x + radius <= seg.span - 0.5 || new_x - radius >= seg.span + 0.5 {
            continue;
        }
        if pos.y <= seg.at && new_y > seg.at - radius {
            new_y = seg.at - radius;
        } else if pos.y > seg.at && new_y < seg.at + radius {
            new_y = seg.at + radius;
        }
    }

    Vec2::new(new_x, new_y)
}
