/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer (array of Cell)
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Entities are drawn at positions blended by the frame fraction the
/// scheduler hands us, so motion looks smooth even though the
/// simulation only advances at its fixed step.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::cell::{PICKUP, POWERUP, WALL_DOWN, WALL_LEFT, WALL_RIGHT, WALL_UP};
use crate::sim::score::LEADERBOARD_SIZE;
use crate::sim::world::{Phase, Skill, World, EFFECTS_GROUP, HERO_GROUP, PROWLERS_GROUP};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq)]
struct Cell {
    ch: char,
    fg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 18, g: 18, b: 28 };

    const BLANK: Cell = Cell {
        ch: ' ',
        fg: Color::White,
    };

    /// Sentinel used to invalidate the back buffer so every position
    /// gets re-emitted.
    const INVALID: Cell = Cell {
        ch: '\u{0}',
        fg: Color::Magenta,
    };
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer {
            width: w,
            height: h,
            cells: vec![Cell::BLANK; w * h],
        }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: i32, y: i32, ch: char, fg: Color) {
        if x >= 0 && (x as usize) < self.width && y >= 0 && (y as usize) < self.height {
            self.cells[y as usize * self.width + x as usize] = Cell { ch, fg };
        }
    }

    fn put_str(&mut self, x: i32, y: i32, s: &str, fg: Color) {
        let mut cx = x;
        for ch in s.chars() {
            self.set(cx, y, ch, fg);
            cx += 1;
        }
    }

    fn put_centered(&mut self, y: i32, s: &str, fg: Color) {
        let x = (self.width as i32 - s.chars().count() as i32) / 2;
        self.put_str(x, y, s, fg);
    }
}

// ── Camera: a viewport into the maze, in cell units ──

/// Follows the hero with a dead zone so the view doesn't jitter; mazes
/// smaller than the viewport are centered instead.
struct Camera {
    x: i32,
    y: i32,
    view_w: usize,
    view_h: usize,
}

impl Camera {
    fn new() -> Self {
        Camera {
            x: 0,
            y: 0,
            view_w: 0,
            view_h: 0,
        }
    }

    fn follow(&mut self, tx: f32, ty: f32, world_w: usize, world_h: usize) {
        if self.view_w == 0 || self.view_h == 0 {
            return;
        }

        let axis = |cam: i32, view: usize, world: usize, t: f32| -> i32 {
            if world <= view {
                return -((view as i32 - world as i32) / 2);
            }
            let margin = (view as i32) / 5;
            let t = t.round() as i32;
            let mut c = cam;
            if t < c + margin {
                c = t - margin;
            } else if t > c + view as i32 - margin - 1 {
                c = t - view as i32 + margin + 1;
            }
            c.max(0).min((world as i32 - view as i32).max(0))
        };

        self.x = axis(self.x, self.view_w, world_w, tx);
        self.y = axis(self.y, self.view_h, world_h, ty);
    }
}

// ── Renderer ──

/// Terminal footprint of one maze cell.
const CELL_W: usize = 4;
const CELL_H: usize = 2;

const HUD_ROW: i32 = 0;
const MAP_ROW: i32 = 2;

const WALL_COLOR: Color = Color::Rgb { r: 95, g: 110, b: 200 };
const DOT_COLOR: Color = Color::Rgb { r: 190, g: 170, b: 120 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    camera: Camera,
    last_phase: Option<Phase>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            camera: Camera::new(),
            last_phase: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);

        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, world: &World, fraction: f32, paused: bool) -> io::Result<()> {
        // Detect terminal resize.
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        // Phase change → full repaint for a clean transition.
        if self.last_phase != Some(world.phase) {
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
            self.last_phase = Some(world.phase);
        }

        // Viewport in maze cells.
        let reserved = MAP_ROW as usize + 2; // HUD + gap + help line
        self.camera.view_w = (self.term_w.saturating_sub(1) / CELL_W).min(world.ctx.maze.width()).max(1);
        self.camera.view_h = (self.term_h.saturating_sub(reserved + 1) / CELL_H)
            .min(world.ctx.maze.height())
            .max(1);

        self.front.clear();

        match world.phase {
            Phase::Title => self.compose_title(world),
            Phase::Playing => {
                let hero = world.ctx.hero.last_pos;
                self.camera
                    .follow(hero.x, hero.y, world.ctx.maze.width(), world.ctx.maze.height());
                self.compose_game(world, fraction);
                if paused {
                    self.overlay_box(&["PAUSED", "", "[P] resume"]);
                }
            }
            Phase::GameOver => {
                self.compose_game(world, fraction);
                self.compose_game_over(world);
            }
            Phase::EnterName => {
                self.compose_game(world, fraction);
                self.compose_enter_name(world);
            }
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Game composition ──

    /// Terminal position of a world-space point, or None when off-view.
    fn project(&self, wx: f32, wy: f32) -> Option<(i32, i32)> {
        let col = ((wx - self.camera.x as f32) * CELL_W as f32).round() as i32 + CELL_W as i32 / 2;
        let row = MAP_ROW + ((wy - self.camera.y as f32) * CELL_H as f32).round() as i32 + CELL_H as i32 / 2;
        let max_col = (self.camera.view_w * CELL_W) as i32;
        let max_row = MAP_ROW + (self.camera.view_h * CELL_H) as i32;
        if col >= 0 && col <= max_col && row >= MAP_ROW && row <= max_row {
            Some((col, row))
        } else {
            None
        }
    }

    fn compose_game(&mut self, world: &World, fraction: f32) {
        self.compose_maze(world);
        self.compose_entities(world, fraction);
        self.compose_hud(world);
        let help = "arrows/wasd move   space auto-run   p pause   esc quit to title";
        self.front.put_centered(self.term_h as i32 - 1, help, Color::DarkGrey);
    }

    fn compose_maze(&mut self, world: &World) {
        let maze = &world.ctx.maze;
        let blink = world.anim_tick / 4 % 2 == 0;

        for vy in 0..self.camera.view_h as i32 {
            for vx in 0..self.camera.view_w as i32 {
                let (wx, wy) = (self.camera.x + vx, self.camera.y + vy);
                if !maze.is_inside(wx, wy) {
                    continue;
                }
                let walls = maze.walls(wx as usize, wy as usize);
                let base_c = vx * CELL_W as i32;
                let base_r = MAP_ROW + vy * CELL_H as i32;

                // Lattice corner.
                self.front.set(base_c, base_r, '·', Color::DarkGrey);

                if walls & WALL_UP != 0 {
                    for i in 0..=CELL_W as i32 {
                        self.front.set(base_c + i, base_r, '─', WALL_COLOR);
                    }
                }
                if walls & WALL_LEFT != 0 {
                    for i in 0..=CELL_H as i32 {
                        self.front.set(base_c, base_r + i, '│', WALL_COLOR);
                    }
                }
                // Far boundary strokes, only on the last row/column.
                if wy == maze.height() as i32 - 1 && walls & WALL_DOWN != 0 {
                    for i in 0..=CELL_W as i32 {
                        self.front.set(base_c + i, base_r + CELL_H as i32, '─', WALL_COLOR);
                    }
                }
                if wx == maze.width() as i32 - 1 && walls & WALL_RIGHT != 0 {
                    for i in 0..=CELL_H as i32 {
                        self.front.set(base_c + CELL_W as i32, base_r + i, '│', WALL_COLOR);
                    }
                }

                // Cell contents.
                let cc = base_c + CELL_W as i32 / 2;
                let cr = base_r + CELL_H as i32 / 2;
                if maze.is_element(wx, wy, POWERUP) {
                    let color = if blink { Color::Magenta } else { Color::White };
                    self.front.set(cc, cr, '◆', color);
                } else if maze.is_element(wx, wy, PICKUP) {
                    self.front.set(cc, cr, '.', DOT_COLOR);
                }
            }
        }
    }

    fn compose_entities(&mut self, world: &World, fraction: f32) {
        // Prowlers: three trail segments behind an interpolated head.
        for p in world.particles.group(PROWLERS_GROUP).live() {
            for (pos, ch) in [
                (p.extra.truncate(), '.'),
                (p.color.truncate(), 'x'),
                (p.velocity, 'x'),
            ] {
                if let Some((c, r)) = self.project(pos.x, pos.y) {
                    self.front.set(c, r, ch, Color::DarkRed);
                }
            }
            let head = p.interpolated(fraction).position;
            if let Some((c, r)) = self.project(head.x, head.y) {
                self.front.set(c, r, 'X', Color::Red);
            }
        }

        // Hero.
        let hero = &world.ctx.hero;
        if hero.alive && !hero.dying {
            for p in world.particles.group(HERO_GROUP).live() {
                let pos = p.interpolated(fraction).position;
                if let Some((c, r)) = self.project(pos.x, pos.y) {
                    let invincible = hero.invincible_until_ms > hero.age_ms;
                    let color = if invincible && world.anim_tick / 2 % 2 == 0 {
                        Color::DarkYellow
                    } else if hero.energy > 0 {
                        Color::White
                    } else {
                        Color::Yellow
                    };
                    self.front.set(c, r, '@', color);
                }
            }
        }

        // Floating score text, dimming as it fades (alpha in extra.z).
        for p in world.particles.group(EFFECTS_GROUP).live() {
            let s = p.interpolated(fraction);
            if let Some((c, r)) = self.project(s.position.x, s.position.y) {
                let a = s.extra.z.clamp(0.25, 1.0);
                let color = Color::Rgb {
                    r: (s.color.x * a * 255.0) as u8,
                    g: (s.color.y * a * 255.0) as u8,
                    b: (s.color.z * a * 255.0) as u8,
                };
                self.front.put_str(c, r, &p.text, color);
            }
        }
    }

    fn compose_hud(&mut self, world: &World) {
        let score = world.ctx.score.current_score();
        let high = world.ctx.score.high_score();
        let hud = format!(
            "SCORE {:<7} HI {:<7} LEVEL {:<3} {}",
            score,
            high,
            world.level,
            world.ctx.skill.name()
        );
        self.front.put_str(1, HUD_ROW, &hud, Color::White);

        if world.ctx.hero.energy > 0 {
            let bars = (world.ctx.hero.energy / 30).min(12) as usize;
            let meter = format!("POWER [{:<12}]", "=".repeat(bars));
            let x = self.term_w as i32 - meter.chars().count() as i32 - 1;
            self.front.put_str(x, HUD_ROW, &meter, Color::Magenta);
        }
    }

    // ── Screens ──

    fn compose_title(&mut self, world: &World) {
        let mid = self.term_h as i32 / 2;
        self.front.put_centered(1, "M A Z E C H A S E", Color::Yellow);
        self.front
            .put_centered(2, "eat every dot, dodge the prowlers", Color::DarkGrey);

        // Skill picker.
        let mut row = 4;
        for s in Skill::ALL {
            let marker = if s == world.ctx.skill { '>' } else { ' ' };
            let line = format!("{} {}  {}", marker, s.index() + 1, s.name());
            let color = if s == world.ctx.skill { Color::White } else { Color::DarkGrey };
            self.front.put_str(4, row, &line, color);
            row += 1;
        }

        // Active leaderboard.
        let lb_top = (row + 1).max(mid - 6);
        self.front.put_str(4, lb_top, &format!("Skill: {}", world.ctx.score.board_name()), Color::Cyan);
        for (i, e) in world.ctx.score.entries().iter().take(LEADERBOARD_SIZE - 1).enumerate() {
            let secs = e.ms_played / 1000;
            let line = format!(
                "{:>2}. {:<16} {:>7}  {:>4}.{:02} sec",
                i + 1,
                e.name,
                e.score,
                secs,
                (e.ms_played % 1000) / 10
            );
            let color = if i == world.ctx.score.current_index() {
                Color::Yellow
            } else {
                Color::Grey
            };
            self.front.put_str(4, lb_top + 1 + i as i32, &line, color);
        }

        self.front.put_centered(
            self.term_h as i32 - 2,
            "[1-5] skill   [enter] start   [q] quit",
            Color::DarkGrey,
        );
    }

    fn compose_game_over(&mut self, world: &World) {
        let score = format!("final score {}", world.ctx.score.current_score());
        let rank = if world.ctx.score.current_is_top_ten() {
            format!("top ten! rank {}", world.ctx.score.current_index() + 1)
        } else {
            "no high score this time".to_string()
        };
        self.overlay_box(&["GAME OVER", "", &score, &rank, "", "[enter] title screen"]);
    }

    fn compose_enter_name(&mut self, world: &World) {
        let blink = if world.anim_tick / 3 % 2 == 0 { '_' } else { ' ' };
        let entry = format!("name: {}{}", world.name_entry, blink);
        self.overlay_box(&["NEW HIGH SCORE!", "", &entry, "", "[enter] confirm"]);
    }

    /// Draw a bordered box of centered lines over the current frame.
    fn overlay_box(&mut self, lines: &[&str]) {
        let inner_w = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 4;
        let top = (self.term_h as i32 - lines.len() as i32 - 2) / 2;
        let left = (self.term_w as i32 - inner_w as i32 - 2) / 2;

        let horiz: String = "─".repeat(inner_w);
        self.front.put_str(left, top, &format!("┌{}┐", horiz), Color::White);
        for (i, line) in lines.iter().enumerate() {
            let pad = inner_w - line.chars().count();
            let (lp, rp) = (pad / 2, pad - pad / 2);
            let body = format!("│{}{}{}│", " ".repeat(lp), line, " ".repeat(rp));
            self.front.put_str(left, top + 1 + i as i32, &body, Color::White);
        }
        self.front
            .put_str(left, top + 1 + lines.len() as i32, &format!("└{}┘", horiz), Color::White);
    }

    // ── Diff + emit ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg: Option<Color> = None;
        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.cells[y * self.front.width + x];
                if cell == self.back.cells[y * self.back.width + x] {
                    continue;
                }
                queue!(self.writer, MoveTo(x as u16, y as u16))?;
                if last_fg != Some(cell.fg) {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = Some(cell.fg);
                }
                queue!(self.writer, Print(cell.ch))?;
            }
        }
        self.writer.flush()
    }
}
