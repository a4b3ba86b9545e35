/// Entity behaviors: the hero, the prowlers chasing it, and score
/// burst effects. Each is a plain function table over `GameCtx` wired
/// into a particle group by the world.

use glam::{Vec2, Vec3};
use rand::Rng;
use rand_pcg::Pcg32;

use crate::domain::cell::{CellMask, Dir, OCCUPANT, PICKUP, POWERUP, WALL_DOWN, WALL_LEFT, WALL_RIGHT, WALL_UP};
use crate::domain::navigate::{self, OBJECT_RADIUS};
use crate::sim::event::GameEvent;
use crate::sim::particles::{Behavior, ParticleInfo};
use crate::sim::world::GameCtx;

/// Ticks the hero spends visibly dying before the run ends.
const DYING_DELAY: i32 = 20;

pub fn hero() -> Behavior<GameCtx> {
    Behavior {
        init: hero_init,
        update: hero_update,
        hit: hero_hit,
    }
}

pub fn prowler() -> Behavior<GameCtx> {
    Behavior {
        init: prowler_init,
        update: prowler_update,
        hit: prowler_hit,
    }
}

pub fn score_burst() -> Behavior<GameCtx> {
    Behavior {
        init: burst_init,
        update: burst_update,
        hit: no_hit,
    }
}

fn no_hit(_: &mut GameCtx, _: &mut ParticleInfo, _: &mut ParticleInfo) {}

// ── Hero ──

fn hero_init(ctx: &mut GameCtx, p: &mut ParticleInfo) {
    p.position = Vec2::new(
        (ctx.maze.width() / 2) as f32,
        (ctx.maze.height() / 2) as f32,
    );
    p.radius = OBJECT_RADIUS;
    p.damage = 500;
    p.tod = -1;
    ctx.hero.last_pos = p.position;
    p.update_prevs();
}

fn hero_update(ctx: &mut GameCtx, p: &mut ParticleInfo) -> bool {
    if p.tod == 0 {
        return false;
    }

    if ctx.hero.dying {
        ctx.hero.dying_delay -= 1;
        if ctx.hero.dying_delay < 0 {
            ctx.hero.alive = false;
            ctx.hero_dead = true;
            return false;
        }
        return true;
    }
    if !ctx.hero.alive {
        return false;
    }

    p.update_prevs();
    ctx.hero.age_ms = ctx.game_time_ms;
    if ctx.hero.energy > 0 {
        ctx.hero.energy -= 1;
    }

    if ctx.hero.do_trace {
        if ctx.hero.trace_cooldown > 0 {
            ctx.hero.trace_cooldown -= 1;
        } else {
            ctx.hero.trace_cooldown = ctx.speed.trace_move_rate;
            let mut x = p.position.x.round() as i32;
            let mut y = p.position.y.round() as i32;
            trace_step(ctx, &mut x, &mut y);
            p.position = Vec2::new(x as f32, y as f32);
            check_cell(ctx, x, y, p.position);
        }
    } else {
        let speed = ctx.speed.hero_speed;
        for dir in Dir::unpack(ctx.hero.directions) {
            let (dx, dy) = dir.delta();
            let vel = Vec2::new(dx as f32 * speed, dy as f32 * speed);
            p.position = navigate::resolve(&ctx.maze, p.position, vel, p.radius);
        }
        let cx = p.position.x.round() as i32;
        let cy = p.position.y.round() as i32;
        check_cell(ctx, cx, cy, p.position);
    }

    ctx.hero.last_pos = p.position;
    true
}

fn hero_hit(ctx: &mut GameCtx, p: &mut ParticleInfo, _other: &mut ParticleInfo) {
    if !ctx.hero.alive || ctx.hero.dying {
        return;
    }
    if ctx.hero.invincible_until_ms > ctx.hero.age_ms {
        return;
    }

    if ctx.hero.energy <= 0 {
        ctx.hero.dying = true;
        ctx.hero.dying_delay = DYING_DELAY;
        ctx.score.add_to_current(0, ctx.hero.age_ms); // stamp the run length
        ctx.events.push(GameEvent::HeroDied);
        p.damage = 0;
    } else {
        ctx.score.add_to_current(50, ctx.hero.age_ms);
        ctx.events.push(GameEvent::ProwlerEaten);
        ctx.effects.push(burst_at(p.position, "+50"));
    }
}

/// Consume whatever sits on the landed cell and notice level completion.
fn check_cell(ctx: &mut GameCtx, x: i32, y: i32, pos: Vec2) {
    if ctx.maze.is_element(x, y, PICKUP) {
        ctx.maze.clear_pickup(x, y);
        ctx.score.add_to_current(1, ctx.hero.age_ms);
        ctx.events.push(GameEvent::PickupTaken { x, y });
    }

    if ctx.maze.is_element(x, y, POWERUP) {
        ctx.maze.remove_element(x, y, POWERUP);
        ctx.score.add_to_current(100, ctx.hero.age_ms);
        ctx.hero.energy += 120 + 30 * (ctx.skill.index() as i32 + 1);
        ctx.events.push(GameEvent::PowerupTaken { x, y });
        ctx.effects.push(burst_at(pos, "+100"));
    }

    if ctx.maze.pickups_left() == 0 && !ctx.level_done {
        ctx.level_done = true;
        ctx.score.add_to_current(0, ctx.hero.age_ms);
        ctx.events.push(GameEvent::LevelCleared);
    }
}

// ── Auto-trace ──

fn random_wall_bit(rng: &mut Pcg32) -> CellMask {
    1 << rng.random_range(0..4u32)
}

fn reverse_bit(mask: CellMask) -> CellMask {
    match mask {
        WALL_UP => WALL_DOWN,
        WALL_DOWN => WALL_UP,
        WALL_LEFT => WALL_RIGHT,
        WALL_RIGHT => WALL_LEFT,
        _ => 0,
    }
}

/// One grid hop toward the nearest target: pathfinder first, then a
/// semi-random walk that prefers the previous heading and avoids
/// immediate reversals, degrading to pure random after enough misses.
fn trace_step(ctx: &mut GameCtx, x: &mut i32, y: &mut i32) {
    let element = if ctx.hero.energy > 0 { OCCUPANT } else { PICKUP };
    let found = ctx.tracer.find_direction(&ctx.maze, *x, *y, element);

    let dir = if found != 0 {
        ctx.hero.trace_miss_count = 0;
        let options: Vec<Dir> = Dir::unpack(found).collect();
        options[ctx.rng.random_range(0..options.len())].mask()
    } else {
        ctx.hero.trace_miss_count += 1;
        if ctx.hero.trace_miss_count < 10 {
            let old = ctx.hero.trace_dir;
            let mut dir = old;
            let mut count = 0u32;
            while ctx.maze.is_element(*x, *y, dir) {
                dir = random_wall_bit(&mut ctx.rng);
                while dir == old || dir == reverse_bit(old) {
                    dir = random_wall_bit(&mut ctx.rng);
                }
                count += 1;
                if count > ctx.rng.random_range(0..8u32) {
                    dir = random_wall_bit(&mut ctx.rng);
                    count = 0;
                }
            }
            ctx.hero.trace_dir = dir;
            dir
        } else {
            ctx.hero.trace_miss_count = 0;
            random_wall_bit(&mut ctx.rng)
        }
    };

    // The wall bit doubles as the travel direction; blocked means stay.
    if !ctx.maze.is_element(*x, *y, dir) {
        if let Some(d) = Dir::unpack(dir).next() {
            let (dx, dy) = d.delta();
            *x += dx;
            *y += dy;
        }
    }
}

// ── Prowler ──

fn prowler_init(ctx: &mut GameCtx, p: &mut ParticleInfo) {
    let w = ctx.maze.width();
    let h = ctx.maze.height();
    let hero = ctx.hero.last_pos;

    // Spawn away from the hero; give up on tiny mazes.
    let mut pos = Vec2::ZERO;
    for _ in 0..64 {
        pos = Vec2::new(
            ctx.rng.random_range(0..w) as f32,
            ctx.rng.random_range(0..h) as f32,
        );
        if pos.distance(hero) >= 5.0 {
            break;
        }
    }

    p.position = pos;
    // Trail history rides in velocity/color/extra until it is rotated.
    p.velocity = pos;
    p.color = pos.extend(0.0);
    p.extra = pos.extend(0.0);
    p.radius = OBJECT_RADIUS;
    p.damage = 0;
    p.tod = -1;
    p.update_prevs();

    ctx.maze.add_element(pos.x.round() as i32, pos.y.round() as i32, OCCUPANT);
}

fn prowler_update(ctx: &mut GameCtx, p: &mut ParticleInfo) -> bool {
    if p.tod == 0 {
        return false;
    }

    p.update_prevs();

    // Rotate the trail every third tick; damage doubles as the counter.
    p.damage += 1;
    if p.damage > 2 {
        p.extra = p.color;
        p.color = p.velocity.extend(0.0);
        p.velocity = p.position;
        p.damage = 0;
    }

    let delta = ctx.hero.last_pos - p.position;
    let dist = delta.length();
    if dist < 0.001 {
        return true;
    }

    let mut heading = delta / dist;
    if ctx.hero.energy > 0 {
        // Run away!
        heading = -heading;
    }

    let vel = heading * ctx.speed.prowler_speed;
    p.position = navigate::resolve(&ctx.maze, p.position, vel, p.radius);

    ctx.maze.add_element(p.position.x.round() as i32, p.position.y.round() as i32, OCCUPANT);
    true
}

fn prowler_hit(ctx: &mut GameCtx, p: &mut ParticleInfo, _other: &mut ParticleInfo) {
    if ctx.hero.energy > 0 {
        p.tod = 0;
    }
}

// ── Score burst ──

pub fn burst_at(pos: Vec2, text: &str) -> ParticleInfo {
    let mut p = ParticleInfo::at(pos.x, pos.y);
    p.text = text.to_string();
    p.color = Vec3::new(1.0, 0.85, 0.2);
    p
}

fn burst_init(ctx: &mut GameCtx, p: &mut ParticleInfo) {
    p.velocity = Vec2::new(ctx.rng.random_range(-0.04..0.04f32), -0.05);
    p.extra = Vec3::new(0.0, 0.05, 0.8); // z is alpha, fades to death
    p.tod = -1;
    p.update_prevs();
}

fn burst_update(_ctx: &mut GameCtx, p: &mut ParticleInfo) -> bool {
    if p.tod == 0 {
        return false;
    }
    p.update_prevs();

    p.extra.z -= 0.02;
    if p.extra.z < 0.0 {
        return false;
    }
    p.extra.y += 0.005;
    p.position += p.velocity;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeedConfig;
    use crate::domain::maze::MazeGraph;
    use crate::domain::path::PathFinder;
    use crate::sim::score::ScoreKeeper;
    use crate::sim::world::{HeroShared, Skill};
    use rand::SeedableRng;

    fn test_ctx() -> GameCtx {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut maze = MazeGraph::new(9, 9);
        maze.reset(&mut rng);
        let tracer = PathFinder::new(&maze, 32);
        let mut score = ScoreKeeper::new(&mut rng);
        score.set_board("Test", &mut rng);
        score.reset_current();
        GameCtx {
            maze,
            tracer,
            score,
            rng,
            hero: HeroShared::new(),
            skill: Skill::Normal,
            speed: SpeedConfig {
                step_ms: 33,
                max_catch_up: 10,
                hero_speed: 0.2,
                prowler_speed: 0.12,
                trace_move_rate: 0,
                search_radius: 32,
            },
            game_time_ms: 0,
            events: vec![],
            effects: vec![],
            level_done: false,
            hero_dead: false,
        }
    }

    #[test]
    fn hero_spawns_centered_and_eats_the_spawn_cell() {
        let mut ctx = test_ctx();
        let b = hero();
        let mut p = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);
        assert_eq!(p.position, Vec2::new(4.0, 4.0));

        let before = ctx.maze.pickups_left();
        assert!((b.update)(&mut ctx, &mut p));
        assert_eq!(ctx.maze.pickups_left(), before - 1);
        assert_eq!(ctx.score.current_score(), 1);
    }

    #[test]
    fn held_direction_moves_through_open_walls_only() {
        let mut ctx = test_ctx();
        let b = hero();
        let mut p = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);

        // Find an open direction from the center and hold it.
        let (cx, cy) = (4, 4);
        let open = Dir::ALL
            .into_iter()
            .find(|d| !ctx.maze.is_element(cx, cy, d.mask()))
            .unwrap();
        ctx.hero.directions = open.mask();

        let start = p.position;
        for _ in 0..3 {
            assert!((b.update)(&mut ctx, &mut p));
        }
        assert!(p.position.distance(start) > 0.3, "hero did not move");

        // A blocked direction goes nowhere.
        let blocked = Dir::ALL
            .into_iter()
            .find(|d| ctx.maze.is_element(cx, cy, d.mask()));
        if let Some(bd) = blocked {
            let mut q = ParticleInfo::at(0.0, 0.0);
            (b.init)(&mut ctx, &mut q);
            ctx.hero.directions = bd.mask();
            for _ in 0..3 {
                (b.update)(&mut ctx, &mut q);
            }
            let (dx, dy) = bd.delta();
            let toward = Vec2::new(dx as f32, dy as f32);
            // No net progress past the wall half-plane.
            let along = (q.position - Vec2::new(cx as f32, cy as f32)).dot(toward);
            assert!(along <= 0.5 - q.radius + 1e-5);
        }
    }

    #[test]
    fn trace_mode_hunts_down_pickups() {
        let mut ctx = test_ctx();
        let b = hero();
        let mut p = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);
        ctx.hero.do_trace = true;

        let before = ctx.maze.pickups_left();
        for _ in 0..40 {
            assert!((b.update)(&mut ctx, &mut p));
        }
        assert!(
            ctx.maze.pickups_left() < before - 5,
            "trace mode barely collected: {} -> {}",
            before,
            ctx.maze.pickups_left()
        );
    }

    #[test]
    fn powerup_grants_energy_and_score() {
        let mut ctx = test_ctx();
        let b = hero();
        let mut p = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);

        ctx.maze.add_element(4, 4, POWERUP);
        (b.update)(&mut ctx, &mut p);
        // Normal skill grants 120 + 30 * (index + 1).
        assert_eq!(ctx.hero.energy, 120 + 30 * 2);
        assert!(ctx.score.current_score() >= 100);
    }

    #[test]
    fn unpowered_hit_starts_dying_and_ends_the_run() {
        let mut ctx = test_ctx();
        let b = hero();
        let mut p = ParticleInfo::at(0.0, 0.0);
        let mut other = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);
        ctx.hero.age_ms = 5000; // past the invincibility window

        (b.hit)(&mut ctx, &mut p, &mut other);
        assert!(ctx.hero.dying);

        for _ in 0..DYING_DELAY {
            assert!((b.update)(&mut ctx, &mut p));
        }
        assert!(!(b.update)(&mut ctx, &mut p));
        assert!(ctx.hero_dead);
    }

    #[test]
    fn powered_hit_scores_instead_of_dying() {
        let mut ctx = test_ctx();
        let b = hero();
        let mut p = ParticleInfo::at(0.0, 0.0);
        let mut other = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);
        ctx.hero.age_ms = 5000;
        ctx.hero.energy = 100;

        let before = ctx.score.current_score();
        (b.hit)(&mut ctx, &mut p, &mut other);
        assert!(!ctx.hero.dying);
        assert_eq!(ctx.score.current_score(), before + 50);
        assert_eq!(ctx.effects.len(), 1);
    }

    #[test]
    fn invincibility_window_blocks_hits() {
        let mut ctx = test_ctx();
        let b = hero();
        let mut p = ParticleInfo::at(0.0, 0.0);
        let mut other = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);
        ctx.hero.invincible_until_ms = 2000;
        ctx.hero.age_ms = 100;

        (b.hit)(&mut ctx, &mut p, &mut other);
        assert!(!ctx.hero.dying);
    }

    /// Maze with every interior wall opened: unobstructed pursuit.
    fn open_maze(n: usize) -> MazeGraph {
        let mut m = MazeGraph::new(n, n);
        for y in 0..n as i32 {
            for x in 0..n as i32 {
                for d in Dir::ALL {
                    let (dx, dy) = d.delta();
                    if m.is_inside(x + dx, y + dy) {
                        m.remove_element(x, y, d.mask());
                    }
                }
            }
        }
        m
    }

    #[test]
    fn prowler_chases_then_flees() {
        let mut ctx = test_ctx();
        ctx.maze = open_maze(9);
        ctx.hero.last_pos = Vec2::new(4.0, 4.0);
        let b = prowler();
        let mut p = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);
        assert!(p.position.distance(ctx.hero.last_pos) >= 5.0);

        let d0 = p.position.distance(ctx.hero.last_pos);
        for _ in 0..10 {
            assert!((b.update)(&mut ctx, &mut p));
        }
        let d1 = p.position.distance(ctx.hero.last_pos);
        assert!(d1 < d0, "prowler not closing in: {} -> {}", d0, d1);

        // Energized hero flips the heading.
        ctx.hero.energy = 500;
        let p0 = p.position;
        (b.update)(&mut ctx, &mut p);
        let step_toward = (ctx.hero.last_pos - p0).normalize();
        let moved = p.position - p0;
        assert!(moved.dot(step_toward) <= 0.0, "prowler still approaching");
    }

    #[test]
    fn prowler_marks_its_cell() {
        let mut ctx = test_ctx();
        ctx.hero.last_pos = Vec2::new(4.0, 4.0);
        let b = prowler();
        let mut p = ParticleInfo::at(0.0, 0.0);
        (b.init)(&mut ctx, &mut p);
        let (cx, cy) = (p.position.x.round() as i32, p.position.y.round() as i32);
        assert!(ctx.maze.is_element(cx, cy, OCCUPANT));
    }

    #[test]
    fn prowler_dies_to_powered_hero_hit() {
        let mut ctx = test_ctx();
        let b = prowler();
        let mut p = ParticleInfo::at(2.0, 2.0);
        let mut other = ParticleInfo::at(2.0, 2.0);
        (b.hit)(&mut ctx, &mut p, &mut other);
        assert!(p.tod < 0, "unpowered hero must not kill");

        ctx.hero.energy = 10;
        (b.hit)(&mut ctx, &mut p, &mut other);
        assert_eq!(p.tod, 0);
        assert!(!(b.update)(&mut ctx, &mut p));
    }

    #[test]
    fn burst_fades_out_and_dies() {
        let mut ctx = test_ctx();
        let b = score_burst();
        let mut p = burst_at(Vec2::new(3.0, 3.0), "+50");
        (b.init)(&mut ctx, &mut p);
        assert_eq!(p.text, "+50");

        let mut ticks = 0;
        while (b.update)(&mut ctx, &mut p) {
            ticks += 1;
            assert!(ticks < 200, "burst never died");
        }
        assert!(ticks >= 30, "burst died too fast: {} ticks", ticks);
    }
}
