/// World: the session object that owns every subsystem.
///
/// One `World` owns maze, pathfinder, score keeper, RNG and particle
/// manager, and hands behaviors a `GameCtx` — everything except the
/// particle pools themselves, so behaviors can mutate game state while
/// the manager iterates. No subsystem is reachable except through the
/// session that owns it.
///
/// One `game_tick` runs entirely inside a fixed step: occupant markers
/// are rebuilt, all groups update in registration order, link collisions
/// fire, then deferred work (effect spawns, level completion, hero
/// death) is applied at the tick boundary.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::config::{GameConfig, SpeedConfig};
use crate::domain::cell::{CellMask, WALL_DOWN};
use crate::domain::maze::MazeGraph;
use crate::domain::path::PathFinder;
use crate::sim::entities;
use crate::sim::event::GameEvent;
use crate::sim::particles::{ParticleInfo, ParticleManager};
use crate::sim::score::ScoreKeeper;

pub const HERO_GROUP: usize = 0;
pub const PROWLERS_GROUP: usize = 1;
pub const EFFECTS_GROUP: usize = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    Playing,
    GameOver,
    EnterName,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Skill {
    Beginner,
    Normal,
    Expert,
    EagleEye,
    Omg,
}

impl Skill {
    pub const ALL: [Skill; 5] = [Skill::Beginner, Skill::Normal, Skill::Expert, Skill::EagleEye, Skill::Omg];

    pub fn name(self) -> &'static str {
        match self {
            Skill::Beginner => "Beginner",
            Skill::Normal => "Normal",
            Skill::Expert => "Expert",
            Skill::EagleEye => "Eagle-Eye",
            Skill::Omg => "OMG!",
        }
    }

    pub fn from_name(name: &str) -> Option<Skill> {
        Skill::ALL.into_iter().find(|s| s.name() == name)
    }

    pub fn index(self) -> u32 {
        match self {
            Skill::Beginner => 0,
            Skill::Normal => 1,
            Skill::Expert => 2,
            Skill::EagleEye => 3,
            Skill::Omg => 4,
        }
    }

    /// Board edge length. The harder the skill, the finer the maze.
    pub fn maze_size(self) -> usize {
        match self {
            Skill::Beginner => 12,
            Skill::Normal => 17,
            Skill::Expert => 26,
            Skill::EagleEye => 39,
            Skill::Omg => 53,
        }
    }
}

/// Hero-wide state shared between the hero particle's behavior, input
/// handling and the renderer.
pub struct HeroShared {
    pub alive: bool,
    pub dying: bool,
    pub dying_delay: i32,
    /// Milliseconds of game time at the hero's last update.
    pub age_ms: u32,
    pub invincible_until_ms: u32,
    /// Power-mode ticks remaining; positive means prowlers are prey.
    pub energy: i32,
    /// Held movement directions, as wall bits.
    pub directions: CellMask,
    /// Auto-trace toward the nearest target while held.
    pub do_trace: bool,
    pub trace_cooldown: u32,
    /// Random-walk fallback state for trace mode.
    pub trace_dir: CellMask,
    pub trace_miss_count: u32,
    pub last_pos: Vec2,
}

impl HeroShared {
    pub fn new() -> Self {
        HeroShared {
            alive: true,
            dying: false,
            dying_delay: 0,
            age_ms: 0,
            invincible_until_ms: 0,
            energy: 0,
            directions: 0,
            do_trace: false,
            trace_cooldown: 0,
            trace_dir: WALL_DOWN,
            trace_miss_count: 0,
            last_pos: Vec2::ZERO,
        }
    }
}

/// Everything the entity behaviors may touch during an update pass.
pub struct GameCtx {
    pub maze: MazeGraph,
    pub tracer: PathFinder,
    pub score: ScoreKeeper,
    pub rng: Pcg32,
    pub hero: HeroShared,
    pub skill: Skill,
    pub speed: SpeedConfig,
    pub game_time_ms: u32,
    pub events: Vec<GameEvent>,
    /// Effect spawn requests, flushed into the effects group at the
    /// tick boundary.
    pub effects: Vec<ParticleInfo>,
    pub level_done: bool,
    pub hero_dead: bool,
}

pub struct World {
    pub ctx: GameCtx,
    pub particles: ParticleManager<GameCtx>,
    pub phase: Phase,
    /// Level counter; also scales the prowler population.
    pub level: u32,
    pub anim_tick: u32,
    /// Name being typed on the EnterName screen.
    pub name_entry: String,
    /// Prefill for the name prompt, remembered from the last run.
    pub default_name: String,
}

impl World {
    pub fn new(config: &GameConfig) -> Self {
        let mut rng = Pcg32::from_os_rng();
        let skill = Skill::from_name(&config.skill).unwrap_or(Skill::Normal);
        let size = skill.maze_size();
        let maze = MazeGraph::new(size, size);
        let tracer = PathFinder::new(&maze, config.speed.search_radius);
        let mut score = ScoreKeeper::new(&mut rng);
        score.load();
        score.set_board(skill.name(), &mut rng);

        let mut particles = ParticleManager::new();
        let hero = particles.add_group("hero", 1, entities::hero());
        let prowlers = particles.add_group("prowlers", 300, entities::prowler());
        let effects = particles.add_group("effects", 1000, entities::score_burst());
        debug_assert_eq!((hero, prowlers, effects), (HERO_GROUP, PROWLERS_GROUP, EFFECTS_GROUP));
        particles.add_link(HERO_GROUP, PROWLERS_GROUP);

        World {
            ctx: GameCtx {
                maze,
                tracer,
                score,
                rng,
                hero: HeroShared::new(),
                skill,
                speed: config.speed.clone(),
                game_time_ms: 0,
                events: vec![],
                effects: vec![],
                level_done: false,
                hero_dead: false,
            },
            particles,
            phase: Phase::Title,
            level: 0,
            anim_tick: 0,
            name_entry: String::new(),
            default_name: config.player_name.clone(),
        }
    }

    /// Switch skill (title screen); re-targets maze size and leaderboard.
    pub fn set_skill(&mut self, skill: Skill) {
        self.ctx.skill = skill;
        self.ctx.score.set_board(skill.name(), &mut self.ctx.rng);
    }

    /// Reset everything and enter the Playing phase at level 1.
    pub fn start_game(&mut self) {
        let size = self.ctx.skill.maze_size();
        self.ctx.maze.resize(size, size);

        // Let lingering particles die, then repopulate.
        self.particles.reset(&mut self.ctx);
        self.ctx.hero = HeroShared::new();
        self.ctx.hero.last_pos = Vec2::new(size as f32 / 2.0, size as f32 / 2.0);
        self.ctx.level_done = false;
        self.ctx.hero_dead = false;
        self.ctx.score.reset_current();

        self.level = 0;
        self.particles.spawn(HERO_GROUP, ParticleInfo::at(0.0, 0.0));
        self.next_level();

        self.ctx.tracer.reset(&self.ctx.maze);
        self.ctx.events.push(GameEvent::GameStarted);
        self.phase = Phase::Playing;
    }

    /// Regenerate the maze, sprinkle powerups, grow the prowler pack.
    fn next_level(&mut self) {
        self.level += 1;
        self.ctx.maze.reset(&mut self.ctx.rng);
        self.ctx.maze.add_powerups(self.ctx.skill.index() as usize + 1, &mut self.ctx.rng);

        self.ctx.hero.energy = 0;
        self.ctx.hero.invincible_until_ms = self.ctx.hero.age_ms + 2000;

        let count = (self.level * (self.ctx.skill.index() + 1)) / 2 + 1;
        for _ in 0..count {
            self.particles.spawn(PROWLERS_GROUP, ParticleInfo::at(0.0, 0.0));
        }
        log::info!("level {} with {} new prowlers", self.level, count);
    }

    /// One fixed simulation step.
    pub fn game_tick(&mut self, now_ms: u32) {
        if self.phase != Phase::Playing {
            return;
        }
        self.ctx.game_time_ms = now_ms;
        self.ctx.maze.clear_occupants();
        self.particles.update(&mut self.ctx);

        for e in self.ctx.effects.drain(..) {
            self.particles.spawn(EFFECTS_GROUP, e);
        }

        if self.ctx.level_done {
            self.ctx.level_done = false;
            self.next_level();
        }

        if self.ctx.hero_dead {
            self.ctx.hero_dead = false;
            self.phase = if self.ctx.score.current_is_top_ten() {
                self.name_entry = self.default_name.clone();
                Phase::EnterName
            } else {
                Phase::GameOver
            };
        }
    }

    /// Always-on housekeeping step (title animation, blink timers).
    pub fn other_tick(&mut self) {
        self.anim_tick = self.anim_tick.wrapping_add(1);
    }

    /// Commit the typed name for a top-ten run.
    pub fn commit_name(&mut self) {
        let name = if self.name_entry.trim().is_empty() {
            "Anonymous".to_string()
        } else {
            self.name_entry.trim().to_string()
        };
        self.ctx.score.set_name_for_current(&name);
        self.phase = Phase::GameOver;
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.ctx.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GameConfig {
        // Fixed values, independent of any config.toml on disk.
        GameConfig {
            speed: SpeedConfig {
                step_ms: 33,
                max_catch_up: 10,
                hero_speed: 0.2,
                prowler_speed: 0.12,
                trace_move_rate: 1,
                search_radius: 32,
            },
            skill: "Beginner".into(),
            player_name: String::new(),
            sound: false,
        }
    }

    #[test]
    fn start_game_populates_the_world() {
        let mut w = World::new(&test_config());
        w.start_game();
        assert_eq!(w.phase, Phase::Playing);
        assert_eq!(w.level, 1);

        // Hero and prowlers are queued; the first tick makes them live.
        w.game_tick(33);
        assert_eq!(w.particles.group(HERO_GROUP).live().len(), 1);
        // Beginner, level 1: (1 * 1) / 2 + 1 = 1 prowler.
        assert_eq!(w.particles.group(PROWLERS_GROUP).live().len(), 1);

        let size = Skill::Beginner.maze_size();
        // The hero consumed the pickup under its spawn cell.
        assert_eq!(w.ctx.maze.pickups_left(), size * size - 1);
    }

    #[test]
    fn ticks_are_inert_outside_playing() {
        let mut w = World::new(&test_config());
        w.start_game();
        w.phase = Phase::Title;
        w.game_tick(33);
        assert_eq!(w.particles.live_count(), 0, "no spawn flush outside Playing");
    }

    #[test]
    fn clearing_all_pickups_advances_the_level() {
        let mut w = World::new(&test_config());
        w.start_game();
        w.game_tick(33);

        let size = w.ctx.maze.width() as i32;
        for y in 0..size {
            for x in 0..size {
                w.ctx.maze.clear_pickup(x, y);
            }
        }
        assert_eq!(w.ctx.maze.pickups_left(), 0);

        // The hero's next cell check notices and the level turns over.
        w.game_tick(66);
        assert_eq!(w.level, 2);
        assert!(w.ctx.maze.pickups_left() > 0, "new level reseeded pickups");
    }

    #[test]
    fn hero_death_moves_to_game_over() {
        let mut w = World::new(&test_config());
        w.start_game();
        w.game_tick(33);

        w.ctx.hero_dead = true;
        w.game_tick(66);
        assert!(matches!(w.phase, Phase::GameOver | Phase::EnterName));
    }

    #[test]
    fn skill_switch_changes_board_and_size() {
        let mut w = World::new(&test_config());
        w.set_skill(Skill::Omg);
        assert_eq!(w.ctx.score.board_name(), "OMG!");
        w.start_game();
        assert_eq!(w.ctx.maze.width(), Skill::Omg.maze_size());
    }

    #[test]
    fn commit_name_defaults_blank_to_anonymous() {
        let mut w = World::new(&test_config());
        w.start_game();
        w.phase = Phase::EnterName;
        w.name_entry = "   ".into();
        w.commit_name();
        assert_eq!(w.phase, Phase::GameOver);
        let idx = w.ctx.score.current_index();
        assert_eq!(w.ctx.score.entries()[idx].name, "Anonymous");
    }
}
