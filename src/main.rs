/// Entry point and outer loop.
///
/// The loop is single-threaded and cooperative: drain input, run the
/// in-game scheduler (gated by phase and the pausable stopwatch), run
/// the always-on scheduler, forward events to the sound engine, render
/// with the interpolation fraction, sleep a few milliseconds. A tick in
/// flight always completes; the loop exits only between frames.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::Duration;

use crossterm::event::KeyCode;

use config::GameConfig;
use domain::cell::{CellMask, WALL_DOWN, WALL_LEFT, WALL_RIGHT, WALL_UP};
use sim::event::GameEvent;
use sim::scheduler::{PausableClock, StepScheduler};
use sim::world::{Phase, Skill, World};
use ui::input::InputState;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

const MAX_NAME_LEN: usize = 16;

fn main() {
    env_logger::init();

    let mut config = GameConfig::load();
    let mut world = World::new(&config);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = if config.sound { SoundEngine::new() } else { None };

    let result = game_loop(&mut world, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    // Persist the pieces that should survive a restart.
    config.skill = world.ctx.skill.name().to_string();
    if !world.name_entry.trim().is_empty() {
        config.player_name = world.name_entry.trim().to_string();
    }
    if let Err(e) = config.save() {
        log::warn!("{e}");
    }
    if let Err(e) = world.ctx.score.save() {
        eprintln!("{e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Maze Chase!");
    println!("Final Score: {}", world.ctx.score.current_score());
}

fn game_loop(
    world: &mut World,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();

    let step = config.speed.step_ms as f32 / 1000.0;
    let main_clock = PausableClock::new();
    let mut game_clock = PausableClock::new();
    let mut sched_other = StepScheduler::new(step, config.speed.max_catch_up);
    let mut sched_game = StepScheduler::new(step, config.speed.max_catch_up);

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(world, &kb, &mut game_clock, &mut sched_game) {
            break;
        }

        if world.phase == Phase::Playing {
            world.ctx.hero.directions = held_directions(&kb);
            world.ctx.hero.do_trace = kb.any_held(KEYS_TRACE);

            let now = game_clock.time();
            let now_ms = (now * 1000.0) as u32;
            sched_game.advance(now, || world.game_tick(now_ms));
        }

        sched_other.advance(main_clock.time(), || world.other_tick());

        process_sound_events(sound, &world.drain_events());

        renderer.render(world, sched_game.fraction(), game_clock.is_paused())?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for event in events {
        match event {
            GameEvent::PickupTaken { .. } => sfx.play_pickup(),
            GameEvent::PowerupTaken { .. } => sfx.play_powerup(),
            GameEvent::ProwlerEaten => sfx.play_eaten(),
            GameEvent::HeroDied => sfx.play_died(),
            GameEvent::LevelCleared => sfx.play_cleared(),
            GameEvent::GameStarted => sfx.play_start(),
        }
    }
}

// ── Key constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_TRACE: &[KeyCode] = &[KeyCode::Char(' ')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

/// Held movement keys as a wall-bit direction set.
fn held_directions(kb: &InputState) -> CellMask {
    let mut dirs = 0;
    if kb.any_held(KEYS_UP) {
        dirs |= WALL_UP;
    }
    if kb.any_held(KEYS_DOWN) {
        dirs |= WALL_DOWN;
    }
    if kb.any_held(KEYS_LEFT) {
        dirs |= WALL_LEFT;
    }
    if kb.any_held(KEYS_RIGHT) {
        dirs |= WALL_RIGHT;
    }
    dirs
}

/// Phase transitions and meta keys. Returns true to quit.
fn handle_meta(
    world: &mut World,
    kb: &InputState,
    game_clock: &mut PausableClock,
    sched_game: &mut StepScheduler,
) -> bool {
    let confirm = kb.any_pressed(KEYS_CONFIRM);
    let esc = kb.was_pressed(KeyCode::Esc);

    match world.phase {
        // ── Title ──
        Phase::Title => {
            for (i, s) in Skill::ALL.into_iter().enumerate() {
                let key = KeyCode::Char((b'1' + i as u8) as char);
                if kb.was_pressed(key) {
                    world.set_skill(s);
                }
            }
            if confirm {
                world.start_game();
                game_clock.reset();
                sched_game.align(0.0);
            } else if esc || kb.any_pressed(KEYS_QUIT) {
                return true;
            }
        }

        // ── Playing ──
        Phase::Playing => {
            if kb.any_pressed(KEYS_PAUSE) {
                // Pausing freezes the stopwatch itself, so the game
                // scheduler resumes in phase with no catch-up burst.
                if game_clock.is_paused() {
                    game_clock.resume();
                } else {
                    game_clock.pause();
                }
            }
            if esc {
                game_clock.resume();
                world.phase = Phase::Title;
            }
        }

        // ── Game over ──
        Phase::GameOver => {
            if confirm || esc {
                world.phase = Phase::Title;
            }
        }

        // ── Name entry for a top-ten run ──
        Phase::EnterName => {
            for c in kb.typed_chars() {
                if world.name_entry.chars().count() < MAX_NAME_LEN
                    && (c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
                {
                    world.name_entry.push(c);
                }
            }
            if kb.was_pressed(KeyCode::Backspace) {
                world.name_entry.pop();
            }
            if confirm {
                world.commit_name();
            }
        }
    }

    false
}
