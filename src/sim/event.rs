/// Events emitted during a simulation tick.
/// The presentation layer consumes these for sound effects.

#[derive(Clone, Copy, Debug)]
#[allow(dead_code)]
pub enum GameEvent {
    PickupTaken { x: i32, y: i32 },
    PowerupTaken { x: i32, y: i32 },
    ProwlerEaten,
    HeroDied,
    LevelCleared,
    GameStarted,
}
