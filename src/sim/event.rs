/// Events emitted during a simulation tick.
/// The presentation layer consumes these for particles and sound.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SoundCue {
    BrickBreak,
    OneWaySlide,
    Teleported,
    BrickCopy,
    BrickCopyDenied,
    BrickSwap,
    BrickSwapDenied,
    SwitchOn,
    SwitchOff,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EffectPreset {
    Color,
    White,
    Black,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// `px` is the horizontal pixel position, for stereo panning.
    Sound { cue: SoundCue, px: i32 },
    /// Particle burst centred on a pixel position.
    Effect { preset: EffectPreset, px: i32, py: i32, count: u32, life: u32 },
}

/// Result of one tick, highest priority first.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TickOutcome {
    /// A matchable brick touched an active evil trigger.
    LifeLost,
    /// Bricks finished their death animation this tick.
    Removed(u32),
    /// Board is empty: the level is won.
    NoBricksLeft,
    /// Board is settled and some variant has exactly one brick left.
    Unsolvable,
    Continue,
}

#[derive(Clone, Debug)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub events: Vec<GameEvent>,
}
