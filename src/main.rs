/// Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use sim::event::GameEvent;
use sim::field::FIELD_SIZE;
use sim::level;
use sim::session::{Phase, Session};
use ui::input::{Command, InputState};
use ui::renderer::Renderer;
use ui::sound::{pan_for, SoundEngine};

/// Written to the working directory by the save key.
const SNAPSHOT_FILE: &str = "tilefall-snapshot.lvl";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = GameConfig::load();

    // Level files from the command line, else everything in levels_dir.
    let mut paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if paths.is_empty() {
        paths = level::scan_levels(&config.levels_dir);
    }
    if paths.is_empty() {
        tracing::warn!(dir = %config.levels_dir.display(), "no level files, using the built-in level");
    }

    let mut session = Session::new(paths, config.engine.clone());
    let mut renderer = Renderer::new();
    renderer.init().context("terminal init failed")?;

    let sound = SoundEngine::new();
    let result = game_loop(&mut session, &mut renderer, sound.as_ref(), &config);

    renderer.cleanup().context("terminal cleanup failed")?;
    result?;

    println!();
    println!("Thanks for playing Tilefall!");
    println!("Final Score: {}", session.score);
    Ok(())
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> anyhow::Result<()> {
    let mut kb = InputState::new();
    let frame = Duration::from_millis(config.frame_ms);
    let mut last_tick = Instant::now();

    loop {
        kb.drain_events();
        if kb.ctrl_c_pressed() {
            break;
        }
        for &cmd in kb.commands() {
            if handle_command(session, cmd) {
                return Ok(());
            }
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last_tick).as_millis().min(i32::MAX as u128) as i32;
        last_tick = now;

        let before = session.phase;
        let events = session.update(elapsed);
        play_events(sound, &events, session);
        if let Some(sfx) = sound {
            match (before, session.phase) {
                (Phase::Playing, Phase::Won) => sfx.play_clear(),
                (Phase::Playing, Phase::Clearing) => sfx.play_lose(),
                _ => {}
            }
        }

        renderer.add_effects(&events, &session.field.cfg);
        renderer.tick_effects(elapsed);
        renderer.render(session)?;

        if let Some(rest) = frame.checked_sub(last_tick.elapsed()) {
            std::thread::sleep(rest);
        }
    }
    Ok(())
}

/// Apply one player command. Returns true to quit.
fn handle_command(session: &mut Session, cmd: Command) -> bool {
    match cmd {
        Command::Quit => return true,
        Command::Move { dx, dy } => {
            if session.cursor.lock {
                if dx != 0 {
                    session.push(dx);
                }
            } else {
                session.move_cursor(dx, dy);
            }
        }
        Command::Grab => session.toggle_grab(),
        Command::Restart => session.restart(),
        Command::NextLevel => {
            if matches!(session.phase, Phase::Won | Phase::Stuck | Phase::Playing) {
                session.next_level();
            }
        }
        Command::SaveSnapshot => match session.save_snapshot(Path::new(SNAPSHOT_FILE)) {
            Ok(()) => session.set_message(&format!("Saved {SNAPSHOT_FILE}")),
            Err(e) => {
                tracing::warn!("snapshot failed: {e}");
                session.set_message(&format!("Save failed: {e}"));
            }
        },
    }
    false
}

fn play_events(sound: Option<&SoundEngine>, events: &[GameEvent], session: &Session) {
    let Some(sfx) = sound else {
        return;
    };
    let cfg = &session.field.cfg;
    let width = FIELD_SIZE * cfg.tile_size;
    for ev in events {
        if let GameEvent::Sound { cue, px } = *ev {
            sfx.play(cue, pan_for(px - cfg.board_offset_x, width));
        }
    }
}
