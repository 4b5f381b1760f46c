/// Keyboard input.
///
/// Turns crossterm key events into player commands. Cursor keys repeat at
/// the terminal's key-repeat rate; everything else fires once per press.
///
/// Release events are ignored. Terminals without keyboard enhancement never
/// send them, and nothing here needs to know when a key goes up.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    /// Cursor move, or a push of the held brick (horizontal only).
    Move { dx: i32, dy: i32 },
    Grab,
    Restart,
    NextLevel,
    SaveSnapshot,
    Quit,
}

pub struct InputState {
    /// Commands collected during the most recent drain_events() call.
    commands: Vec<Command>,
    /// Raw key events collected during drain, for meta-key handling.
    pub raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            commands: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events. Call once per frame, before the
    /// simulation tick.
    pub fn drain_events(&mut self) {
        self.commands.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                if let Some(cmd) = command_for(&key) {
                    self.commands.push(cmd);
                }
            }
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(is_ctrl_c)
    }
}

fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL)
        && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
}

/// Key binding table.
pub fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if is_ctrl_c(key) {
        return Some(Command::Quit);
    }
    let repeat = key.kind == KeyEventKind::Repeat;

    let cmd = match key.code {
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('h') => Command::Move { dx: -1, dy: 0 },
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('l') => Command::Move { dx: 1, dy: 0 },
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('k') => Command::Move { dx: 0, dy: -1 },
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('j') => Command::Move { dx: 0, dy: 1 },
        _ if repeat => return None,
        KeyCode::Char(' ') | KeyCode::Enter => Command::Grab,
        KeyCode::Char('r') | KeyCode::Char('R') => Command::Restart,
        KeyCode::Char('n') | KeyCode::Char('N') => Command::NextLevel,
        KeyCode::F(2) => Command::SaveSnapshot,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Command::Quit,
        _ => return None,
    };
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    #[test]
    fn arrows_and_vi_keys_move() {
        let press = KeyEventKind::Press;
        assert_eq!(command_for(&key(KeyCode::Left, press)), Some(Command::Move { dx: -1, dy: 0 }));
        assert_eq!(command_for(&key(KeyCode::Char('j'), press)), Some(Command::Move { dx: 0, dy: 1 }));
    }

    #[test]
    fn only_movement_repeats() {
        let rep = KeyEventKind::Repeat;
        assert_eq!(command_for(&key(KeyCode::Up, rep)), Some(Command::Move { dx: 0, dy: -1 }));
        assert_eq!(command_for(&key(KeyCode::Char(' '), rep)), None);
        assert_eq!(command_for(&key(KeyCode::Char('r'), rep)), None);
    }

    #[test]
    fn releases_are_ignored() {
        assert_eq!(command_for(&key(KeyCode::Right, KeyEventKind::Release)), None);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut k = key(KeyCode::Char('c'), KeyEventKind::Press);
        k.modifiers = KeyModifiers::CONTROL;
        assert_eq!(command_for(&k), Some(Command::Quit));
        assert_eq!(command_for(&key(KeyCode::Char('c'), KeyEventKind::Press)), None);
    }
}
