/// Switches: level links from a switch tile to a target slot.
///
/// A switch toggles when a brick comes to rest on top of it. Targets follow
/// the switch state through their `active` flag. An inactive wall is lifted
/// off the grid entirely and put back once its slot is free again.

use crate::domain::tile::TileKind;
use super::event::{GameEvent, SoundCue};
use super::field::{CellKey, Field, Slot};
use super::level::Link;
use super::movement::is_falling;

#[derive(Clone, Debug, Default)]
pub struct SwitchBoard {
    pub links: Vec<Link>,
    /// Switch slots that had a brick resting on them at the last update.
    pressed: Vec<(i32, i32)>,
}

impl SwitchBoard {
    pub fn new(links: Vec<Link>) -> Self {
        SwitchBoard { links, pressed: Vec::new() }
    }

    fn switch_slots(&self) -> Vec<(i32, i32)> {
        let mut slots: Vec<(i32, i32)> = Vec::new();
        for l in &self.links {
            if !slots.contains(&(l.sx, l.sy)) {
                slots.push((l.sx, l.sy));
            }
        }
        slots
    }
}

/// False iff some switch bound to (x, y) is off.
pub fn is_enabled(field: &Field, x: i32, y: i32) -> bool {
    field.switches.links.iter()
        .filter(|l| l.dx == x && l.dy == y)
        .all(|l| field.kind_at(l.sx, l.sy) != Some(TileKind::SwitchOff))
}

/// Initial pass at load: push switch state onto every target.
pub fn set_targets(field: &mut Field) {
    field.switches.pressed = field.switches.switch_slots()
        .into_iter()
        .filter(|&(sx, sy)| pressed_now(field, sx, sy))
        .collect();
    apply_links(field);
}

/// Per-tick pass: toggle newly pressed switches, then update targets.
pub fn update(field: &mut Field, events: &mut Vec<GameEvent>) {
    for (sx, sy) in field.switches.switch_slots() {
        let Some(key) = field.cell_at(sx, sy).filter(|&k| field.cells[k].kind.is_switch()) else {
            continue;
        };
        let now = pressed_now(field, sx, sy);
        let was = field.switches.pressed.contains(&(sx, sy));

        if now && !was {
            field.switches.pressed.push((sx, sy));
            if field.cells[key].active {
                toggle(field, key, events);
            }
        } else if !now && was {
            field.switches.pressed.retain(|&p| p != (sx, sy));
        }
    }
    apply_links(field);
}

/// Put lifted walls back once they are active and their slot is free.
pub fn put_back(field: &mut Field) {
    let mut restored = false;
    let mut i = 0;
    while i < field.deactivated.len() {
        let key = field.deactivated[i];
        let (active, x, y) = {
            let c = &field.cells[key];
            (c.active, c.dx, c.dy)
        };
        if active && field.is_empty(x, y) {
            field.set_slot(x, y, Slot::Cell(key));
            field.deactivated.remove(i);
            restored = true;
        } else {
            i += 1;
        }
    }
    if restored {
        field.classify_static_edges();
    }
}

fn pressed_now(field: &Field, sx: i32, sy: i32) -> bool {
    field.brick_at(sx, sy - 1).map_or(false, |b| !is_falling(field, b))
}

fn toggle(field: &mut Field, key: CellKey, events: &mut Vec<GameEvent>) {
    let cell = &mut field.cells[key];
    let cue = if cell.kind == TileKind::SwitchOn {
        cell.kind = TileKind::SwitchOff;
        SoundCue::SwitchOff
    } else {
        cell.kind = TileKind::SwitchOn;
        SoundCue::SwitchOn
    };
    events.push(GameEvent::Sound { cue, px: cell.px });
    tracing::debug!(x = cell.sx, y = cell.sy, ?cue, "switch toggled");
}

fn apply_links(field: &mut Field) {
    let mut lifted = false;
    for i in 0..field.switches.links.len() {
        let link = field.switches.links[i];
        let on = match field.kind_at(link.sx, link.sy) {
            Some(TileKind::SwitchOn) => true,
            Some(TileKind::SwitchOff) => false,
            _ => continue,
        };

        let parked = field.deactivated.iter().copied().find(|&k| {
            let c = &field.cells[k];
            c.dx == link.dx && c.dy == link.dy
        });
        if let Some(key) = parked {
            field.cells[key].active = on;
            continue;
        }

        let Some(key) = field.cell_at(link.dx, link.dy) else {
            continue;
        };
        let cell = &mut field.cells[key];
        if cell.is_brick() {
            continue;
        }
        cell.active = on;
        if !on && cell.kind == TileKind::Wall {
            field.set_slot(link.dx, link.dy, Slot::Empty);
            field.deactivated.push(key);
            lifted = true;
        }
    }
    if lifted {
        field.classify_static_edges();
    }
}
