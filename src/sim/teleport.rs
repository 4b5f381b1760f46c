/// Teleport pass: bricks resting on a teleport entry jump to its exit.

use crate::domain::cursor::Cursor;
use super::event::{EffectPreset, GameEvent, SoundCue};
use super::field::{CellKey, Field, Slot};
use super::switch;

/// Relocate every brick sitting on an enabled teleport entry whose exit is
/// free. Each binding is handled on its own; a disabled one is skipped.
pub fn run_teleports(field: &mut Field, cursor: &mut Cursor, events: &mut Vec<GameEvent>) {
    for i in 0..field.teleports.len() {
        let link = field.teleports[i];
        if !switch::is_enabled(field, link.sx, link.sy) {
            continue;
        }
        let Some(key) = field.brick_at(link.sx, link.sy) else {
            continue;
        };
        if !field.is_empty(link.dx, link.dy) {
            continue;
        }

        burst(field, key, events);

        field.set_slot(link.sx, link.sy, Slot::Empty);
        field.set_slot(link.dx, link.dy, Slot::Cell(key));
        let (px, py) = (field.cfg.pixel_x(link.dx), field.cfg.pixel_y(link.dy));
        let cell = &mut field.cells[key];
        cell.px = px;
        cell.py = py;
        cell.sx = link.dx;
        cell.sy = link.dy;
        cell.dx = link.dx;
        cell.dy = link.dy;

        if cursor.pointer_down {
            cell.cursor_lock = false;
        } else if cursor.lock && cursor.is_on(link.sx, link.sy) {
            cell.cursor_lock = true;
            cursor.follow_pixels(px, py);
            cursor.snap_to(link.dx, link.dy);
        }

        burst(field, key, events);
        events.push(GameEvent::Sound { cue: SoundCue::Teleported, px });
        tracing::trace!(from = ?(link.sx, link.sy), to = ?(link.dx, link.dy), "teleport");
    }
}

fn burst(field: &Field, key: CellKey, events: &mut Vec<GameEvent>) {
    let (px, py) = field.centre_of(&field.cells[key]);
    events.push(GameEvent::Effect { preset: EffectPreset::Color, px, py, count: 60, life: 350 });
    events.push(GameEvent::Effect { preset: EffectPreset::White, px, py, count: 30, life: 200 });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::field::field_from;
    use crate::sim::level::Link;

    fn link(sx: i32, sy: i32, dx: i32, dy: i32) -> Link {
        Link { sx, sy, dx, dy }
    }

    #[test]
    fn brick_jumps_to_free_exit() {
        //  a....
        let mut f = field_from(&["a...."]);
        f.teleports.push(link(0, 0, 4, 0));
        let key = f.cell_at(0, 0).unwrap();
        let mut events = Vec::new();
        run_teleports(&mut f, &mut Cursor::default(), &mut events);

        assert_eq!(f.cell_at(4, 0), Some(key));
        assert_eq!(f.slot(0, 0), Slot::Empty);
        let c = &f.cells[key];
        assert_eq!((c.sx, c.dx, c.px), (4, 4, 80));
        assert_eq!(events.iter().filter(|e| matches!(e, GameEvent::Effect { .. })).count(), 4);
        assert!(events.contains(&GameEvent::Sound { cue: SoundCue::Teleported, px: 80 }));
    }

    #[test]
    fn occupied_exit_blocks() {
        let mut f = field_from(&["a...b"]);
        f.teleports.push(link(0, 0, 4, 0));
        let mut events = Vec::new();
        run_teleports(&mut f, &mut Cursor::default(), &mut events);
        assert!(f.brick_at(0, 0).is_some());
        assert!(events.is_empty());
    }

    #[test]
    fn only_bricks_teleport() {
        let mut f = field_from(&["H...."]);
        f.teleports.push(link(0, 0, 4, 0));
        run_teleports(&mut f, &mut Cursor::default(), &mut Vec::new());
        assert_eq!(f.cell_at(4, 0), None);
    }

    #[test]
    fn disabled_binding_does_not_stop_the_others() {
        //  a.b..
        //  ##0##
        let mut f = field_from(&["a.b..", "##0##"]);
        f.teleports.push(link(0, 0, 1, 0));
        f.teleports.push(link(2, 0, 4, 0));
        f.switches = switch::SwitchBoard::new(vec![link(2, 1, 0, 0)]);
        run_teleports(&mut f, &mut Cursor::default(), &mut Vec::new());
        assert!(f.brick_at(0, 0).is_some(), "switched off");
        assert!(f.brick_at(4, 0).is_some(), "later binding still runs");
    }

    #[test]
    fn locked_cursor_travels_along() {
        let mut f = field_from(&["a...."]);
        f.teleports.push(link(0, 0, 4, 0));
        let mut cursor = Cursor { lock: true, ..Cursor::at(0, 0) };
        run_teleports(&mut f, &mut cursor, &mut Vec::new());
        assert_eq!((cursor.x, cursor.y), (4, 0));
        assert!(f.cells[f.cell_at(4, 0).unwrap()].cursor_lock);
    }

    #[test]
    fn pointer_drag_drops_lock() {
        let mut f = field_from(&["a...."]);
        f.teleports.push(link(0, 0, 4, 0));
        let key = f.cell_at(0, 0).unwrap();
        f.cells[key].cursor_lock = true;
        let mut cursor = Cursor { lock: true, pointer_down: true, ..Cursor::at(0, 0) };
        run_teleports(&mut f, &mut cursor, &mut Vec::new());
        assert!(!f.cells[key].cursor_lock);
        assert_eq!((cursor.x, cursor.y), (0, 0));
    }
}
