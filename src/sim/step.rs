/// The step function: advances the field by one tick.
///
/// Processing order:
///   1. Move list (slide and commit)
///   2. Teleports
///   3. Static scan, bottom row first: gravity, magnet, movers, one-way
///      floors, remove/copy/swap triggers
///   4. Switch update, then lifted walls put back
///   5. Cleanup: clear scan marks, apply queued cursor pushes
///   6. Board evaluation: matches, evil triggers, removals, outcome
///
/// `elapsed` is the game time since the previous call. Movement speeds are
/// per call; mover, trigger and death countdowns consume `elapsed`.

use crate::domain::cursor::Cursor;
use crate::domain::tile::TileKind;
use super::event::{GameEvent, SoundCue, TickReport};
use super::field::{CellKey, Field, Slot, FIELD_SIZE};
use super::movement::{self, BlockPolicy};
use super::{rules, switch, teleport};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(field: &mut Field, cursor: &mut Cursor, elapsed: i32) -> TickReport {
    let elapsed = elapsed.max(0);
    let mut events = Vec::new();

    sim_field(field, cursor, elapsed, &mut events);
    let outcome = rules::evaluate_board(field, elapsed, &mut events);

    TickReport { outcome, events }
}

/// Steps 1-5: everything but the evaluation.
pub fn sim_field(field: &mut Field, cursor: &mut Cursor, elapsed: i32, events: &mut Vec<GameEvent>) {
    movement::process_move_list(field, cursor);
    teleport::run_teleports(field, cursor, events);
    static_scan(field, cursor, elapsed, events);
    switch::update(field, events);
    switch::put_back(field);
    cleanup(field);
}

// ══════════════════════════════════════════════════════════════
// Static scan
// ══════════════════════════════════════════════════════════════

fn static_scan(field: &mut Field, cursor: &Cursor, elapsed: i32, events: &mut Vec<GameEvent>) {
    for y in (0..FIELD_SIZE).rev() {
        for x in 0..FIELD_SIZE {
            let Some(key) = field.cell_at(x, y) else {
                continue;
            };
            if field.cells[key].checked {
                continue;
            }
            field.cells[key].checked = true;

            let (kind, active) = (field.cells[key].kind, field.cells[key].active);
            match kind {
                TileKind::Brick(_) => resolve_brick(field, cursor, key, x, y),
                TileKind::MoverHorizontal | TileKind::MoverVertical if active => {
                    resolve_mover(field, key, x, y, elapsed);
                }
                TileKind::OneWayLeft | TileKind::OneWayRight if active => {
                    resolve_one_way(field, kind, x, y, events);
                }
                TileKind::RemoveTrigger | TileKind::CopyTrigger | TileKind::SwapTrigger if active => {
                    resolve_trigger(field, kind, x, y, elapsed, events);
                }
                // Evil contact is settled by rules::evaluate_board at the end of the tick.
                _ => {}
            }
        }
    }
}

// ── Gravity and magnet ──

fn resolve_brick(field: &mut Field, cursor: &Cursor, key: CellKey, x: i32, y: i32) {
    field.cells[key].cursor_lock = cursor.lock && cursor.is_on(x, y);
    if y + 1 >= FIELD_SIZE {
        return;
    }
    match field.slot(x, y + 1) {
        Slot::Empty => {
            let speed = field.cfg.falling_speed;
            movement::request_move(field, x, y, 0, 1, BlockPolicy::Strict, speed);
        }
        Slot::Reserved(_) => movement::attach_to_mover(field, x, y),
        Slot::Cell(_) => {}
    }
}

// ── Movers ──

fn resolve_mover(field: &mut Field, key: CellKey, x: i32, y: i32, elapsed: i32) {
    let (kind, heading) = (field.cells[key].kind, field.cells[key].heading);
    let moved = if kind == TileKind::MoverHorizontal {
        movement::horizontal_mover(field, x, y, heading)
    } else if heading < 0 {
        movement::vertical_mover(field, x, y, -1)
    } else {
        let stack = movement::bricks_on_top(field, x, y);
        movement::vertical_mover(field, x, y - stack, 1)
    };

    if !moved {
        let countdown = field.cfg.mover_countdown;
        field.cells[key].mover_blocked(elapsed, countdown);
    }
}

// ── One-way floors ──

fn resolve_one_way(field: &mut Field, kind: TileKind, x: i32, y: i32, events: &mut Vec<GameEvent>) {
    let Some(dir) = kind.one_way_dir() else {
        return;
    };
    if y == 0 || field.brick_at(x, y - 1).is_none() {
        return;
    }
    let speed = field.cfg.one_way_speed;
    if movement::request_move(field, x, y - 1, dir, 0, BlockPolicy::Strict, speed) {
        events.push(GameEvent::Sound { cue: SoundCue::OneWaySlide, px: field.cfg.pixel_x(x) });
    }
}

// ── Remove / copy / swap ──

fn resolve_trigger(
    field: &mut Field,
    kind: TileKind,
    x: i32,
    y: i32,
    elapsed: i32,
    events: &mut Vec<GameEvent>,
) {
    if y == 0 {
        return;
    }
    let Some(above) = field.brick_at(x, y - 1) else {
        return;
    };
    if movement::is_falling(field, above) {
        return;
    }
    match kind {
        TileKind::RemoveTrigger => {
            rules::queue_removal(field, above);
        }
        TileKind::CopyTrigger => rules::copy_trigger(field, x, y, elapsed, events),
        TileKind::SwapTrigger => rules::swap_trigger(field, x, y, elapsed, events),
        _ => {}
    }
}

// ══════════════════════════════════════════════════════════════
// Cleanup
// ══════════════════════════════════════════════════════════════

fn cleanup(field: &mut Field) {
    for y in (0..FIELD_SIZE).rev() {
        for x in 0..FIELD_SIZE {
            let Some(key) = field.cell_at(x, y) else {
                continue;
            };
            let cell = &mut field.cells[key];
            cell.checked = false;
            if cell.is_brick() && cell.nudge != 0 {
                let dir = cell.nudge;
                movement::cursor_move(field, key, dir);
                field.cells[key].nudge = 0;
            }
        }
    }
}
