/// Board rules: removal of matching bricks, trigger tiles and the tick
/// outcome.
///
/// ## Removal lifecycle
///   1. Queued  : enqueued by a match or a remove trigger; still on the grid
///   2. Dying   : break announced, slot reserved, countdown running
///   3. Finalized: census decremented, slot cleared, cell freed

use crate::domain::cell::Removal;
use crate::domain::tile::TileKind;
use super::event::{EffectPreset, GameEvent, SoundCue, TickOutcome};
use super::field::{CellKey, Field, Reserved, Slot, FIELD_SIZE};
use super::movement::is_falling;

const NEIGHBOURS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

// ── Removal ──

/// Put a brick on the removal list. A brick is enqueued at most once.
pub fn queue_removal(field: &mut Field, key: CellKey) -> bool {
    let Some(cell) = field.cells.get_mut(key) else {
        return false;
    };
    if cell.is_doomed() {
        return false;
    }
    cell.removal = Some(Removal::Queued);
    field.removing.push(key);
    true
}

/// Start the death of the first resting brick in reading order.
/// Used to clear the board after a lost life. False once none are left.
pub fn destroy_next_brick(field: &mut Field, events: &mut Vec<GameEvent>) -> bool {
    for y in 0..FIELD_SIZE {
        for x in 0..FIELD_SIZE {
            let Some(key) = field.brick_at(x, y) else {
                continue;
            };
            if !field.cells[key].is_doomed() {
                field.removing.push(key);
            }
            announce_death(field, key, events);
            return true;
        }
    }
    false
}

fn announce_death(field: &mut Field, key: CellKey, events: &mut Vec<GameEvent>) {
    let die_ticks = field.die_ticks;
    let cell = &mut field.cells[key];
    cell.removal = Some(Removal::Dying { remaining: die_ticks });
    let (x, y, px) = (cell.dx, cell.dy, cell.px);
    field.set_slot(x, y, Slot::Reserved(Reserved::Source));
    events.push(GameEvent::Sound { cue: SoundCue::BrickBreak, px });
}

// ── Triggers ──

/// Copy trigger: clone the brick resting on top into the slot below.
/// Ignores the census; copies are always allowed when there is room.
pub fn copy_trigger(field: &mut Field, x: i32, y: i32, elapsed: i32, events: &mut Vec<GameEvent>) {
    let (Some(trigger), Some(above)) = (field.cell_at(x, y), field.brick_at(x, y - 1)) else {
        return;
    };
    if field.cells[trigger].cooldown >= 1 {
        field.cells[trigger].cooldown -= elapsed;
        return;
    }
    field.cells[trigger].cooldown = field.cfg.copy_delay;

    let (kind, src_px) = (field.cells[above].kind, field.cells[above].px);
    let src_centre = field.centre_of(&field.cells[above]);
    if y + 1 < FIELD_SIZE && field.is_empty(x, y + 1) {
        let copy = field.create_cell(x, y + 1, kind);
        let copy_centre = field.centre_of(&field.cells[copy]);
        events.push(GameEvent::Sound { cue: SoundCue::BrickCopy, px: src_px });
        for (px, py) in [src_centre, copy_centre] {
            events.push(GameEvent::Effect { preset: EffectPreset::Color, px, py, count: 30, life: 300 });
        }
    } else {
        let (px, py) = src_centre;
        events.push(GameEvent::Sound { cue: SoundCue::BrickCopyDenied, px: src_px });
        events.push(GameEvent::Effect { preset: EffectPreset::Black, px, py, count: 30, life: 250 });
    }
}

/// Swap trigger: turn the brick on top into the next variant still present
/// on the board. Refused unless more than two of its variant remain.
pub fn swap_trigger(field: &mut Field, x: i32, y: i32, elapsed: i32, events: &mut Vec<GameEvent>) {
    let (Some(trigger), Some(above)) = (field.cell_at(x, y), field.brick_at(x, y - 1)) else {
        return;
    };
    if field.cells[trigger].cooldown >= 1 {
        field.cells[trigger].cooldown -= elapsed;
        return;
    }
    field.cells[trigger].cooldown = field.cfg.swap_delay;

    let Some(v) = field.cells[above].kind.brick_variant() else {
        return;
    };
    let px = field.cells[above].px;
    let (cx, cy) = field.centre_of(&field.cells[above]);

    let mut changed = false;
    if field.census[v as usize] > 2 {
        field.census[v as usize] -= 1;
        let mut next = TileKind::next_variant(v);
        while field.census[next as usize] == 0 {
            next = TileKind::next_variant(next);
        }
        field.census[next as usize] += 1;
        field.cells[above].kind = TileKind::Brick(next);
        changed = next != v;
    }

    if changed {
        events.push(GameEvent::Sound { cue: SoundCue::BrickSwap, px });
        events.push(GameEvent::Effect { preset: EffectPreset::Color, px: cx, py: cy, count: 60, life: 350 });
    } else {
        events.push(GameEvent::Sound { cue: SoundCue::BrickSwapDenied, px });
        events.push(GameEvent::Effect { preset: EffectPreset::Black, px: cx, py: cy, count: 30, life: 200 });
    }
}

// ── Evaluation ──

/// Post-simulation pass: match detection, evil triggers, removal
/// countdowns and the outcome of the tick.
pub fn evaluate_board(field: &mut Field, elapsed: i32, events: &mut Vec<GameEvent>) -> TickOutcome {
    let mut bricks_left = field.moving.iter().filter(|&&k| field.cells[k].is_brick()).count();
    let mut removed = 0u32;

    for y in (0..FIELD_SIZE).rev() {
        for x in 0..FIELD_SIZE {
            let Some(key) = field.cell_at(x, y) else {
                continue;
            };
            let (kind, active) = (field.cells[key].kind, field.cells[key].active);

            if kind.is_brick() {
                bricks_left += 1;
                if is_falling(field, key) || field.on_top_of_reserved(x, y) {
                    continue;
                }
                let matched = NEIGHBOURS.iter().any(|&(ox, oy)| {
                    field.cell_at(x + ox, y + oy).map_or(false, |n| {
                        field.cells[n].kind == kind && !is_falling(field, n)
                    })
                });
                if matched {
                    queue_removal(field, key);
                }
            } else if kind == TileKind::EvilTrigger && active && field.brick_at(x, y - 1).is_some() {
                tracing::debug!(x, y, "brick touched evil trigger");
                return TickOutcome::LifeLost;
            }
        }
    }

    let mut i = 0;
    while i < field.removing.len() {
        bricks_left += 1;
        let key = field.removing[i];
        let Some(cell) = field.cells.get_mut(key) else {
            field.removing.remove(i);
            continue;
        };
        if matches!(cell.removal, Some(Removal::Dying { .. })) {
            let done = cell.removal.as_mut().map_or(false, |r| r.tick(elapsed));
            if done {
                finalize(field, key);
                field.removing.remove(i);
                removed += 1;
                continue;
            }
        } else {
            announce_death(field, key, events);
        }
        i += 1;
    }

    if removed == 0
        && field.removing.is_empty()
        && field.moving.is_empty()
        && field.census.iter().any(|&n| n == 1)
    {
        return TickOutcome::Unsolvable;
    }
    if removed > 0 {
        return TickOutcome::Removed(removed);
    }
    if bricks_left == 0 {
        return TickOutcome::NoBricksLeft;
    }
    TickOutcome::Continue
}

fn finalize(field: &mut Field, key: CellKey) {
    let Some(cell) = field.destroy_cell(key) else {
        return;
    };
    if let Some(v) = cell.kind.brick_variant() {
        field.census[v as usize] = field.census[v as usize].saturating_sub(1);
    }
    if field.slot(cell.dx, cell.dy) == Slot::Reserved(Reserved::Source) {
        field.set_slot(cell.dx, cell.dy, Slot::Empty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::field::{field_from, field_from_bottom};

    fn settle(f: &mut Field, elapsed: i32) -> TickOutcome {
        evaluate_board(f, elapsed, &mut Vec::new())
    }

    #[test]
    fn pair_on_floor_is_queued_then_dies() {
        //  aa
        //  ##
        let mut f = field_from(&["aa", "##"]);
        let die = f.die_ticks;
        let mut events = Vec::new();

        assert_eq!(evaluate_board(&mut f, 1, &mut events), TickOutcome::Continue);
        assert_eq!(f.removing.len(), 2);
        assert_eq!(events.iter().filter(|e| matches!(e, GameEvent::Sound { cue: SoundCue::BrickBreak, .. })).count(), 2);
        assert!(f.is_reserved(0, 0) && f.is_reserved(1, 0));
        assert_eq!(f.census[0], 2, "census drops only when the animation ends");

        assert_eq!(settle(&mut f, die - 1), TickOutcome::Continue);
        assert_eq!(settle(&mut f, 1), TickOutcome::Removed(2));
        assert_eq!(f.census[0], 0);
        assert_eq!(f.slot(0, 0), Slot::Empty);
        assert_eq!(f.cells.len(), 2, "walls remain");
        assert_eq!(settle(&mut f, 1), TickOutcome::NoBricksLeft);
    }

    #[test]
    fn stacked_pair_is_queued_in_one_pass() {
        //  a.
        //  a.
        //  ##
        // The lower brick's slot is still a cell while the scan climbs, so
        // the brick on top of it matches in the same call.
        let mut f = field_from(&["a.", "a.", "##"]);
        let lower = f.cell_at(0, 1).unwrap();
        let upper = f.cell_at(0, 0).unwrap();

        assert_eq!(settle(&mut f, 1), TickOutcome::Continue);
        assert_eq!(f.removing, vec![lower, upper]);
        assert!(f.cells[lower].is_doomed() && f.cells[upper].is_doomed());
        assert!(f.is_reserved(0, 0) && f.is_reserved(0, 1));
    }

    #[test]
    fn enqueue_order_follows_scan() {
        //  .b.
        //  .a.
        //  ba#
        //  ###
        let mut f = field_from(&[".b.", ".a.", "ba#", "###"]);
        let lower = f.cell_at(1, 2).unwrap();
        let upper = f.cell_at(1, 1).unwrap();
        settle(&mut f, 1);
        assert_eq!(f.removing, vec![lower, upper]);
    }

    #[test]
    fn brick_on_dying_brick_is_not_eligible() {
        //  a.
        //  b#
        //  ##
        let mut f = field_from(&["a.", "b#", "##"]);
        let top = f.cell_at(0, 0).unwrap();
        let under = f.cell_at(0, 1).unwrap();
        queue_removal(&mut f, under);
        settle(&mut f, 1);
        assert!(f.is_reserved(0, 1));

        // A matching neighbour arrives; the brick on the dying slot stays put.
        f.create_cell(1, 0, TileKind::Brick(0));
        settle(&mut f, 1);
        assert!(f.removing.contains(&under));
        assert!(!f.cells[top].is_doomed());
    }

    #[test]
    fn single_brick_is_unsolvable() {
        //  a
        //  #
        let mut f = field_from(&["a", "#"]);
        assert_eq!(settle(&mut f, 1), TickOutcome::Unsolvable);
    }

    #[test]
    fn evil_trigger_costs_a_life_without_removals() {
        //  aa
        //  E#
        let mut f = field_from(&["aa", "E#"]);
        assert_eq!(settle(&mut f, 1), TickOutcome::LifeLost);
        assert!(f.removing.is_empty());
        assert_eq!(f.census[0], 2);
    }

    #[test]
    fn inactive_evil_trigger_is_harmless() {
        let mut f = field_from(&["ab", "E#"]);
        let evil = f.cell_at(0, 1).unwrap();
        f.cells[evil].active = false;
        assert_eq!(settle(&mut f, 1), TickOutcome::Unsolvable);
    }

    #[test]
    fn falling_brick_does_not_match() {
        //  aa
        //  .#
        let mut f = field_from(&["aa", ".#"]);
        settle(&mut f, 1);
        assert!(f.removing.is_empty());
    }

    #[test]
    fn empty_board_is_won() {
        let mut f = field_from(&["##"]);
        assert_eq!(settle(&mut f, 1), TickOutcome::NoBricksLeft);
    }

    #[test]
    fn destroy_next_brick_in_reading_order() {
        //  .a
        //  b#
        //  ##
        let mut f = field_from(&[".a", "b#", "##"]);
        let first = f.cell_at(1, 0).unwrap();
        let mut events = Vec::new();
        assert!(destroy_next_brick(&mut f, &mut events));
        assert_eq!(f.removing, vec![first]);
        assert!(f.is_reserved(1, 0));
        assert!(destroy_next_brick(&mut f, &mut events));
        assert!(!destroy_next_brick(&mut f, &mut events));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn copy_trigger_duplicates_and_ignores_census() {
        //  a
        //  C
        //  .
        let mut f = field_from(&["a", "C"]);
        let mut events = Vec::new();
        copy_trigger(&mut f, 0, 1, 16, &mut events);
        assert_eq!(f.kind_at(0, 2), Some(TileKind::Brick(0)));
        assert_eq!(f.census[0], 2);
        assert_eq!(events[0], GameEvent::Sound { cue: SoundCue::BrickCopy, px: 0 });
        assert_eq!(f.cell_ref_at(0, 1).unwrap().cooldown, f.cfg.copy_delay);

        copy_trigger(&mut f, 0, 1, 16, &mut events);
        assert_eq!(f.census[0], 2, "cooling down");
    }

    #[test]
    fn copy_trigger_denied_when_blocked() {
        let mut f = field_from(&["a", "C", "#"]);
        let mut events = Vec::new();
        copy_trigger(&mut f, 0, 1, 16, &mut events);
        assert_eq!(events[0], GameEvent::Sound { cue: SoundCue::BrickCopyDenied, px: 0 });

        let mut f = field_from_bottom(&["a", "C"]);
        events.clear();
        copy_trigger(&mut f, 0, FIELD_SIZE - 1, 16, &mut events);
        assert_eq!(events[0], GameEvent::Sound { cue: SoundCue::BrickCopyDenied, px: 0 });
    }

    #[test]
    fn swap_needs_more_than_two() {
        //  a.ab
        //  S.#.
        let mut f = field_from(&["a.ab", "S.#."]);
        let mut events = Vec::new();
        swap_trigger(&mut f, 0, 1, 16, &mut events);
        assert_eq!(f.kind_at(0, 0), Some(TileKind::Brick(0)));
        assert_eq!(f.census[0], 2);
        assert_eq!(events[0], GameEvent::Sound { cue: SoundCue::BrickSwapDenied, px: 0 });
    }

    #[test]
    fn swap_skips_missing_variants() {
        //  a.a.a.c
        //  S
        let mut f = field_from(&["a.a.a.c", "S"]);
        let mut events = Vec::new();
        swap_trigger(&mut f, 0, 1, 16, &mut events);
        assert_eq!(f.kind_at(0, 0), Some(TileKind::Brick(2)));
        assert_eq!((f.census[0], f.census[2]), (2, 2));
        assert_eq!(events[0], GameEvent::Sound { cue: SoundCue::BrickSwap, px: 0 });
    }
}
