/// Moving cells between slots.
///
/// A move reserves both ends of the trip: the source slot becomes
/// `Reserved::Source`, the destination `Reserved::Destination`, and the cell
/// lives on the move list. Each tick `process_move_list` advances pixel
/// positions; once a cell has arrived it commits on the following call.
///
/// Movers, magnet attachment and cursor pushes are all built on
/// `request_move`.

use crate::domain::cursor::Cursor;
use crate::domain::tile::TileKind;
use super::field::{CellKey, Field, Reserved, Slot, FIELD_SIZE};

/// What a destination slot may hold for a move to be accepted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockPolicy {
    /// Destination must be empty.
    Strict,
    /// Destination may also be reserved (vertical mover stacks).
    Lenient,
}

// ── Move requests ──

/// Start moving the resting cell at (x, y) one slot by (dirx, diry).
/// Returns false (and changes nothing) if the move is not allowed.
pub fn request_move(
    field: &mut Field,
    x: i32,
    y: i32,
    dirx: i32,
    diry: i32,
    policy: BlockPolicy,
    speed: i32,
) -> bool {
    let (tx, ty) = (x + dirx, y + diry);
    if !field.in_bounds(tx, ty) {
        return false;
    }
    let Some(key) = field.cell_at(x, y) else {
        return false;
    };
    if field.cells[key].is_doomed() {
        return false;
    }
    field.cells[key].nudge = 0;

    // The floor under the cell can forbid the move.
    if let Some(floor) = field.cell_ref_at(x, y + 1) {
        if floor.active {
            match floor.kind {
                TileKind::OneWayLeft if dirx == 1 => return false,
                TileKind::OneWayRight if dirx == -1 => return false,
                TileKind::Glue => return false,
                _ => {}
            }
        }
    }

    let open = match field.slot(tx, ty) {
        Slot::Empty => true,
        Slot::Reserved(_) => policy == BlockPolicy::Lenient,
        Slot::Cell(_) => false,
    };
    if !open {
        return false;
    }

    let cell = &mut field.cells[key];
    cell.sx = x;
    cell.sy = y;
    cell.dx = tx;
    cell.dy = ty;
    cell.vx = speed * dirx;
    cell.vy = speed * diry;
    field.moving.push(key);
    field.set_slot(tx, ty, Slot::Reserved(Reserved::Destination));
    field.set_slot(x, y, Slot::Reserved(Reserved::Source));
    true
}

/// Step `pos` towards `target` by `v`, never overshooting.
fn approach(pos: i32, v: i32, target: i32) -> i32 {
    let delta = target - pos;
    if v == 0 || delta.signum() != v.signum() {
        return target;
    }
    let next = pos + v;
    if (v > 0 && next > target) || (v < 0 && next < target) {
        target
    } else {
        next
    }
}

/// Advance every sliding cell. Cells already sitting on their destination
/// pixel commit to the grid and leave the list.
pub fn process_move_list(field: &mut Field, cursor: &mut Cursor) {
    let mut i = 0;
    while i < field.moving.len() {
        let key = field.moving[i];
        let (tx, ty) = {
            let Some(c) = field.cells.get(key) else {
                field.moving.remove(i);
                continue;
            };
            (field.cfg.pixel_x(c.dx), field.cfg.pixel_y(c.dy))
        };
        let cell = &mut field.cells[key];

        if cell.px != tx || cell.py != ty {
            if cell.px != tx {
                cell.px = approach(cell.px, cell.vx, tx);
            }
            if cell.py != ty {
                cell.py = approach(cell.py, cell.vy, ty);
            }
            if cursor.lock && cell.cursor_lock {
                cursor.follow_pixels(cell.px, cell.py);
            }
            i += 1;
            continue;
        }

        if cursor.lock && cell.cursor_lock {
            cursor.snap_to(cell.dx, cell.dy);
        }
        cell.vx = 0;
        cell.vy = 0;
        let (sx, sy, dx, dy) = (cell.sx, cell.sy, cell.dx, cell.dy);
        cell.sx = dx;
        cell.sy = dy;
        field.set_slot(dx, dy, Slot::Cell(key));
        // Another move may already have claimed our old slot.
        if field.slot(sx, sy) == Slot::Reserved(Reserved::Source) {
            field.set_slot(sx, sy, Slot::Empty);
        }
        field.moving.remove(i);
    }
}

// ── Queries over sliding cells ──

/// First sliding cell whose source or destination is (x, y).
pub fn find_moving(field: &Field, x: i32, y: i32) -> Option<CellKey> {
    if !field.is_reserved(x, y) {
        return None;
    }
    field.moving.iter().copied().find(|&k| {
        let c = &field.cells[k];
        (c.sx == x && c.sy == y) || (c.dx == x && c.dy == y)
    })
}

/// Is this brick falling (or about to)? A brick riding a cell that moves in
/// lockstep with it counts as resting.
pub fn is_falling(field: &Field, key: CellKey) -> bool {
    let Some(c) = field.cells.get(key) else {
        return false;
    };
    let (x, y) = (c.sx, c.sy);
    if y + 1 >= FIELD_SIZE {
        return false;
    }
    match field.slot(x, y + 1) {
        Slot::Empty => true,
        Slot::Reserved(_) => match find_moving(field, x, y + 1) {
            Some(under) if under == key => true,
            Some(under) => {
                let u = &field.cells[under];
                u.px != c.px || u.vx != c.vx || u.vy != c.vy
            }
            None => false,
        },
        Slot::Cell(_) => false,
    }
}

/// Number of contiguous bricks stacked directly above (x, y).
pub fn bricks_on_top(field: &Field, x: i32, y: i32) -> i32 {
    let mut n = 0;
    while field.brick_at(x, y - n - 1).is_some() {
        n += 1;
    }
    n
}

/// Brick under the cursor, resting or sliding.
pub fn brick_under_cursor(field: &Field, x: i32, y: i32) -> Option<CellKey> {
    find_moving(field, x, y)
        .or_else(|| field.cell_at(x, y))
        .filter(|&k| field.cells[k].is_brick())
}

// ── Movers ──

/// Push a horizontal mover one slot, dragging the stack of bricks riding it.
pub fn horizontal_mover(field: &mut Field, x: i32, y: i32, dir: i32) -> bool {
    let Some(mover) = field.cell_ref_at(x, y) else {
        return false;
    };
    if !mover.active || !field.is_empty(x + dir, y) {
        return false;
    }
    let speed = field.cfg.horiz_mover_speed;
    if !request_move(field, x, y, dir, 0, BlockPolicy::Strict, speed) {
        return false;
    }

    let mut ay = y - 1;
    while field.brick_at(x, ay).is_some() {
        if field.is_empty(x + dir, ay) {
            request_move(field, x, ay, dir, 0, BlockPolicy::Strict, speed);
        }
        ay -= 1;
    }
    true
}

/// Push a vertical mover (or a brick in its stack) one slot up or down,
/// recursively making room first.
pub fn vertical_mover(field: &mut Field, x: i32, y: i32, dir: i32) -> bool {
    push_vertical(field, x, y, dir, 0)
}

fn push_vertical(field: &mut Field, x: i32, y: i32, dir: i32, depth: i32) -> bool {
    if depth > FIELD_SIZE {
        return false;
    }
    let Some(cell) = field.cell_ref_at(x, y) else {
        return false;
    };
    if !cell.active || !(cell.is_brick() || cell.kind.is_mover()) {
        return false;
    }
    let ny = y + dir;
    if ny < 0 || ny >= FIELD_SIZE {
        return false;
    }

    let speed = field.cfg.vert_mover_speed;
    if field.is_empty(x, ny) || push_vertical(field, x, ny, dir, depth + 1) {
        return request_move(field, x, y, 0, dir, BlockPolicy::Lenient, speed);
    }
    false
}

/// Brick resting on a reserved slot: try to ride along with the mover
/// somewhere below it.
pub fn attach_to_mover(field: &mut Field, x: i32, y: i32) {
    let Some(brick) = field.cell_at(x, y) else {
        return;
    };
    let Some(mut b) = find_moving(field, x, y + 1) else {
        return;
    };
    let mut seen: Vec<CellKey> = Vec::new();

    for _ in 0..field.moving.len() {
        if seen.contains(&b) {
            break;
        }
        seen.push(b);
        let below = field.cells[b].clone();

        match below.kind {
            TileKind::MoverHorizontal => {
                if below.sx != field.cells[brick].dx {
                    break;
                }
                let speed = field.cfg.horiz_mover_speed;
                if request_move(field, x, y, below.dx - below.sx, 0, BlockPolicy::Strict, speed) {
                    let c = &mut field.cells[brick];
                    c.vx = below.vx;
                    c.px = below.px - c.vx;
                    break;
                }
            }
            TileKind::MoverVertical if below.sy < below.dy => {
                if let Some(under) = find_moving(field, x, y + 1) {
                    b = under;
                    let u = field.cells[under].clone();
                    let speed = field.cfg.vert_mover_speed;
                    if request_move(field, x, y, 0, u.dy - u.sy, BlockPolicy::Lenient, speed) {
                        let tile = field.cfg.tile_size;
                        let c = &mut field.cells[brick];
                        c.py = u.py - tile;
                        c.vy = u.vy;
                        break;
                    }
                }
            }
            _ => {}
        }

        let next_y = field.cells[b].dy + 1;
        match find_moving(field, x, next_y) {
            Some(next) => b = next,
            None => break,
        }
    }
}

// ── Cursor pushes ──

/// Player push of a brick one slot sideways. A brick still sliding against
/// the push (or vertically) gets the push queued for the end of the tick.
pub fn cursor_move(field: &mut Field, key: CellKey, dir: i32) -> bool {
    if is_falling(field, key) {
        return false;
    }
    let Some(c) = field.cells.get(key) else {
        return false;
    };
    if field.on_top_of_reserved(c.dx, c.dy) {
        return false;
    }

    if !c.is_moving() {
        if c.is_brick() && field.cell_at(c.sx, c.sy) == Some(key) {
            let (x, y) = (c.sx, c.sy);
            let speed = field.cfg.cursor_move_speed;
            return request_move(field, x, y, dir, 0, BlockPolicy::Strict, speed);
        }
    } else if ((c.vx < 0 && dir > 0) || (c.vx > 0 && dir < 0) || c.vy != 0) && c.nudge == 0 {
        field.cells[key].nudge = dir;
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::field::{field_from, field_from_bottom};

    fn run(field: &mut Field, cursor: &mut Cursor, calls: usize) {
        for _ in 0..calls {
            process_move_list(field, cursor);
        }
    }

    #[test]
    fn request_move_reserves_both_slots() {
        //  a.
        let mut f = field_from(&["a."]);
        let key = f.cell_at(0, 0).unwrap();
        assert!(request_move(&mut f, 0, 0, 1, 0, BlockPolicy::Strict, 4));
        assert_eq!(f.slot(0, 0), Slot::Reserved(Reserved::Source));
        assert_eq!(f.slot(1, 0), Slot::Reserved(Reserved::Destination));
        assert_eq!(f.moving, vec![key]);
        let c = &f.cells[key];
        assert_eq!((c.sx, c.sy, c.dx, c.dy, c.vx, c.vy), (0, 0, 1, 0, 4, 0));
    }

    #[test]
    fn request_move_rejections() {
        //  ab#
        //  .g.
        let mut f = field_from(&["ab#", ".g."]);
        assert!(!request_move(&mut f, 0, 0, -1, 0, BlockPolicy::Strict, 4), "off board");
        assert!(!request_move(&mut f, 0, 0, 1, 0, BlockPolicy::Strict, 4), "occupied");
        assert!(!request_move(&mut f, 1, 0, 0, -1, BlockPolicy::Strict, 4), "off board up");
        assert!(!request_move(&mut f, 1, 0, 0, 1, BlockPolicy::Lenient, 4), "onto glue");
        assert!(!request_move(&mut f, 5, 5, 1, 0, BlockPolicy::Strict, 4), "no cell");
        assert!(f.moving.is_empty());
    }

    #[test]
    fn glue_holds_bricks_in_place() {
        //  .a.
        //  .g.
        let mut f = field_from(&[".a.", ".g."]);
        assert!(!request_move(&mut f, 1, 0, 1, 0, BlockPolicy::Strict, 4));
        assert!(!request_move(&mut f, 1, 0, -1, 0, BlockPolicy::Strict, 4));
        let glue = f.cell_at(1, 1).unwrap();
        f.cells[glue].active = false;
        assert!(request_move(&mut f, 1, 0, 1, 0, BlockPolicy::Strict, 4));
    }

    #[test]
    fn one_way_floor_blocks_against_its_direction() {
        //  .a.
        //  .<.
        let mut f = field_from(&[".a.", ".<."]);
        assert!(!request_move(&mut f, 1, 0, 1, 0, BlockPolicy::Strict, 4));
        assert!(request_move(&mut f, 1, 0, -1, 0, BlockPolicy::Strict, 4));
    }

    #[test]
    fn lenient_accepts_reserved_destination() {
        let mut f = field_from(&["a"]);
        f.set_slot(1, 0, Slot::Reserved(Reserved::Source));
        assert!(!request_move(&mut f, 0, 0, 1, 0, BlockPolicy::Strict, 4));
        assert!(request_move(&mut f, 0, 0, 1, 0, BlockPolicy::Lenient, 4));
    }

    #[test]
    fn move_commits_one_call_after_arrival() {
        let mut f = field_from(&["a."]);
        let mut cursor = Cursor::default();
        let key = f.cell_at(0, 0).unwrap();
        request_move(&mut f, 0, 0, 1, 0, BlockPolicy::Strict, 10);

        run(&mut f, &mut cursor, 2);
        assert_eq!(f.cells[key].px, 20);
        assert_eq!(f.moving.len(), 1, "arrived but not committed");

        run(&mut f, &mut cursor, 1);
        assert!(f.moving.is_empty());
        assert_eq!(f.slot(1, 0), Slot::Cell(key));
        assert_eq!(f.slot(0, 0), Slot::Empty);
        let c = &f.cells[key];
        assert_eq!((c.sx, c.dx, c.vx), (1, 1, 0));
    }

    #[test]
    fn pixel_steps_never_overshoot() {
        let mut f = field_from(&["a."]);
        let mut cursor = Cursor::default();
        let key = f.cell_at(0, 0).unwrap();
        request_move(&mut f, 0, 0, 1, 0, BlockPolicy::Strict, 7);
        run(&mut f, &mut cursor, 3);
        assert_eq!(f.cells[key].px, 20);
        assert_eq!(approach(18, 7, 20), 20);
        assert_eq!(approach(5, -7, 0), 0);
        assert_eq!(approach(5, 0, 9), 9);
    }

    #[test]
    fn locked_cursor_follows_brick() {
        let mut f = field_from(&["a."]);
        let mut cursor = Cursor { lock: true, ..Cursor::default() };
        let key = f.cell_at(0, 0).unwrap();
        f.cells[key].cursor_lock = true;
        request_move(&mut f, 0, 0, 1, 0, BlockPolicy::Strict, 10);
        run(&mut f, &mut cursor, 1);
        assert_eq!(cursor.px, 10 - crate::domain::cursor::CURSOR_MARGIN);
        run(&mut f, &mut cursor, 2);
        assert_eq!((cursor.x, cursor.y), (1, 0));
    }

    #[test]
    fn commit_keeps_reclaimed_source() {
        // A brick falls out of (0,0) and another slides in before it lands.
        let mut f = field_from(&["ba"]);
        let mut cursor = Cursor::default();
        request_move(&mut f, 0, 0, 0, 1, BlockPolicy::Strict, 20);
        request_move(&mut f, 1, 0, -1, 0, BlockPolicy::Lenient, 5);
        run(&mut f, &mut cursor, 2);
        assert!(f.brick_at(0, 1).is_some());
        assert_eq!(f.slot(0, 0), Slot::Reserved(Reserved::Destination));
    }

    #[test]
    fn falling_detection() {
        //  a.c
        //  b.#
        let mut f = field_from(&["a.c", "b.#"]);
        let top = f.cell_at(0, 0).unwrap();
        let c = f.cell_at(2, 0).unwrap();
        assert!(!is_falling(&f, top));
        assert!(!is_falling(&f, c));

        let bottom = f.cell_at(0, 1).unwrap();
        assert!(is_falling(&f, bottom), "nothing below");

        request_move(&mut f, 0, 1, 0, 1, BlockPolicy::Strict, 4);
        assert!(is_falling(&f, top), "brick below is sliding away");
        assert!(is_falling(&f, bottom));
    }

    #[test]
    fn bottom_row_never_falls() {
        let f = field_from_bottom(&["a"]);
        let key = f.cell_at(0, FIELD_SIZE - 1).unwrap();
        assert!(!is_falling(&f, key));
    }

    #[test]
    fn find_moving_needs_reserved_slot() {
        let mut f = field_from(&["a."]);
        let key = f.cell_at(0, 0).unwrap();
        assert_eq!(find_moving(&f, 0, 0), None);
        request_move(&mut f, 0, 0, 1, 0, BlockPolicy::Strict, 4);
        assert_eq!(find_moving(&f, 0, 0), Some(key));
        assert_eq!(find_moving(&f, 1, 0), Some(key));
        assert_eq!(find_moving(&f, 2, 0), None);
        assert_eq!(brick_under_cursor(&f, 1, 0), Some(key));
    }

    #[test]
    fn horizontal_mover_carries_stack() {
        //  a..
        //  b..
        //  H..
        //  ###
        let mut f = field_from(&["a..", "b..", "H..", "###"]);
        assert!(horizontal_mover(&mut f, 0, 2, 1));
        assert_eq!(f.moving.len(), 3);
        assert!(f.is_reserved(1, 0) && f.is_reserved(1, 1) && f.is_reserved(1, 2));
    }

    #[test]
    fn horizontal_mover_blocked() {
        //  H#
        let mut f = field_from(&["H#"]);
        assert!(!horizontal_mover(&mut f, 0, 0, 1));
        assert!(!horizontal_mover(&mut f, 0, 0, -1), "edge of board");
        let mover = f.cell_at(0, 0).unwrap();
        f.cells[mover].active = false;
        f.set_slot(1, 0, Slot::Empty);
        assert!(!horizontal_mover(&mut f, 0, 0, 1), "inactive");
    }

    #[test]
    fn vertical_mover_lifts_stack() {
        //  ...
        //  a..
        //  V..
        let mut f = field_from(&["...", "a..", "V.."]);
        let n = bricks_on_top(&f, 0, 2);
        assert_eq!(n, 1);
        assert!(vertical_mover(&mut f, 0, 2, -1));
        assert_eq!(f.moving.len(), 2);
        assert!(f.is_reserved(0, 0));
    }

    #[test]
    fn vertical_mover_stops_at_wall() {
        //  #
        //  a
        //  V
        let mut f = field_from(&["#", "a", "V"]);
        assert!(!vertical_mover(&mut f, 0, 2, -1));
        assert!(f.moving.is_empty());
    }

    #[test]
    fn brick_rides_horizontal_mover() {
        //  a..
        //  H..
        let mut f = field_from(&["a..", "H.."]);
        let brick = f.cell_at(0, 0).unwrap();
        horizontal_mover(&mut f, 0, 1, 1);
        f.moving.retain(|&k| k != brick);
        let c = &mut f.cells[brick];
        c.dx = 0;
        c.vx = 0;
        f.set_slot(0, 0, Slot::Cell(brick));
        f.set_slot(1, 0, Slot::Empty);

        attach_to_mover(&mut f, 0, 0);
        let c = &f.cells[brick];
        assert_eq!((c.dx, c.vx), (1, 1));
        assert_eq!(c.px, -1);
    }

    #[test]
    fn cursor_push_and_nudge() {
        //  .a.
        //  ###
        let mut f = field_from(&[".a.", "###"]);
        let key = f.cell_at(1, 0).unwrap();
        assert!(cursor_move(&mut f, key, 1));
        assert_eq!(f.cells[key].vx, f.cfg.cursor_move_speed);

        assert!(!cursor_move(&mut f, key, 1), "same direction while sliding");
        assert!(cursor_move(&mut f, key, -1), "queued against the slide");
        assert_eq!(f.cells[key].nudge, -1);
        assert!(!cursor_move(&mut f, key, -1), "already queued");
    }

    #[test]
    fn cursor_cannot_push_falling_brick() {
        let mut f = field_from(&[".a.", "..."]);
        let key = f.cell_at(1, 0).unwrap();
        assert!(!cursor_move(&mut f, key, 1));
    }
}
