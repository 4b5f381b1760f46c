/// Wall edge classification.
///
/// Every blocking tile gets a 12-bit mask describing which of its sides and
/// corners face open space. The renderer picks wall glyphs from it.
///
///   bits 0..3   flat side open (top, bottom, left, right)
///   bits 4..7   convex corner: both adjacent sides open
///   bits 8..11  concave corner: both sides blocking, diagonal open

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct EdgeMask(pub u16);

impl EdgeMask {
    pub const TOP: u16 = 1 << 0;
    pub const BOTTOM: u16 = 1 << 1;
    pub const LEFT: u16 = 1 << 2;
    pub const RIGHT: u16 = 1 << 3;
    pub const TOP_LEFT: u16 = 1 << 4;
    pub const TOP_RIGHT: u16 = 1 << 5;
    pub const BOTTOM_LEFT: u16 = 1 << 6;
    pub const BOTTOM_RIGHT: u16 = 1 << 7;
    pub const INNER_TOP_LEFT: u16 = 1 << 8;
    pub const INNER_TOP_RIGHT: u16 = 1 << 9;
    pub const INNER_BOTTOM_LEFT: u16 = 1 << 10;
    pub const INNER_BOTTOM_RIGHT: u16 = 1 << 11;

    pub fn has(self, bit: u16) -> bool {
        self.0 & bit != 0
    }

    /// Compute the mask for (x, y) given a blocking predicate over the grid.
    /// The predicate must answer false out of bounds.
    pub fn classify(x: i32, y: i32, blocking: impl Fn(i32, i32) -> bool) -> EdgeMask {
        let up = blocking(x, y - 1);
        let down = blocking(x, y + 1);
        let left = blocking(x - 1, y);
        let right = blocking(x + 1, y);

        let mut m = 0u16;
        if !up { m |= Self::TOP; }
        if !down { m |= Self::BOTTOM; }
        if !left { m |= Self::LEFT; }
        if !right { m |= Self::RIGHT; }

        if !left && !up { m |= Self::TOP_LEFT; }
        if !right && !up { m |= Self::TOP_RIGHT; }
        if !left && !down { m |= Self::BOTTOM_LEFT; }
        if !right && !down { m |= Self::BOTTOM_RIGHT; }

        if up && left && !blocking(x - 1, y - 1) { m |= Self::INNER_TOP_LEFT; }
        if up && right && !blocking(x + 1, y - 1) { m |= Self::INNER_TOP_RIGHT; }
        if down && left && !blocking(x - 1, y + 1) { m |= Self::INNER_BOTTOM_LEFT; }
        if down && right && !blocking(x + 1, y + 1) { m |= Self::INNER_BOTTOM_RIGHT; }

        EdgeMask(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid<'a>(rows: &'a [&'a str]) -> impl Fn(i32, i32) -> bool + 'a {
        move |x, y| {
            if x < 0 || y < 0 || y as usize >= rows.len() { return false; }
            rows[y as usize].as_bytes().get(x as usize) == Some(&b'#')
        }
    }

    #[test]
    fn lone_wall_is_open_everywhere() {
        let g = grid(&["...", ".#.", "..."]);
        let m = EdgeMask::classify(1, 1, g);
        assert_eq!(m.0 & 0xff, 0xff);
        assert_eq!(m.0 >> 8, 0);
    }

    #[test]
    fn concave_corner_needs_open_diagonal() {
        let g = grid(&[".#", "##"]);
        let m = EdgeMask::classify(1, 1, &g);
        assert!(m.has(EdgeMask::INNER_TOP_LEFT));
        assert!(!m.has(EdgeMask::TOP));
        assert!(!m.has(EdgeMask::LEFT));
        assert!(m.has(EdgeMask::BOTTOM));

        let full = grid(&["##", "##"]);
        assert!(!EdgeMask::classify(1, 1, &full).has(EdgeMask::INNER_TOP_LEFT));
    }

    #[test]
    fn out_of_bounds_counts_as_open() {
        let g = grid(&["#"]);
        let m = EdgeMask::classify(0, 0, g);
        assert!(m.has(EdgeMask::TOP) && m.has(EdgeMask::LEFT));
        assert!(m.has(EdgeMask::TOP_LEFT));
    }
}
