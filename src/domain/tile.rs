/// Tile kinds and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// ## Level-file codes
///   `01`..`10` = matchable brick variants
///   `11` = wall            `12` = reserved (never valid on disk)
///   `13` = horizontal mover `14` = vertical mover
///   `15` = one-way left    `16` = one-way right
///   `17` = glue            `18` = evil trigger
///   `19` = copy trigger    `20` = swap trigger
///   `21` = switch (on)     `22` = switch (off)
///   `23` = remove trigger

/// Number of matchable brick variants.
pub const BRICK_VARIANTS: u8 = 10;

/// Code written for a reserved slot. Rejected on load.
pub const RESERVED_CODE: u8 = 12;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TileKind {
    Wall,
    Glue,
    OneWayLeft,
    OneWayRight,
    SwitchOn,
    SwitchOff,
    RemoveTrigger,
    EvilTrigger,
    CopyTrigger,
    SwapTrigger,
    MoverHorizontal,
    MoverVertical,
    /// Matchable brick, variant `0..BRICK_VARIANTS`.
    Brick(u8),
}

impl TileKind {
    /// Decode a level-file code. `0` (empty) and reserved are not tiles.
    pub fn from_code(code: u8) -> Option<TileKind> {
        let kind = match code {
            1..=10 => TileKind::Brick(code - 1),
            11 => TileKind::Wall,
            13 => TileKind::MoverHorizontal,
            14 => TileKind::MoverVertical,
            15 => TileKind::OneWayLeft,
            16 => TileKind::OneWayRight,
            17 => TileKind::Glue,
            18 => TileKind::EvilTrigger,
            19 => TileKind::CopyTrigger,
            20 => TileKind::SwapTrigger,
            21 => TileKind::SwitchOn,
            22 => TileKind::SwitchOff,
            23 => TileKind::RemoveTrigger,
            _ => return None,
        };
        Some(kind)
    }

    pub fn code(self) -> u8 {
        match self {
            TileKind::Brick(v) => v + 1,
            TileKind::Wall => 11,
            TileKind::MoverHorizontal => 13,
            TileKind::MoverVertical => 14,
            TileKind::OneWayLeft => 15,
            TileKind::OneWayRight => 16,
            TileKind::Glue => 17,
            TileKind::EvilTrigger => 18,
            TileKind::CopyTrigger => 19,
            TileKind::SwapTrigger => 20,
            TileKind::SwitchOn => 21,
            TileKind::SwitchOff => 22,
            TileKind::RemoveTrigger => 23,
        }
    }

    /// Does this tile take part in same-type adjacency removal?
    pub fn is_brick(self) -> bool {
        matches!(self, TileKind::Brick(_))
    }

    pub fn brick_variant(self) -> Option<u8> {
        match self {
            TileKind::Brick(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_mover(self) -> bool {
        matches!(self, TileKind::MoverHorizontal | TileKind::MoverVertical)
    }

    pub fn is_switch(self) -> bool {
        matches!(self, TileKind::SwitchOn | TileKind::SwitchOff)
    }

    /// Static tiles that never move and take part in wall tiling.
    pub fn is_blocking(self) -> bool {
        match self {
            TileKind::Wall
            | TileKind::Glue
            | TileKind::OneWayLeft
            | TileKind::OneWayRight
            | TileKind::SwitchOn
            | TileKind::SwitchOff
            | TileKind::RemoveTrigger
            | TileKind::EvilTrigger
            | TileKind::CopyTrigger
            | TileKind::SwapTrigger => true,
            TileKind::MoverHorizontal | TileKind::MoverVertical | TileKind::Brick(_) => false,
        }
    }

    /// Horizontal direction a one-way floor pushes towards.
    pub fn one_way_dir(self) -> Option<i32> {
        match self {
            TileKind::OneWayLeft => Some(-1),
            TileKind::OneWayRight => Some(1),
            _ => None,
        }
    }

    /// Next variant for a swap trigger, wrapping within the brick range.
    pub fn next_variant(v: u8) -> u8 {
        (v + 1) % BRICK_VARIANTS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_for_every_tile() {
        for code in 1..=23u8 {
            match TileKind::from_code(code) {
                Some(kind) => assert_eq!(kind.code(), code),
                None => assert_eq!(code, RESERVED_CODE),
            }
        }
        assert_eq!(TileKind::from_code(0), None);
        assert_eq!(TileKind::from_code(24), None);
    }

    #[test]
    fn classification_is_exclusive() {
        assert!(TileKind::Brick(3).is_brick());
        assert!(!TileKind::Brick(3).is_blocking());
        assert!(!TileKind::MoverVertical.is_blocking());
        assert!(TileKind::MoverVertical.is_mover());
        assert!(TileKind::SwitchOff.is_blocking());
        assert!(TileKind::SwitchOff.is_switch());
        assert_eq!(TileKind::OneWayLeft.one_way_dir(), Some(-1));
        assert_eq!(TileKind::Glue.one_way_dir(), None);
    }

    #[test]
    fn variant_wraps() {
        assert_eq!(TileKind::next_variant(0), 1);
        assert_eq!(TileKind::next_variant(BRICK_VARIANTS - 1), 0);
    }
}
