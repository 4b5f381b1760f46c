pub mod cell;
pub mod cursor;
pub mod edges;
pub mod tile;
