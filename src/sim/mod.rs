pub mod event;
pub mod field;
pub mod level;
pub mod movement;
pub mod rules;
pub mod session;
pub mod step;
pub mod switch;
pub mod teleport;
