pub mod dashboard;
pub mod election;
pub mod grid;
pub mod notice;
pub mod screen;
pub mod selection;
pub mod session;
pub mod sidebar;
pub mod token;
pub mod validation;
