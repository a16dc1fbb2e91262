//! Domain layer for the roster

pub mod entities;
pub mod views;
