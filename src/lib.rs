pub mod audio;
pub mod config;
pub mod controller;
pub mod effect_kind;
pub mod error;
pub mod middle;
pub mod session;
pub mod shared;
pub mod tui;
