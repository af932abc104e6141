pub mod config;
pub mod controls;
pub mod mods;
pub mod settings;
pub mod staging;
