// src/core/mod.rs

pub mod arg_parser;
pub mod config_loader;
pub mod environment;
pub mod flag_translation;
pub mod launcher;
pub mod paths;
pub mod settings_builder;
