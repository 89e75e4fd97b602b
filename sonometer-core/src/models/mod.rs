pub mod audio_models;
pub mod command_status;
pub mod config;
pub mod error;
pub mod state;
