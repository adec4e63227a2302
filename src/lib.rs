pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod reels;
pub mod scene;
pub mod screens;
