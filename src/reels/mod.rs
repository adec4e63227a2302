pub mod engine;
pub mod reel;
pub mod render;
pub mod tween;

pub use engine::{EngineState, ReelEngine, SpinEvent, SpinId};
