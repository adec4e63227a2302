pub mod assets;
pub mod clock;
pub mod gfx;
pub mod input;
pub mod space;
