pub mod headless;
pub mod opengl;
