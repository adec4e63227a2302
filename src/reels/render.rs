// src/reels/render.rs
use crate::core::assets::TextureId;

/// Display state of one symbol slot, in the reel's local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SymbolPlacement {
    pub texture: TextureId,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

/// The display side the engine talks to. The engine never draws; it only
/// issues construction and per-frame display writes through this seam.
pub trait Renderer {
    /// Viewport size in logical pixels.
    fn viewport(&self) -> (f32, f32);

    /// Create the container for reel `reel`, offset `x` from the reel area's left edge.
    fn create_reel(&mut self, reel: usize, x: f32);

    fn create_symbol(&mut self, reel: usize, symbol: usize, placement: SymbolPlacement);

    fn set_symbol(&mut self, reel: usize, symbol: usize, placement: SymbolPlacement);

    fn set_reel_blur(&mut self, reel: usize, blur_y: f32);
}

/// Drops every write. Handy when only the simulation matters.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRenderer {
    pub viewport: (f32, f32),
}

impl Renderer for NullRenderer {
    fn viewport(&self) -> (f32, f32) { self.viewport }
    fn create_reel(&mut self, _reel: usize, _x: f32) {}
    fn create_symbol(&mut self, _reel: usize, _symbol: usize, _placement: SymbolPlacement) {}
    fn set_symbol(&mut self, _reel: usize, _symbol: usize, _placement: SymbolPlacement) {}
    fn set_reel_blur(&mut self, _reel: usize, _blur_y: f32) {}
}
