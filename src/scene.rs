// src/scene.rs
use crate::config::ReelConfig;
use crate::core::assets::Palette;
use crate::core::gfx::{ObjectType, RenderList, RenderObject};
use crate::core::space::ReelArea;
use crate::reels::render::{Renderer, SymbolPlacement};
use cgmath::{Matrix4, Vector3};

const CLEAR: [f32; 4] = [0.08, 0.06, 0.12, 1.0];
const COVER: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const WHITE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

#[derive(Clone, Debug, Default)]
struct SceneReel {
    x: f32,
    blur_y: f32,
    symbols: Vec<SymbolPlacement>,
}

/// Retained display state, written by the engine and flattened into a `RenderList` per frame.
pub struct Scene {
    viewport: (f32, f32),
    area: ReelArea,
    reels: Vec<SceneReel>,
}

#[inline(always)]
fn quad(x: f32, y: f32, w: f32, h: f32) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(x + w * 0.5, y + h * 0.5, 0.0)) * Matrix4::from_nonuniform_scale(w, h, 1.0)
}

impl Scene {
    pub fn new(viewport: (f32, f32), reels: &ReelConfig) -> Self {
        Self { viewport, area: ReelArea::for_viewport(viewport, reels), reels: Vec::new() }
    }

    pub fn area(&self) -> ReelArea {
        self.area
    }

    /// Keeps the reels centered; symbol placements are reel-local so they are untouched.
    pub fn resize(&mut self, viewport: (f32, f32), reels: &ReelConfig) {
        self.viewport = viewport;
        self.area = ReelArea::for_viewport(viewport, reels);
    }

    pub fn reel_count(&self) -> usize {
        self.reels.len()
    }

    pub fn symbol(&self, reel: usize, symbol: usize) -> Option<&SymbolPlacement> {
        self.reels.get(reel)?.symbols.get(symbol)
    }

    pub fn blur(&self, reel: usize) -> f32 {
        self.reels.get(reel).map_or(0.0, |r| r.blur_y)
    }

    /// True when a window-space point falls on the bottom cover.
    pub fn bottom_cover_contains(&self, x: f32, y: f32) -> bool {
        (0.0..=self.viewport.0).contains(&x) && y >= self.area.bottom() && y <= self.viewport.1
    }

    pub fn build_render_list(&self, palette: &Palette) -> RenderList {
        let symbol_count: usize = self.reels.iter().map(|r| r.symbols.len()).sum();
        let mut objects = Vec::with_capacity(symbol_count + 2);
        let (vw, vh) = self.viewport;

        for reel in &self.reels {
            let left = self.area.left + reel.x;
            for s in &reel.symbols {
                let meta = palette.meta(s.texture);
                let (w, h) = (meta.w as f32 * s.scale, meta.h as f32 * s.scale);
                // Pixel smear expressed as a share of the sprite height.
                let blur = if h > 0.0 { reel.blur_y.abs() / h } else { 0.0 };
                objects.push(RenderObject {
                    object_type: ObjectType::Sprite { texture_id: s.texture, tint: WHITE, blur },
                    transform: quad(left + s.x, self.area.top + s.y, w, h),
                });
            }
        }

        objects.push(RenderObject {
            object_type: ObjectType::SolidColor { color: COVER },
            transform: quad(0.0, 0.0, vw, self.area.top),
        });
        objects.push(RenderObject {
            object_type: ObjectType::SolidColor { color: COVER },
            transform: quad(0.0, self.area.bottom(), vw, vh - self.area.bottom()),
        });

        RenderList { clear_color: CLEAR, objects }
    }
}

impl Renderer for Scene {
    fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    fn create_reel(&mut self, reel: usize, x: f32) {
        self.create_reel_if_missing(reel);
        self.reels[reel].x = x;
    }

    fn create_symbol(&mut self, reel: usize, symbol: usize, placement: SymbolPlacement) {
        self.create_reel_if_missing(reel);
        let symbols = &mut self.reels[reel].symbols;
        if symbols.len() <= symbol {
            symbols.resize(symbol + 1, placement);
        }
        symbols[symbol] = placement;
    }

    fn set_symbol(&mut self, reel: usize, symbol: usize, placement: SymbolPlacement) {
        if let Some(slot) = self.reels.get_mut(reel).and_then(|r| r.symbols.get_mut(symbol)) {
            *slot = placement;
        }
    }

    fn set_reel_blur(&mut self, reel: usize, blur_y: f32) {
        if let Some(r) = self.reels.get_mut(reel) {
            r.blur_y = blur_y;
        }
    }
}

impl Scene {
    fn create_reel_if_missing(&mut self, reel: usize) {
        if self.reels.len() <= reel {
            self.reels.resize_with(reel + 1, SceneReel::default);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assets::{AssetProvider, DiskAssets, builtin_sources};
    use crate::reels::ReelEngine;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup() -> (ReelEngine, Scene) {
        let textures = DiskAssets.load_textures(&builtin_sources()).unwrap();
        let palette = Palette::from_textures(&textures).unwrap();
        let config = ReelConfig::default();
        let scene = Scene::new((1024.0, 768.0), &config);
        let engine = ReelEngine::with_rng(config, palette, StdRng::seed_from_u64(3)).unwrap();
        (engine, scene)
    }

    #[test]
    fn one_sprite_per_symbol_plus_covers() {
        let (engine, mut scene) = setup();
        engine.layout(&mut scene);
        let list = scene.build_render_list(engine.palette());
        assert_eq!(list.sprite_count(), 20);
        assert_eq!(list.objects.len(), 22);
        let covers = list.objects.iter().filter(|o| matches!(o.object_type, ObjectType::SolidColor { .. })).count();
        assert_eq!(covers, 2);
    }

    #[test]
    fn writes_land_in_the_scene() {
        let (engine, mut scene) = setup();
        engine.layout(&mut scene);
        assert_eq!(scene.reel_count(), 5);
        assert_eq!(scene.symbol(2, 1), Some(&engine.reels()[2].symbols[1].placement()));

        scene.set_reel_blur(1, 12.0);
        assert_eq!(scene.blur(1), 12.0);
        scene.set_reel_blur(9, 1.0);
        assert_eq!(scene.blur(9), 0.0);
    }

    #[test]
    fn bottom_cover_hit_test() {
        let (_, scene) = setup();
        assert!(scene.bottom_cover_contains(500.0, 700.0));
        assert!(!scene.bottom_cover_contains(500.0, 300.0));
        assert!(!scene.bottom_cover_contains(500.0, 100.0));
    }
}
