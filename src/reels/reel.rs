// src/reels/reel.rs
use crate::core::assets::{TexMeta, TextureId};
use crate::reels::render::SymbolPlacement;

/// Uniform scale that fits a texture inside a `size` x `size` slot.
#[inline(always)]
pub fn fit_scale(meta: TexMeta, size: f32) -> f32 {
    (size / meta.w as f32).min(size / meta.h as f32)
}

/// Horizontal offset that centers a scaled texture in its slot.
#[inline(always)]
pub fn centered_x(meta: TexMeta, scale: f32, size: f32) -> f32 {
    ((size - meta.w as f32 * scale) / 2.0).round()
}

/// Vertical offset of symbol `index` for a reel scrolled to `position`.
/// Slot 0 sits one symbol above the top edge so a row is always ready to scroll in.
#[inline(always)]
pub fn symbol_y(position: f64, index: usize, count: usize, size: f32) -> f32 {
    let size = size as f64;
    ((position + index as f64).rem_euclid(count as f64) * size - size) as f32
}

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub texture: TextureId,
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Symbol {
    pub fn new(texture: TextureId, meta: TexMeta, size: f32, y: f32) -> Self {
        let scale = fit_scale(meta, size);
        Self { texture, x: centered_x(meta, scale, size), y, scale }
    }

    /// Swap the texture in place and refit it to the slot.
    pub fn retexture(&mut self, texture: TextureId, meta: TexMeta, size: f32) {
        self.texture = texture;
        self.scale = fit_scale(meta, size);
        self.x = centered_x(meta, self.scale, size);
    }

    pub fn placement(&self) -> SymbolPlacement {
        SymbolPlacement { texture: self.texture, x: self.x, y: self.y, scale: self.scale }
    }
}

#[derive(Clone, Debug)]
pub struct Reel {
    pub symbols: Vec<Symbol>,
    /// Symbol slots scrolled so far; fractional between slots.
    pub position: f64,
    /// `position` as of the previous frame hook.
    pub previous_position: f64,
    pub blur_y: f32,
}

impl Reel {
    /// Lay symbols out for `position == 0`.
    pub fn new(textures: impl IntoIterator<Item = (TextureId, TexMeta)>, size: f32) -> Self {
        let textures: Vec<_> = textures.into_iter().collect();
        let count = textures.len();
        let symbols = textures
            .into_iter()
            .enumerate()
            .map(|(j, (tex, meta))| Symbol::new(tex, meta, size, symbol_y(0.0, j, count, size)))
            .collect();
        Self { symbols, position: 0.0, previous_position: 0.0, blur_y: 0.0 }
    }

    /// Slots moved since the previous frame hook.
    #[inline(always)]
    pub fn velocity(&self) -> f64 {
        self.position - self.previous_position
    }

    /// Derive blur from the frame's displacement, then latch the position for next frame.
    pub fn update_blur(&mut self, multiplier: f64, frame_scale: f64) -> f32 {
        self.blur_y = (self.velocity() * multiplier * frame_scale) as f32;
        self.previous_position = self.position;
        self.blur_y
    }

    /// Recompute every symbol's `y`. Returns the indices that just wrapped
    /// from below the window back to the top; those are due for a new texture.
    ///
    /// Only this frame's `y` is compared with the last one, so a frame that
    /// moves two or more slots can skip a recycle. A spin at 60 fps moves well
    /// under one slot per frame.
    pub fn relayout(&mut self, size: f32) -> Vec<usize> {
        let count = self.symbols.len();
        let mut wrapped = Vec::new();
        for (j, s) in self.symbols.iter_mut().enumerate() {
            let prev_y = s.y;
            s.y = symbol_y(self.position, j, count, size);
            if s.y < 0.0 && prev_y > size {
                wrapped.push(j);
            }
        }
        wrapped
    }

    /// Textures showing in the `rows` visible slots, top to bottom.
    pub fn visible(&self, rows: usize, size: f32) -> Vec<TextureId> {
        let mut shown: Vec<&Symbol> = self
            .symbols
            .iter()
            .filter(|s| s.y > -0.5 * size && s.y < (rows as f32 - 0.5) * size)
            .collect();
        shown.sort_by(|a, b| a.y.total_cmp(&b.y));
        shown.into_iter().map(|s| s.texture).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: f32 = 150.0;

    fn square_reel(count: usize) -> Reel {
        Reel::new((0..count).map(|j| (TextureId(j), TexMeta { w: 150, h: 150 })), SIZE)
    }

    #[test]
    fn fit_and_center() {
        let meta = TexMeta { w: 300, h: 150 };
        let scale = fit_scale(meta, SIZE);
        assert_eq!(scale, 0.5);
        assert_eq!(centered_x(meta, scale, SIZE), 0.0);

        let tall = TexMeta { w: 96, h: 128 };
        let s = fit_scale(tall, SIZE);
        assert_eq!(s, SIZE / 128.0);
        assert_eq!(centered_x(tall, s, SIZE), ((SIZE - 96.0 * s) / 2.0).round());
    }

    #[test]
    fn layout_at_rest() {
        let reel = square_reel(4);
        let ys: Vec<f32> = reel.symbols.iter().map(|s| s.y).collect();
        assert_eq!(ys, vec![-150.0, 0.0, 150.0, 300.0]);
    }

    #[test]
    fn y_wraps_euclidean() {
        assert_eq!(symbol_y(4.0, 0, 4, SIZE), -150.0);
        assert_eq!(symbol_y(3.0, 1, 4, SIZE), -150.0);
        assert_eq!(symbol_y(5.5, 2, 4, SIZE), 0.5 * 150.0 + 150.0 * 2.0);
    }

    #[test]
    fn blur_from_displacement() {
        let mut reel = square_reel(4);
        reel.previous_position = 2.0;
        reel.position = 2.5;
        assert_eq!(reel.update_blur(8.0, 1.0), 4.0);
        assert_eq!(reel.previous_position, 2.5);
        // Same frame again: no motion, no blur.
        assert_eq!(reel.update_blur(8.0, 1.0), 0.0);
    }

    #[test]
    fn blur_scales_with_frame_length() {
        let mut reel = square_reel(4);
        reel.previous_position = 2.0;
        reel.position = 2.5;
        // Half a slot over a double-length frame smears like a quarter slot at the reference rate.
        assert_eq!(reel.update_blur(8.0, 0.5), 2.0);
    }

    #[test]
    fn exactly_one_symbol_wraps_across_four() {
        let mut reel = square_reel(4);
        reel.position = 3.9;
        assert!(reel.relayout(SIZE).is_empty());
        reel.position = 4.1;
        assert_eq!(reel.relayout(SIZE), vec![0]);
    }

    #[test]
    fn long_frame_under_two_slots_still_recycles() {
        let mut reel = square_reel(4);
        reel.position = 2.2;
        reel.relayout(SIZE);
        reel.position = 4.1;
        assert_eq!(reel.relayout(SIZE), vec![0]);
    }

    #[test]
    fn visible_rows_top_to_bottom() {
        let reel = square_reel(4);
        assert_eq!(reel.visible(3, SIZE), vec![TextureId(1), TextureId(2), TextureId(3)]);
    }
}
