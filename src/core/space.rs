use crate::config::ReelConfig;
use cgmath::Matrix4;

// -----------------------------------------------------------------------------
// Window space: pixels, origin at top-left, y grows downward
// -----------------------------------------------------------------------------
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    pub width: f32,
    pub height: f32,
}

#[inline(always)]
pub fn metrics_for_window(width: u32, height: u32) -> Metrics {
    Metrics { width: width.max(1) as f32, height: height.max(1) as f32 }
}

#[inline(always)]
pub fn ortho_for_window(width: u32, height: u32) -> Matrix4<f32> {
    let m = metrics_for_window(width, height);
    cgmath::ortho(0.0, m.width, m.height, 0.0, -1.0, 1.0)
}

// -----------------------------------------------------------------------------
// Reel area
// -----------------------------------------------------------------------------
/// Where the reel strip sits inside the window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReelArea {
    /// Left edge of reel 0.
    pub left: f32,
    /// Top of the first visible row; everything above is covered.
    pub top: f32,
    pub width: f32,
    /// Height of the visible rows.
    pub height: f32,
}

impl ReelArea {
    /// Vertical margin is `(viewport_h - symbol_size * visible_rows) / 2`; reels are centered horizontally.
    pub fn for_viewport(viewport: (f32, f32), reels: &ReelConfig) -> Self {
        let (vw, vh) = viewport;
        let width = reels.reel_width * reels.reel_count as f32;
        let height = reels.symbol_size * reels.visible_rows as f32;
        Self { left: ((vw - width) / 2.0).round(), top: ((vh - height) / 2.0).round(), width, height }
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_layout_is_centered() {
        let area = ReelArea::for_viewport((1024.0, 768.0), &ReelConfig::default());
        assert_eq!(area.width, 800.0);
        assert_eq!(area.left, 112.0);
        assert_eq!(area.top, 159.0);
        assert_eq!(area.bottom(), 609.0);
    }

    #[test]
    fn ortho_maps_corners() {
        use cgmath::{Vector4, vec4};
        let close = |p: Vector4<f32>, x: f32, y: f32| (p.x - x).abs() < 1e-5 && (p.y - y).abs() < 1e-5;
        assert!(close(ortho_for_window(200, 100) * vec4(0.0, 0.0, 0.0, 1.0), -1.0, 1.0));
        assert!(close(ortho_for_window(200, 100) * vec4(200.0, 100.0, 0.0, 1.0), 1.0, -1.0));
    }
}
