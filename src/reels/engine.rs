// src/reels/engine.rs
use crate::config::ReelConfig;
use crate::core::assets::{Palette, TextureId};
use crate::core::clock::FrameTick;
use crate::error::{ConfigError, EngineError};
use crate::reels::reel::Reel;
use crate::reels::render::Renderer;
use crate::reels::tween::{Tween, TweenEvent, TweenField, TweenScheduler, TweenTarget};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Mutable reel data the tweens write into.
#[derive(Clone, Debug, Default)]
pub struct EngineState {
    pub reels: Vec<Reel>,
    pub running: bool,
    pub barrier: Option<SpinBarrier>,
}

impl TweenTarget for EngineState {
    fn read(&self, field: TweenField) -> f64 {
        match field {
            TweenField::ReelPosition(i) => self.reels.get(i).map_or(0.0, |r| r.position),
        }
    }

    fn write(&mut self, field: TweenField, value: f64) {
        match field {
            TweenField::ReelPosition(i) => {
                if let Some(reel) = self.reels.get_mut(i) {
                    reel.position = value;
                }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpinId(pub u64);

/// Counts reel completions down to zero for one spin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpinBarrier {
    pub spin: SpinId,
    pub remaining: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpinEvent {
    ReelStopped { spin: SpinId, reel: usize, at_ms: f64 },
    Finished { spin: SpinId, at_ms: f64 },
}

/// Where a reel is headed for the current spin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReelPlan {
    pub target: f64,
    pub duration_ms: f64,
}

pub struct ReelEngine {
    config: ReelConfig,
    palette: Palette,
    state: EngineState,
    tweens: TweenScheduler,
    next_spin: u64,
    rng: StdRng,
}

impl ReelEngine {
    /// Seeds from `config.seed`, or from OS entropy when unset.
    pub fn new(config: ReelConfig, palette: Palette) -> Result<Self, EngineError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, palette, rng)
    }

    pub fn with_rng(config: ReelConfig, palette: Palette, mut rng: StdRng) -> Result<Self, EngineError> {
        config.validate()?;
        let size = config.symbol_size;
        let reels = (0..config.reel_count)
            .map(|_| {
                let textures: Vec<(TextureId, _)> = (0..config.symbols_per_reel)
                    .map(|_| {
                        let tex = palette.pick(&mut rng);
                        (tex, palette.meta(tex))
                    })
                    .collect();
                Reel::new(textures, size)
            })
            .collect();
        info!(
            "Reel engine ready: {} reels x {} symbols, palette of {}",
            config.reel_count,
            config.symbols_per_reel,
            palette.len()
        );
        Ok(Self {
            config,
            palette,
            state: EngineState { reels, running: false, barrier: None },
            tweens: TweenScheduler::new(),
            next_spin: 0,
            rng,
        })
    }

    pub fn config(&self) -> &ReelConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn reels(&self) -> &[Reel] {
        &self.state.reels
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn active_tweens(&self) -> usize {
        self.tweens.len()
    }

    /// Tween targets of the spin in flight, by reel index.
    pub fn targets(&self) -> Vec<(usize, f64)> {
        self.tweens
            .iter()
            .map(|(_, tw)| match tw.field {
                TweenField::ReelPosition(i) => (i, tw.to),
            })
            .collect()
    }

    /// Create the display objects for every reel and symbol.
    pub fn layout<R: Renderer + ?Sized>(&self, renderer: &mut R) {
        for (i, reel) in self.state.reels.iter().enumerate() {
            renderer.create_reel(i, i as f32 * self.config.reel_width);
            for (j, symbol) in reel.symbols.iter().enumerate() {
                renderer.create_symbol(i, j, symbol.placement());
            }
        }
    }

    /// Target and duration for reel `index` given its `extra` slots.
    pub fn plan(&self, index: usize, extra: u32) -> ReelPlan {
        let c = &self.config;
        let position = self.state.reels.get(index).map_or(0.0, |r| r.position);
        let extra = extra as f64;
        let i = index as f64;
        ReelPlan {
            target: position + c.base_advance + i * c.per_reel_advance + extra,
            duration_ms: c.base_time_ms + i * c.extra_factor_ms + extra * c.extra_factor_ms,
        }
    }

    /// Start a spin with random extra slots per reel. `Ok(None)` while a spin is running.
    pub fn start_spin(&mut self, now_ms: f64) -> Result<Option<SpinId>, EngineError> {
        if self.state.running {
            return Ok(None);
        }
        let max_extra = self.config.max_extra_slots;
        let extras: Vec<u32> = (0..self.state.reels.len()).map(|_| self.rng.random_range(0..=max_extra)).collect();
        self.start_spin_with_extras(now_ms, &extras)
    }

    pub fn start_spin_with_extras(&mut self, now_ms: f64, extras: &[u32]) -> Result<Option<SpinId>, EngineError> {
        let count = self.state.reels.len();
        if count == 0 {
            return Err(ConfigError::NoReels(0).into());
        }
        if self.state.running {
            return Ok(None);
        }
        if extras.len() != count {
            return Err(EngineError::ExtrasMismatch { expected: count, got: extras.len() });
        }

        let spin = SpinId(self.next_spin);
        self.next_spin += 1;
        self.state.running = true;
        self.state.barrier = Some(SpinBarrier { spin, remaining: count });

        for (i, &extra) in extras.iter().enumerate() {
            let plan = self.plan(i, extra);
            let from = self.state.reels[i].position;
            debug!("Spin {}: reel {} {:.2} -> {:.2} over {}ms", spin.0, i, from, plan.target, plan.duration_ms);
            self.tweens.schedule(Tween::new(
                TweenField::ReelPosition(i),
                from,
                plan.target,
                now_ms,
                plan.duration_ms,
                self.config.ease,
            ));
        }
        info!("Spin {} started at {:.0}ms", spin.0, now_ms);
        Ok(Some(spin))
    }

    /// Advance tweens to `tick.now_ms`, refresh moved reels, and report stops.
    pub fn tick<R: Renderer + ?Sized>(&mut self, tick: &FrameTick, renderer: &mut R) -> Vec<SpinEvent> {
        let events = self.tweens.advance(tick.now_ms, &mut self.state);

        let mut moved = vec![false; self.state.reels.len()];
        for ev in &events {
            if let TweenEvent::Updated { field: TweenField::ReelPosition(i), .. } = ev {
                if let Some(m) = moved.get_mut(*i) {
                    *m = true;
                }
            }
        }

        let size = self.config.symbol_size;
        for (i, reel) in self.state.reels.iter_mut().enumerate() {
            if !moved[i] {
                // Settle the smear left over from the stopping frame.
                if reel.blur_y != 0.0 {
                    reel.update_blur(self.config.blur_multiplier, tick.frame_scale);
                    renderer.set_reel_blur(i, reel.blur_y);
                }
                continue;
            }
            let blur = reel.update_blur(self.config.blur_multiplier, tick.frame_scale);
            renderer.set_reel_blur(i, blur);

            for j in reel.relayout(size) {
                let tex = self.palette.pick(&mut self.rng);
                reel.symbols[j].retexture(tex, self.palette.meta(tex), size);
                debug!("Reel {} symbol {} recycled as '{}'", i, j, self.palette.name(tex));
            }
            for (j, symbol) in reel.symbols.iter().enumerate() {
                renderer.set_symbol(i, j, symbol.placement());
            }
        }

        let mut out = Vec::new();
        for ev in events {
            let TweenEvent::Completed { field: TweenField::ReelPosition(reel), .. } = ev else {
                continue;
            };
            let Some(barrier) = self.state.barrier.as_mut() else {
                continue;
            };
            out.push(SpinEvent::ReelStopped { spin: barrier.spin, reel, at_ms: tick.now_ms });
            barrier.remaining = barrier.remaining.saturating_sub(1);
            if barrier.remaining == 0 {
                let spin = barrier.spin;
                self.state.barrier = None;
                self.state.running = false;
                info!("Spin {} finished at {:.0}ms", spin.0, tick.now_ms);
                out.push(SpinEvent::Finished { spin, at_ms: tick.now_ms });
            }
        }
        out
    }

    /// Textures in the visible rows, one column per reel.
    pub fn visible_grid(&self) -> Vec<Vec<TextureId>> {
        let rows = self.config.visible_rows;
        self.state.reels.iter().map(|r| r.visible(rows, self.config.symbol_size)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assets::{PaletteEntry, TexMeta};
    use crate::reels::render::testing::{Call, RecordingRenderer};

    fn palette() -> Palette {
        Palette::new(
            ["ruby", "leaf", "sun", "skull"]
                .iter()
                .map(|n| PaletteEntry { name: n.to_string(), meta: TexMeta { w: 150, h: 150 } })
                .collect(),
        )
        .unwrap()
    }

    fn engine(config: ReelConfig) -> ReelEngine {
        ReelEngine::with_rng(config, palette(), StdRng::seed_from_u64(1)).unwrap()
    }

    fn at(now_ms: f64) -> FrameTick {
        FrameTick { now_ms, delta_ms: 1000.0 / 60.0, frame_scale: 1.0 }
    }

    #[test]
    fn zero_reels_never_build() {
        let cfg = ReelConfig { reel_count: 0, ..ReelConfig::default() };
        let err = ReelEngine::with_rng(cfg, palette(), StdRng::seed_from_u64(1)).err();
        assert!(matches!(err, Some(EngineError::Config(ConfigError::NoReels(0)))));
    }

    #[test]
    fn zero_reels_refuse_to_spin() {
        let mut e = engine(ReelConfig::default());
        e.state.reels.clear();
        assert!(matches!(e.start_spin(0.0), Err(EngineError::Config(_))));
        assert!(!e.is_running());
    }

    #[test]
    fn start_is_idempotent_while_running() {
        let mut e = engine(ReelConfig::default());
        assert!(e.start_spin(0.0).unwrap().is_some());
        let targets = e.targets();
        assert_eq!(e.active_tweens(), 5);

        assert_eq!(e.start_spin(100.0).unwrap(), None);
        assert_eq!(e.start_spin_with_extras(100.0, &[2; 5]).unwrap(), None);
        assert_eq!(e.targets(), targets);
        assert_eq!(e.active_tweens(), 5);
    }

    #[test]
    fn extras_must_match_reel_count() {
        let mut e = engine(ReelConfig::default());
        assert!(matches!(
            e.start_spin_with_extras(0.0, &[0, 0]),
            Err(EngineError::ExtrasMismatch { expected: 5, got: 2 })
        ));
        assert!(!e.is_running());
    }

    #[test]
    fn random_extras_stay_in_range() {
        let mut e = engine(ReelConfig::default());
        e.start_spin(0.0).unwrap();
        for (i, target) in e.targets() {
            let extra = target - (10.0 + 5.0 * i as f64);
            assert!((0.0..=2.0).contains(&extra), "reel {i} extra {extra}");
        }
    }

    #[test]
    fn five_reel_reference_spin() {
        let mut e = engine(ReelConfig::default());
        let mut r = RecordingRenderer::default();
        let spin = e.start_spin_with_extras(0.0, &[0; 5]).unwrap().unwrap();
        assert_eq!(e.targets(), (0..5).map(|i| (i, 10.0 + 5.0 * i as f64)).collect::<Vec<_>>());

        let mut stops = Vec::new();
        let mut finishes = Vec::new();
        let mut now = 0.0;
        while now <= 5000.0 {
            for ev in e.tick(&at(now), &mut r) {
                match ev {
                    SpinEvent::ReelStopped { reel, at_ms, .. } => stops.push((reel, at_ms)),
                    SpinEvent::Finished { spin: s, at_ms } => finishes.push((s, at_ms)),
                }
            }
            if now < 4900.0 {
                assert!(e.is_running(), "stopped early at {now}");
            }
            now += 100.0;
        }

        assert_eq!(stops, vec![(0, 2500.0), (1, 3100.0), (2, 3700.0), (3, 4300.0), (4, 4900.0)]);
        assert_eq!(finishes, vec![(spin, 4900.0)]);
        assert!(!e.is_running());
        for (i, reel) in e.reels().iter().enumerate() {
            assert_eq!(reel.position, 10.0 + 5.0 * i as f64);
        }
    }

    #[test]
    fn second_spin_starts_from_landed_position() {
        let mut e = engine(ReelConfig::default());
        let mut r = RecordingRenderer::default();
        e.start_spin_with_extras(0.0, &[1; 5]).unwrap();
        e.tick(&at(10_000.0), &mut r);
        assert!(!e.is_running());
        let spin = e.start_spin_with_extras(10_000.0, &[0; 5]).unwrap();
        assert_eq!(spin, Some(SpinId(1)));
        assert_eq!(e.plan(0, 0).target, 11.0 + 10.0);
    }

    #[test]
    fn wrapped_symbols_are_redrawn_from_palette() {
        let cfg = ReelConfig { reel_count: 1, ease: crate::reels::tween::Ease::Linear, ..ReelConfig::default() };
        let mut e = engine(cfg);
        let mut r = RecordingRenderer::default();
        e.start_spin_with_extras(0.0, &[0]).unwrap();
        // Linear over 2500ms to position 10: 0.39 -> 0.41 of the way crosses 3.9 -> 4.1.
        e.tick(&at(975.0), &mut r);
        let before: Vec<_> = e.reels()[0].symbols.iter().map(|s| s.y).collect();
        e.tick(&at(1025.0), &mut r);
        let after: Vec<_> = e.reels()[0].symbols.iter().map(|s| s.y).collect();
        let wrapped = before.iter().zip(&after).filter(|(b, a)| **a < 0.0 && **b > 150.0).count();
        assert_eq!(wrapped, 1);
        for s in &e.reels()[0].symbols {
            assert!(e.palette().contains(s.texture));
        }
    }

    #[test]
    fn blur_is_routed_and_settles() {
        let cfg = ReelConfig { reel_count: 1, base_time_ms: 1000.0, ..ReelConfig::default() };
        let mut e = engine(cfg);
        let mut r = RecordingRenderer::default();
        e.start_spin_with_extras(0.0, &[0]).unwrap();
        e.tick(&at(0.0), &mut r);
        e.tick(&at(500.0), &mut r);
        e.tick(&at(1000.0), &mut r);
        e.tick(&at(1016.0), &mut r);
        let blurs = r.blurs(0);
        assert_eq!(blurs[0], 0.0);
        assert!(blurs[1] > 0.0);
        assert_eq!(*blurs.last().unwrap(), 0.0);
        assert!(r.calls.iter().any(|c| matches!(c, Call::SetSymbol { reel: 0, .. })));
    }

    #[test]
    fn layout_creates_every_display_object() {
        let e = engine(ReelConfig::default());
        let mut r = RecordingRenderer::default();
        e.layout(&mut r);
        let reels: Vec<_> = r
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::CreateReel { reel, x } => Some((*reel, *x)),
                _ => None,
            })
            .collect();
        assert_eq!(reels, (0..5).map(|i| (i, i as f32 * 160.0)).collect::<Vec<_>>());
        assert_eq!(r.calls.iter().filter(|c| matches!(c, Call::CreateSymbol { .. })).count(), 20);
    }

    #[test]
    fn grid_is_reels_by_rows() {
        let e = engine(ReelConfig::default());
        let grid = e.visible_grid();
        assert_eq!(grid.len(), 5);
        assert!(grid.iter().all(|col| col.len() == 3));
    }
}
