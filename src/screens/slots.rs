// FILE: src/screens/slots.rs
use crate::config::ReelConfig;
use crate::core::assets::Palette;
use crate::core::clock::{FrameClock, FrameTick};
use crate::core::gfx::RenderList;
use crate::core::input::SlotAction;
use crate::error::EngineError;
use crate::reels::{ReelEngine, SpinEvent, SpinId};
use crate::scene::Scene;
use crate::screens::ScreenAction;
use log::{error, info};
use std::time::Instant;

pub struct State {
    pub engine: ReelEngine,
    pub scene: Scene,
    clock: FrameClock,
    last_tick: Option<FrameTick>,
    pub spins_finished: u32,
}

pub fn init(config: ReelConfig, palette: Palette, viewport: (f32, f32)) -> Result<State, EngineError> {
    let engine = ReelEngine::new(config, palette)?;
    Ok(with_engine(engine, viewport))
}

/// Wrap an already built engine and lay its reels out.
pub fn with_engine(engine: ReelEngine, viewport: (f32, f32)) -> State {
    let config = engine.config();
    let mut scene = Scene::new(viewport, config);
    let clock = FrameClock::new(config.reference_frame_ms(), config.max_delta_ms);
    engine.layout(&mut scene);
    State { engine, scene, clock, last_tick: None, spins_finished: 0 }
}

#[inline(always)]
pub fn now_ms(state: &State) -> f64 {
    state.last_tick.map_or(0.0, |t| t.now_ms)
}

/// Lets the host hang per-frame observers off the session's clock.
pub fn clock_mut(state: &mut State) -> &mut FrameClock {
    &mut state.clock
}

pub fn status(state: &State) -> &'static str {
    if state.engine.is_running() { "Spinning" } else { "Idle" }
}

/// Start a spin at the current frame time. Ignored while one is running.
pub fn request_spin(state: &mut State) -> Option<SpinId> {
    let now = now_ms(state);
    match state.engine.start_spin(now) {
        Ok(spin) => spin,
        Err(e) => {
            error!("Cannot start spin: {}", e);
            None
        }
    }
}

pub fn handle_action(state: &mut State, action: SlotAction) -> ScreenAction {
    match action {
        SlotAction::Spin => {
            request_spin(state);
            ScreenAction::None
        }
        SlotAction::Exit => ScreenAction::Exit,
        SlotAction::ToggleStats => ScreenAction::None,
    }
}

/// The bottom cover doubles as the spin button.
pub fn handle_click(state: &mut State, x: f32, y: f32) -> ScreenAction {
    if state.scene.bottom_cover_contains(x, y) {
        return handle_action(state, SlotAction::Spin);
    }
    ScreenAction::None
}

pub fn resize(state: &mut State, width: u32, height: u32) {
    let config = state.engine.config().clone();
    state.scene.resize((width as f32, height as f32), &config);
}

pub fn update(state: &mut State, now: Instant) -> Vec<SpinEvent> {
    let tick = state.clock.tick_at(now);
    step(state, tick)
}

/// Fixed-step variant used by the headless runner and tests.
pub fn update_ms(state: &mut State, now_ms: f64) -> Vec<SpinEvent> {
    let tick = state.clock.tick_ms(now_ms);
    step(state, tick)
}

fn step(state: &mut State, tick: FrameTick) -> Vec<SpinEvent> {
    state.last_tick = Some(tick);
    let events = state.engine.tick(&tick, &mut state.scene);
    state.clock.fire(&tick);
    for ev in &events {
        match *ev {
            SpinEvent::ReelStopped { spin, reel, at_ms } => {
                info!("Spin {}: reel {} stopped at {:.0}ms", spin.0, reel, at_ms);
            }
            SpinEvent::Finished { spin, .. } => {
                state.spins_finished += 1;
                info!("Spin {} result:\n{}", spin.0, describe_grid(state));
            }
        }
    }
    events
}

/// Visible symbols by row, reels left to right.
pub fn describe_grid(state: &State) -> String {
    let grid = state.engine.visible_grid();
    let palette = state.engine.palette();
    let rows = grid.iter().map(Vec::len).max().unwrap_or(0);
    (0..rows)
        .map(|row| {
            grid.iter()
                .map(|col| col.get(row).map_or("-", |&t| palette.name(t)))
                .map(|name| format!("{name:>8}"))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build(state: &State) -> RenderList {
    state.scene.build_render_list(state.engine.palette())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assets::{PaletteEntry, TexMeta};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn session() -> State {
        let palette = Palette::new(
            ["a", "b", "c"]
                .iter()
                .map(|n| PaletteEntry { name: n.to_string(), meta: TexMeta { w: 100, h: 100 } })
                .collect(),
        )
        .unwrap();
        let engine = ReelEngine::with_rng(ReelConfig::default(), palette, StdRng::seed_from_u64(9)).unwrap();
        with_engine(engine, (1024.0, 768.0))
    }

    #[test]
    fn spin_runs_to_completion() {
        let mut s = session();
        update_ms(&mut s, 0.0);
        assert_eq!(handle_action(&mut s, SlotAction::Spin), ScreenAction::None);
        assert_eq!(status(&s), "Spinning");

        let mut now = 0.0;
        let mut finished = 0;
        while now < 8000.0 {
            now += 1000.0 / 60.0;
            finished += update_ms(&mut s, now).iter().filter(|e| matches!(e, SpinEvent::Finished { .. })).count();
        }
        assert_eq!(finished, 1);
        assert_eq!(s.spins_finished, 1);
        assert_eq!(status(&s), "Idle");
        assert_eq!(describe_grid(&s).lines().count(), 3);
    }

    #[test]
    fn clicks_outside_the_button_do_nothing() {
        let mut s = session();
        handle_click(&mut s, 500.0, 300.0);
        assert!(!s.engine.is_running());
        handle_click(&mut s, 500.0, 700.0);
        assert!(s.engine.is_running());
    }

    #[test]
    fn escape_exits() {
        let mut s = session();
        assert_eq!(handle_action(&mut s, SlotAction::Exit), ScreenAction::Exit);
    }

    #[test]
    fn render_list_tracks_scene() {
        let s = session();
        let list = build(&s);
        assert_eq!(list.sprite_count(), 20);
    }
}
