use crate::config::{self, Config};
use crate::core::assets::{self, AssetProvider, DiskAssets, LoadedTexture, Palette, TextureId};
use crate::core::clock::{FrameHandler, FrameTick};
use crate::core::gfx::{self as renderer, create_backend, create_headless, BackendType};
use crate::core::input::{self, SlotAction};
use crate::reels::SpinEvent;
use crate::screens::{slots, ScreenAction};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use log::{error, info, warn};
use std::{cell::RefCell, collections::HashMap, error::Error, rc::Rc, sync::Arc};

/// Averages frame rate over one-second windows of clock time.
#[derive(Default)]
pub struct FpsCounter {
    frames: u32,
    window_start_ms: Option<f64>,
    pub fps: f32,
    /// Set when `fps` has been refreshed and not yet shown.
    pub fresh: bool,
}

impl FrameHandler for FpsCounter {
    fn on_frame(&mut self, tick: &FrameTick) {
        self.frames += 1;
        let start = *self.window_start_ms.get_or_insert(tick.now_ms);
        let elapsed = tick.now_ms - start;
        if elapsed >= 1000.0 {
            self.fps = (self.frames as f64 * 1000.0 / elapsed) as f32;
            self.fresh = true;
            self.frames = 0;
            self.window_start_ms = Some(tick.now_ms);
        }
    }
}

pub struct App {
    window: Option<Arc<Window>>,
    backend: Option<renderer::Backend>,
    backend_type: BackendType,
    config: Config,
    loaded: Vec<LoadedTexture>,
    palette: Palette,
    textures: HashMap<TextureId, renderer::Texture>,
    session: Option<slots::State>,
    fps: Rc<RefCell<FpsCounter>>,
    show_stats: bool,
    cursor: (f32, f32),
}

impl App {
    fn new(config: Config, loaded: Vec<LoadedTexture>, palette: Palette) -> Self {
        Self {
            window: None,
            backend: None,
            backend_type: config.video_renderer,
            config,
            loaded,
            palette,
            textures: HashMap::new(),
            session: None,
            fps: Rc::new(RefCell::new(FpsCounter::default())),
            show_stats: false,
            cursor: (0.0, 0.0),
        }
    }

    fn handle_action(&mut self, action: ScreenAction, event_loop: &ActiveEventLoop) {
        match action {
            ScreenAction::Exit => {
                info!("Exit action received. Shutting down.");
                event_loop.exit();
            }
            ScreenAction::None => {}
        }
    }

    fn dispatch(&mut self, action: SlotAction, event_loop: &ActiveEventLoop) {
        if action == SlotAction::ToggleStats {
            self.show_stats = !self.show_stats;
            info!("FPS display {}", if self.show_stats { "ON" } else { "OFF" });
            return;
        }
        let result = match self.session.as_mut() {
            Some(session) => slots::handle_action(session, action),
            None if action == SlotAction::Exit => ScreenAction::Exit,
            None => ScreenAction::None,
        };
        self.handle_action(result, event_loop);
    }

    #[inline(always)]
    fn update_title(&mut self, window: &Window) {
        let status = self.session.as_ref().map_or("Loading", slots::status);
        let mut fps = self.fps.borrow_mut();
        if !fps.fresh {
            return;
        }
        fps.fresh = false;
        if self.show_stats {
            window.set_title(&format!("ReelSpin - {} | {} | {:.2} FPS", self.backend_type, status, fps.fps));
        } else {
            window.set_title(&format!("ReelSpin - {} | {}", self.backend_type, status));
        }
    }

    fn init_graphics(&mut self, event_loop: &ActiveEventLoop) -> Result<(), Box<dyn Error>> {
        let mut window_attributes = Window::default_attributes()
            .with_title(format!("ReelSpin - {}", self.backend_type))
            .with_resizable(true);

        let (window_width, window_height) = (self.config.display_width, self.config.display_height);
        if self.config.windowed {
            window_attributes = window_attributes.with_inner_size(PhysicalSize::new(window_width, window_height));
        } else {
            let monitor = event_loop.primary_monitor();
            if monitor.is_none() {
                warn!("No primary monitor reported; using BORDERLESS fullscreen.");
            }
            window_attributes = window_attributes.with_fullscreen(Some(winit::window::Fullscreen::Borderless(monitor)));
        }

        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let mut backend = create_backend(self.backend_type, window.clone(), self.config.vsync)?;
        self.textures = upload_textures(&mut backend, &self.loaded)?;
        self.loaded.clear();

        let sz = window.inner_size();
        let mut session = slots::init(self.config.reels.clone(), self.palette.clone(), (sz.width as f32, sz.height as f32))?;
        slots::clock_mut(&mut session).subscribe_weak(&self.fps);

        self.session = Some(session);
        self.window = Some(window);
        self.backend = Some(backend);
        info!("Starting event loop...");
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.init_graphics(event_loop) {
                error!("Failed to initialize graphics: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: winit::window::WindowId, event: WindowEvent) {
        let Some(window) = self.window.as_ref().cloned() else { return; };
        if window_id != window.id() { return; }

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested. Shutting down.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    if let Some(backend) = &mut self.backend {
                        backend.resize(new_size.width, new_size.height);
                    }
                    if let Some(session) = &mut self.session {
                        slots::resize(session, new_size.width, new_size.height);
                    }
                }
            }
            WindowEvent::KeyboardInput { event: key_event, .. } => {
                if let Some(action) = input::handle_keyboard_input(&key_event) {
                    self.dispatch(action, event_loop);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if input::is_click(button, state) {
                    let (x, y) = self.cursor;
                    let action = match self.session.as_mut() {
                        Some(session) => slots::handle_click(session, x, y),
                        None => ScreenAction::None,
                    };
                    self.handle_action(action, event_loop);
                }
            }
            WindowEvent::RedrawRequested => {
                let now = std::time::Instant::now();
                let Some(session) = self.session.as_mut() else { return; };
                slots::update(session, now);
                let screen = slots::build(session);
                self.update_title(&window);

                if let Some(backend) = &mut self.backend {
                    if let Err(e) = backend.draw(&screen, &self.textures) {
                        error!("Failed to draw frame: {}", e);
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(backend) = &mut self.backend {
            backend.dispose_textures(&mut self.textures);
            backend.cleanup();
        }
    }
}

fn upload_textures(
    backend: &mut renderer::Backend,
    loaded: &[LoadedTexture],
) -> Result<HashMap<TextureId, renderer::Texture>, Box<dyn Error>> {
    let mut textures = HashMap::with_capacity(loaded.len());
    for (i, tex) in loaded.iter().enumerate() {
        textures.insert(TextureId(i), backend.create_texture(&tex.image)?);
    }
    Ok(textures)
}

/// Decode the palette named by the config. The engine cannot exist without it.
pub fn load_palette(config: &Config) -> Result<(Vec<LoadedTexture>, Palette), Box<dyn Error>> {
    let sources = assets::palette_sources(&config.palette_path)?;
    let loaded = DiskAssets.load_textures(&sources)?;
    let palette = Palette::from_textures(&loaded)?;
    info!("Palette ready with {} symbols.", palette.len());
    Ok((loaded, palette))
}

/// Fixed-step simulation without a window: one spin, then report.
pub fn run_headless(config: &Config, loaded: &[LoadedTexture], palette: Palette) -> Result<u32, Box<dyn Error>> {
    let (w, h) = (config.display_width, config.display_height);
    let mut backend = create_headless(w, h);
    let mut textures = upload_textures(&mut backend, loaded)?;
    let mut session = slots::init(config.reels.clone(), palette, (w as f32, h as f32))?;

    let step_ms = config.reels.reference_frame_ms();
    slots::update_ms(&mut session, 0.0);
    slots::request_spin(&mut session);

    let mut frames = 0;
    for frame in 1..=config.headless_frames {
        let events = slots::update_ms(&mut session, frame as f64 * step_ms);
        backend.draw(&slots::build(&session), &textures)?;
        frames = frame;
        if events.iter().any(|e| matches!(e, SpinEvent::Finished { .. })) {
            break;
        }
    }
    if session.engine.is_running() {
        warn!("Headless run stopped after {} frames with the spin still running.", frames);
    }
    if let Some(stats) = renderer::headless_stats(&backend) {
        info!(
            "Headless: {} frames, {} objects, {} sprites, {} missing textures",
            stats.frames, stats.objects, stats.sprites, stats.missing_textures
        );
    }
    backend.dispose_textures(&mut textures);
    backend.cleanup();
    Ok(frames)
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = config::get();
    let (loaded, palette) = load_palette(&config)?;

    match config.video_renderer {
        BackendType::Headless => {
            run_headless(&config, &loaded, palette)?;
        }
        BackendType::OpenGL => {
            let event_loop = EventLoop::new()?;
            let mut app = App::new(config, loaded, palette);
            event_loop.run_app(&mut app)?;
        }
    }
    Ok(())
}
