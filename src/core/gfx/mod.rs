mod backends;

use crate::core::assets::TextureId;
use crate::core::gfx::backends::{headless, opengl};
use cgmath::Matrix4;
use glow::HasContext;
use image::RgbaImage;
use std::{collections::HashMap, error::Error, str::FromStr, sync::Arc};
use winit::window::Window;

// --- Public Data Contract ---
#[derive(Clone, Debug)]
pub struct RenderList {
    pub clear_color: [f32; 4],
    pub objects: Vec<RenderObject>,
}

#[derive(Clone, Debug)]
pub struct RenderObject {
    pub object_type: ObjectType,
    /// Maps the unit quad (-0.5..0.5) into window pixels.
    pub transform: Matrix4<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjectType {
    Sprite {
        texture_id: TextureId,
        tint: [f32; 4],
        /// Vertical smear in texture space (fraction of the sprite's height).
        blur: f32,
    },
    SolidColor {
        color: [f32; 4],
    },
}

impl RenderList {
    pub fn sprite_count(&self) -> usize {
        self.objects.iter().filter(|o| matches!(o.object_type, ObjectType::Sprite { .. })).count()
    }
}

// --- Public API Facade ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    OpenGL,
    Headless,
}

pub enum Texture {
    OpenGL(opengl::Texture),
    Headless(headless::Texture),
}

// Backend is an enum, not a trait object.
pub enum Backend {
    OpenGL(opengl::State),
    Headless(headless::State),
}

impl Backend {
    /// Returns the number of objects submitted.
    pub fn draw(&mut self, render_list: &RenderList, textures: &HashMap<TextureId, Texture>) -> Result<u32, Box<dyn Error>> {
        match self {
            Backend::OpenGL(state) => opengl::draw(state, render_list, textures),
            Backend::Headless(state) => headless::draw(state, render_list, textures),
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        match self {
            Backend::OpenGL(state) => opengl::resize(state, width, height),
            Backend::Headless(state) => headless::resize(state, width, height),
        }
    }

    pub fn cleanup(&mut self) {
        match self {
            Backend::OpenGL(state) => opengl::cleanup(state),
            Backend::Headless(_) => {}
        }
    }

    pub fn create_texture(&mut self, image: &RgbaImage) -> Result<Texture, Box<dyn Error>> {
        match self {
            Backend::OpenGL(state) => Ok(Texture::OpenGL(opengl::create_texture(&state.gl, image)?)),
            Backend::Headless(state) => Ok(Texture::Headless(headless::create_texture(state, image))),
        }
    }

    pub fn dispose_textures(&mut self, textures: &mut HashMap<TextureId, Texture>) {
        let old_textures = std::mem::take(textures);
        match self {
            Backend::OpenGL(state) => unsafe {
                for tex in old_textures.values() {
                    if let Texture::OpenGL(opengl::Texture(handle)) = tex {
                        state.gl.delete_texture(*handle);
                    }
                }
            },
            Backend::Headless(_) => drop(old_textures),
        }
    }
}

/// Creates and initializes a windowed graphics backend.
pub fn create_backend(backend_type: BackendType, window: Arc<Window>, vsync_enabled: bool) -> Result<Backend, Box<dyn Error>> {
    match backend_type {
        BackendType::OpenGL => Ok(Backend::OpenGL(opengl::init(window, vsync_enabled)?)),
        BackendType::Headless => Err("the headless backend has no window; use create_headless".into()),
    }
}

pub fn create_headless(width: u32, height: u32) -> Backend {
    Backend::Headless(headless::init(width, height))
}

/// Frames, objects and sprites the headless backend has seen.
pub fn headless_stats(backend: &Backend) -> Option<headless::Stats> {
    match backend {
        Backend::Headless(state) => Some(state.stats),
        Backend::OpenGL(_) => None,
    }
}

// -- Boilerplate impls --
impl core::fmt::Display for BackendType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::OpenGL => write!(f, "OpenGL"),
            Self::Headless => write!(f, "Headless"),
        }
    }
}

impl FromStr for BackendType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "opengl" | "gl" => Ok(BackendType::OpenGL),
            "headless" | "none" => Ok(BackendType::Headless),
            _ => Err(format!("'{}' is not a valid video renderer", s)),
        }
    }
}
