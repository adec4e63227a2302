// src/core/gfx/backends/headless.rs
use crate::core::assets::TextureId;
use crate::core::gfx::{self as renderer, ObjectType, RenderList};
use image::RgbaImage;
use log::{debug, warn};
use std::collections::HashMap;
use std::error::Error;

/// Size of an uploaded texture; nothing else is kept.
#[derive(Debug, Clone, Copy)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub frames: u64,
    pub objects: u64,
    pub sprites: u64,
    pub missing_textures: u64,
}

pub struct State {
    window_size: (u32, u32),
    pub stats: Stats,
}

pub fn init(width: u32, height: u32) -> State {
    debug!("Headless backend at {}x{}", width, height);
    State { window_size: (width, height), stats: Stats::default() }
}

pub fn create_texture(_state: &mut State, image: &RgbaImage) -> Texture {
    Texture { width: image.width(), height: image.height() }
}

pub fn draw(
    state: &mut State,
    render_list: &RenderList,
    textures: &HashMap<TextureId, renderer::Texture>,
) -> Result<u32, Box<dyn Error>> {
    let (width, height) = state.window_size;
    if width == 0 || height == 0 {
        return Ok(0);
    }
    for object in &render_list.objects {
        if let ObjectType::Sprite { texture_id, .. } = &object.object_type {
            state.stats.sprites += 1;
            if !matches!(textures.get(texture_id), Some(renderer::Texture::Headless(_))) {
                state.stats.missing_textures += 1;
            }
        }
    }
    state.stats.frames += 1;
    state.stats.objects += render_list.objects.len() as u64;
    Ok(render_list.objects.len() as u32)
}

pub fn resize(state: &mut State, width: u32, height: u32) {
    if width > 0 && height > 0 {
        state.window_size = (width, height);
    } else {
        warn!("Ignoring resize to zero dimensions.");
    }
}
