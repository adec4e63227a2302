// src/core/gfx/backends/opengl.rs
use crate::core::assets::TextureId;
use crate::core::gfx::{self as renderer, ObjectType, RenderList};
use crate::core::space::ortho_for_window;
use cgmath::Matrix4;
use glow::{HasContext, PixelUnpackData, UniformLocation};
use glutin::{
    config::ConfigTemplateBuilder,
    context::{ContextAttributesBuilder, PossiblyCurrentContext},
    display::{Display, DisplayApiPreference},
    prelude::*,
    surface::{Surface, SurfaceAttributesBuilder, SwapInterval, WindowSurface},
};
use image::RgbaImage;
use log::{info, warn};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawWindowHandle};
use std::{collections::HashMap, error::Error, ffi::CStr, mem, num::NonZeroU32, sync::Arc};
use winit::window::Window;

// A handle to an OpenGL texture on the GPU.
#[derive(Debug, Clone, Copy)]
pub struct Texture(pub glow::Texture);

struct Uniforms {
    mvp: UniformLocation,
    color: UniformLocation,
    use_texture: UniformLocation,
    texture: UniformLocation,
    blur: UniformLocation,
}

pub struct State {
    pub gl: glow::Context,
    gl_surface: Surface<WindowSurface>,
    gl_context: PossiblyCurrentContext,
    program: glow::Program,
    uniforms: Uniforms,
    projection: Matrix4<f32>,
    window_size: (u32, u32),
    shared_vao: glow::VertexArray,
    shared_vbo: glow::Buffer,
    shared_ibo: glow::Buffer,
    index_count: i32,
}

pub fn init(window: Arc<Window>, vsync_enabled: bool) -> Result<State, Box<dyn Error>> {
    info!("Initializing OpenGL backend...");

    let (gl_surface, gl_context, gl) = create_opengl_context(&window, vsync_enabled)?;
    let (program, uniforms) = create_graphics_program(&gl)?;

    // One unit quad shared by every object. Window space is y-down, so v follows y.
    let (shared_vao, shared_vbo, shared_ibo, index_count) = unsafe {
        const UNIT_QUAD_VERTICES: [[f32; 4]; 4] = [
            [-0.5, -0.5, 0.0, 0.0],
            [ 0.5, -0.5, 1.0, 0.0],
            [ 0.5,  0.5, 1.0, 1.0],
            [-0.5,  0.5, 0.0, 1.0],
        ];
        const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

        let vao = gl.create_vertex_array()?;
        let vbo = gl.create_buffer()?;
        let ibo = gl.create_buffer()?;

        gl.bind_vertex_array(Some(vao));

        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&UNIT_QUAD_VERTICES), glow::STATIC_DRAW);

        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
        gl.buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&QUAD_INDICES), glow::STATIC_DRAW);

        let stride = (4 * mem::size_of::<f32>()) as i32;
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 2, glow::FLOAT, false, stride, (2 * mem::size_of::<f32>()) as i32);

        gl.bind_vertex_array(None);

        (vao, vbo, ibo, QUAD_INDICES.len() as i32)
    };

    let initial_size = window.inner_size();
    let projection = ortho_for_window(initial_size.width, initial_size.height);

    unsafe {
        gl.viewport(0, 0, initial_size.width as i32, initial_size.height as i32);
        gl.use_program(Some(program));
        gl.active_texture(glow::TEXTURE0);
        gl.uniform_1_i32(Some(&uniforms.texture), 0);
        gl.uniform_1_f32(Some(&uniforms.blur), 0.0);
        gl.use_program(None);
    }

    info!("OpenGL backend initialized successfully.");
    Ok(State {
        gl,
        gl_surface,
        gl_context,
        program,
        uniforms,
        projection,
        window_size: (initial_size.width, initial_size.height),
        shared_vao,
        shared_vbo,
        shared_ibo,
        index_count,
    })
}

pub fn create_texture(gl: &glow::Context, image: &RgbaImage) -> Result<Texture, String> {
    unsafe {
        let t = gl.create_texture()?;
        gl.bind_texture(glow::TEXTURE_2D, Some(t));

        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);

        // The blur samples past the sprite's edges; clamp keeps them transparent.
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, glow::LINEAR as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_BASE_LEVEL, 0);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, 0);

        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            glow::SRGB8_ALPHA8 as i32,
            image.width() as i32,
            image.height() as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            PixelUnpackData::Slice(Some(image.as_raw().as_slice())),
        );

        gl.bind_texture(glow::TEXTURE_2D, None);
        Ok(Texture(t))
    }
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

    let mut drawn = 0u32;
    unsafe {
        let gl = &state.gl;
        let u = &state.uniforms;
        let c = render_list.clear_color;
        gl.clear_color(c[0], c[1], c[2], c[3]);
        gl.clear(glow::COLOR_BUFFER_BIT);

        gl.use_program(Some(state.program));
        gl.enable(glow::BLEND);
        gl.blend_equation(glow::FUNC_ADD);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
        gl.active_texture(glow::TEXTURE0);
        gl.bind_vertex_array(Some(state.shared_vao));

        let mut last_bound_tex: Option<glow::Texture> = None;
        let mut last_use_texture: Option<bool> = None;
        let mut last_blur: Option<f32> = None;

        for object in &render_list.objects {
            let mvp_array: [[f32; 4]; 4] = (state.projection * object.transform).into();
            gl.uniform_matrix_4_f32_slice(Some(&u.mvp), false, bytemuck::cast_slice(&mvp_array));

            match &object.object_type {
                ObjectType::SolidColor { color } => {
                    if last_use_texture != Some(false) {
                        gl.uniform_1_i32(Some(&u.use_texture), 0);
                        last_use_texture = Some(false);
                    }
                    gl.uniform_4_f32_slice(Some(&u.color), color);
                }
                ObjectType::Sprite { texture_id, tint, blur } => {
                    let Some(renderer::Texture::OpenGL(tex)) = textures.get(texture_id) else {
                        continue;
                    };
                    if last_use_texture != Some(true) {
                        gl.uniform_1_i32(Some(&u.use_texture), 1);
                        last_use_texture = Some(true);
                    }
                    if last_bound_tex != Some(tex.0) {
                        gl.bind_texture(glow::TEXTURE_2D, Some(tex.0));
                        last_bound_tex = Some(tex.0);
                    }
                    if last_blur != Some(*blur) {
                        gl.uniform_1_f32(Some(&u.blur), *blur);
                        last_blur = Some(*blur);
                    }
                    gl.uniform_4_f32_slice(Some(&u.color), tint);
                }
            }

            gl.draw_elements(glow::TRIANGLES, state.index_count, glow::UNSIGNED_SHORT, 0);
            drawn += 1;
        }

        gl.bind_vertex_array(None);
    }

    state.gl_surface.swap_buffers(&state.gl_context)?;
    Ok(drawn)
}

pub fn resize(state: &mut State, width: u32, height: u32) {
    if let (Some(width_nz), Some(height_nz)) = (NonZeroU32::new(width), NonZeroU32::new(height)) {
        state.gl_surface.resize(&state.gl_context, width_nz, height_nz);
        unsafe {
            state.gl.viewport(0, 0, width as i32, height as i32);
        }
        state.projection = ortho_for_window(width, height);
        state.window_size = (width, height);
    } else {
        warn!("Ignoring resize to zero dimensions.");
    }
}

pub fn cleanup(state: &mut State) {
    info!("Cleaning up OpenGL resources...");
    // Textures belong to the app and are disposed there.
    unsafe {
        state.gl.delete_program(state.program);
        state.gl.delete_vertex_array(state.shared_vao);
        state.gl.delete_buffer(state.shared_vbo);
        state.gl.delete_buffer(state.shared_ibo);
    }
}

#[cfg(target_os = "windows")]
fn display_preference(window: RawWindowHandle) -> DisplayApiPreference {
    info!("Using WGL display for OpenGL context.");
    DisplayApiPreference::Wgl(Some(window))
}

#[cfg(target_os = "macos")]
fn display_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    info!("Using CGL display for OpenGL context.");
    DisplayApiPreference::Cgl
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn display_preference(_window: RawWindowHandle) -> DisplayApiPreference {
    info!("Using EGL display for OpenGL context.");
    DisplayApiPreference::Egl
}

fn create_opengl_context(
    window: &Window,
    vsync_enabled: bool,
) -> Result<(Surface<WindowSurface>, PossiblyCurrentContext, glow::Context), Box<dyn Error>> {
    let display_handle = window.display_handle()?.as_raw();
    let raw_window_handle = window.window_handle()?.as_raw();
    let display = unsafe { Display::new(display_handle, display_preference(raw_window_handle))? };

    let template = ConfigTemplateBuilder::new().with_alpha_size(8).build();
    let config = unsafe { display.find_configs(template)?.next() }.ok_or("Failed to find a suitable GL config")?;

    let (width, height): (u32, u32) = window.inner_size().into();
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new().build(
        raw_window_handle,
        NonZeroU32::new(width).ok_or("window has zero width")?,
        NonZeroU32::new(height).ok_or("window has zero height")?,
    );
    let surface = unsafe { display.create_window_surface(&config, &surface_attributes)? };

    let context_attributes = ContextAttributesBuilder::new().build(Some(raw_window_handle));
    let context = unsafe { display.create_context(&config, &context_attributes)? }.make_current(&surface)?;

    let interval = if vsync_enabled { SwapInterval::Wait(NonZeroU32::MIN) } else { SwapInterval::DontWait };
    match surface.set_swap_interval(&context, interval) {
        Ok(()) => info!("VSync {}", if vsync_enabled { "on" } else { "off" }),
        Err(e) => warn!("Failed to set swap interval ({}). VSync state may not be as requested.", e),
    }

    unsafe {
        let gl = glow::Context::from_loader_function_cstr(|s: &CStr| display.get_proc_address(s));
        gl.enable(glow::FRAMEBUFFER_SRGB);
        Ok((surface, context, gl))
    }
}

fn create_graphics_program(gl: &glow::Context) -> Result<(glow::Program, Uniforms), String> {
    unsafe {
        let program = gl.create_program()?;
        let shader_sources = [
            (glow::VERTEX_SHADER, include_str!("../shaders/sprite.vert")),
            (glow::FRAGMENT_SHADER, include_str!("../shaders/sprite.frag")),
        ];

        let mut shaders = Vec::with_capacity(shader_sources.len());
        for (shader_type, shader_source) in shader_sources.iter() {
            let shader = gl.create_shader(*shader_type)?;
            gl.shader_source(shader, shader_source);
            gl.compile_shader(shader);
            if !gl.get_shader_compile_status(shader) {
                return Err(gl.get_shader_info_log(shader));
            }
            gl.attach_shader(program, shader);
            shaders.push(shader);
        }

        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            return Err(gl.get_program_info_log(program));
        }
        for shader in shaders {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }

        let find = |name: &str| gl.get_uniform_location(program, name).ok_or_else(|| format!("missing uniform {name}"));
        let uniforms = Uniforms {
            mvp: find("u_model_view_proj")?,
            color: find("u_color")?,
            use_texture: find("u_use_texture")?,
            texture: find("u_texture")?,
            blur: find("u_blur")?,
        };
        Ok((program, uniforms))
    }
}

mod bytemuck {
    // Only used for f32/u16 -> u8, where alignment always works out.
    #[inline(always)]
    pub fn cast_slice<T, U>(slice: &[T]) -> &[U] {
        let (prefix, mid, suffix) = unsafe { slice.align_to::<U>() };
        debug_assert!(prefix.is_empty() && suffix.is_empty(), "cast_slice: misaligned cast");
        mid
    }
}
