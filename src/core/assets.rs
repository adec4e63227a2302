// src/core/assets.rs
use crate::error::AssetError;
use image::{Rgba, RgbaImage};
use log::{info, warn};
use rand::Rng;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TexMeta { pub w: u32, pub h: u32 }

/// Index into the symbol palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// Where a symbol texture comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum TextureSource {
    File { name: String, path: PathBuf },
    /// Procedurally drawn symbol; `kind` picks the shape and color.
    Generated { name: String, kind: usize, w: u32, h: u32 },
}

impl TextureSource {
    pub fn name(&self) -> &str {
        match self {
            TextureSource::File { name, .. } | TextureSource::Generated { name, .. } => name,
        }
    }
}

pub struct LoadedTexture {
    pub name: String,
    pub image: RgbaImage,
}

impl LoadedTexture {
    pub fn width(&self) -> u32 { self.image.width() }
    pub fn height(&self) -> u32 { self.image.height() }
    pub fn meta(&self) -> TexMeta { TexMeta { w: self.width(), h: self.height() } }
}

/// Hands the engine an ordered set of decoded textures.
pub trait AssetProvider {
    fn load_textures(&mut self, sources: &[TextureSource]) -> Result<Vec<LoadedTexture>, AssetError>;
}

/// Decodes image files with the `image` crate; also draws generated symbols.
#[derive(Default)]
pub struct DiskAssets;

impl AssetProvider for DiskAssets {
    fn load_textures(&mut self, sources: &[TextureSource]) -> Result<Vec<LoadedTexture>, AssetError> {
        let mut out = Vec::with_capacity(sources.len());
        for src in sources {
            let image = match src {
                TextureSource::File { path, .. } => {
                    let img = image::open(path).map_err(|e| AssetError::Decode { path: path.clone(), source: e })?;
                    img.to_rgba8()
                }
                TextureSource::Generated { kind, w, h, .. } => generate_symbol(*kind, *w, *h),
            };
            if image.width() == 0 || image.height() == 0 {
                return Err(AssetError::EmptyTexture(src.name().to_string()));
            }
            info!("Loaded symbol texture '{}' ({}x{})", src.name(), image.width(), image.height());
            out.push(LoadedTexture { name: src.name().to_string(), image });
        }
        Ok(out)
    }
}

/* --------------------------- palette manifest --------------------------- */

#[derive(Deserialize, Debug)]
struct ManifestEntry {
    name: String,
    path: PathBuf,
}

#[derive(Deserialize, Debug)]
struct Manifest {
    symbols: Vec<ManifestEntry>,
}

/// Read `palette.json`; entry paths are relative to the manifest's directory.
pub fn read_manifest(path: &Path) -> Result<Vec<TextureSource>, AssetError> {
    let text = fs::read_to_string(path).map_err(|e| AssetError::Manifest { path: path.to_path_buf(), source: e })?;
    parse_manifest(&text, path)
}

fn parse_manifest(text: &str, path: &Path) -> Result<Vec<TextureSource>, AssetError> {
    let manifest: Manifest = serde_json::from_str(text)
        .map_err(|e| AssetError::ManifestFormat { path: path.to_path_buf(), source: e })?;
    let base = path.parent().unwrap_or(Path::new(""));
    Ok(manifest
        .symbols
        .into_iter()
        .map(|e| TextureSource::File { name: e.name, path: base.join(e.path) })
        .collect())
}

/// The four built-in symbols used when no manifest is present.
pub fn builtin_sources() -> Vec<TextureSource> {
    const BUILTIN: [(&str, u32, u32); 4] = [("ruby", 128, 128), ("leaf", 96, 128), ("sun", 160, 160), ("skull", 128, 112)];
    BUILTIN
        .iter()
        .enumerate()
        .map(|(kind, &(name, w, h))| TextureSource::Generated { name: name.to_string(), kind, w, h })
        .collect()
}

/// Manifest sources if the file exists, otherwise the built-in set.
pub fn palette_sources(manifest: &Path) -> Result<Vec<TextureSource>, AssetError> {
    if manifest.exists() {
        read_manifest(manifest)
    } else {
        warn!("Palette manifest {:?} not found; using built-in symbols.", manifest);
        Ok(builtin_sources())
    }
}

const SYMBOL_COLORS: [[u8; 3]; 6] = [
    [0xFF, 0x3C, 0x23],
    [0x5C, 0xE0, 0x87],
    [0xFF, 0xBE, 0x00],
    [0xDD, 0x57, 0xFF],
    [0x00, 0xAD, 0xC0],
    [0xFF, 0x47, 0xB3],
];

/// Flat-shaded symbol: disc, diamond, ring or square depending on `kind`.
pub fn generate_symbol(kind: usize, w: u32, h: u32) -> RgbaImage {
    let [r, g, b] = SYMBOL_COLORS[kind % SYMBOL_COLORS.len()];
    let (cx, cy) = (w as f32 * 0.5, h as f32 * 0.5);
    let radius = cx.min(cy) * 0.9;
    RgbaImage::from_fn(w, h, |x, y| {
        let dx = (x as f32 + 0.5 - cx) / radius;
        let dy = (y as f32 + 0.5 - cy) / radius;
        let inside = match kind % 4 {
            0 => dx * dx + dy * dy <= 1.0,
            1 => dx.abs() + dy.abs() <= 1.0,
            2 => {
                let d = dx * dx + dy * dy;
                (0.36..=1.0).contains(&d)
            }
            _ => dx.abs() <= 0.8 && dy.abs() <= 0.8,
        };
        if inside { Rgba([r, g, b, 255]) } else { Rgba([0, 0, 0, 0]) }
    })
}

/* -------------------------------- palette -------------------------------- */

#[derive(Clone, Debug)]
pub struct PaletteEntry {
    pub name: String,
    pub meta: TexMeta,
}

/// Fixed, ordered, non-empty set of symbol textures.
#[derive(Clone, Debug)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    pub fn new(entries: Vec<PaletteEntry>) -> Result<Self, AssetError> {
        if entries.is_empty() {
            return Err(AssetError::EmptyPalette);
        }
        Ok(Self { entries })
    }

    pub fn from_textures(textures: &[LoadedTexture]) -> Result<Self, AssetError> {
        Self::new(textures.iter().map(|t| PaletteEntry { name: t.name.clone(), meta: t.meta() }).collect())
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Panics on an id this palette never handed out.
    pub fn meta(&self, id: TextureId) -> TexMeta {
        self.entries[id.0].meta
    }

    pub fn name(&self, id: TextureId) -> &str {
        &self.entries[id.0].name
    }

    pub fn contains(&self, id: TextureId) -> bool {
        id.0 < self.entries.len()
    }

    /// Uniform draw over the palette.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> TextureId {
        TextureId(rng.random_range(0..self.entries.len()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureId, &PaletteEntry)> {
        self.entries.iter().enumerate().map(|(i, e)| (TextureId(i), e))
    }
}
