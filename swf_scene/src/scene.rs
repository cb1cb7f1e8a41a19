//! Everything a scene builder needs from a movie, in one value: resolved
//! shape geometry, timelines, and the bitmap and sound payloads.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    bitmap::BitmapPayload,
    display_list::{CharacterLibrary, Timeline, interpret_movie},
    error::{Error, Result, Warning},
    movie::{Header, Movie},
    shape::{
        Shape,
        edge_map::{EdgeMap, InvalidStyleIndex, build_edge_maps, calculate_edge_bounds},
        path::{GroupPaths, create_paths},
    },
    sound::SoundStreamInfo,
    style::{ResolvedStyles, StyleResolver, gamma_correct},
    tag::{Tag, TagCode},
    types::{CharacterId, Rectangle},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneOptions {
    /// Scale applied to translations and stroke widths. `1 / 20` yields pixels.
    pub units_per_twip: f32,
    /// Chain edge maps into paths. Without it only the edge maps are output.
    pub build_paths: bool,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            units_per_twip: 1.0 / 20.0,
            build_paths: true,
        }
    }
}

/// One style vocabulary of a shape with the edges drawn under it.
#[derive(Clone, Debug, Serialize)]
pub struct ShapeGroup {
    pub styles: ResolvedStyles,
    pub fills: EdgeMap,
    pub lines: EdgeMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<GroupPaths>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ShapeGeometry {
    pub id: CharacterId,
    pub version: u8,
    /// Bounds as declared, stroke widths included.
    pub bounds: Rectangle,
    /// Bounds of the edges themselves.
    pub edge_bounds: Rectangle,
    pub groups: Vec<ShapeGroup>,
    /// Style changes pointing past their style table.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid_styles: Vec<InvalidStyleIndex>,
}

#[derive(Debug, Serialize)]
pub struct SoundStreamEntry {
    /// `None` for the root timeline.
    pub timeline: Option<CharacterId>,
    #[serde(flatten)]
    pub info: SoundStreamInfo,
}

#[derive(Debug, Serialize)]
pub struct Scene<'a> {
    pub header: Header,
    pub width: f64,
    pub height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<[f32; 4]>,
    pub library: CharacterLibrary,
    pub shapes: BTreeMap<CharacterId, ShapeGeometry>,
    pub root: Timeline<'a>,
    pub sprites: BTreeMap<CharacterId, Timeline<'a>>,
    pub bitmaps: Vec<BitmapPayload<'a>>,
    pub sound_streams: Vec<SoundStreamEntry>,
    pub warnings: Vec<Warning>,
}

impl<'a> Scene<'a> {
    pub fn shape(&self, id: CharacterId) -> Option<&ShapeGeometry> {
        self.shapes.get(&id)
    }

    pub fn bitmap(&self, id: CharacterId) -> Option<&BitmapPayload<'a>> {
        self.bitmaps.iter().find(|bitmap| bitmap.id == id)
    }

    pub fn timeline(&self, id: Option<CharacterId>) -> Option<&Timeline<'a>> {
        match id {
            None => Some(&self.root),
            Some(id) => self.sprites.get(&id),
        }
    }
}

/// Resolves one shape into edge map groups, styles and (optionally) paths.
pub fn build_shape_geometry(shape: &Shape<'_>, options: &SceneOptions) -> Result<ShapeGeometry> {
    let edge_groups = build_edge_maps(shape)?;
    let edge_bounds = calculate_edge_bounds(&edge_groups);
    let resolver = StyleResolver::new(options.units_per_twip);
    let invalid_styles = edge_groups
        .iter()
        .flat_map(|group| group.invalid_styles.iter().copied())
        .collect();
    let groups = edge_groups
        .into_iter()
        .map(|group| ShapeGroup {
            styles: resolver.resolve_group(&group),
            paths: options.build_paths.then(|| create_paths(&group)),
            fills: group.fills,
            lines: group.lines,
        })
        .collect();
    Ok(ShapeGeometry {
        id: shape.id,
        version: shape.version,
        bounds: shape.shape_bounds,
        edge_bounds,
        groups,
        invalid_styles,
    })
}

fn shape_tag_code(version: u8) -> u16 {
    let code = match version {
        1 => TagCode::DefineShape,
        2 => TagCode::DefineShape2,
        3 => TagCode::DefineShape3,
        _ => TagCode::DefineShape4,
    };
    code as u16
}

#[derive(Default)]
struct Definitions<'a> {
    shapes: BTreeMap<CharacterId, ShapeGeometry>,
    bitmaps: Vec<BitmapPayload<'a>>,
    jpeg_tables: Option<&'a [u8]>,
    background_color: Option<[f32; 4]>,
    warnings: Vec<Warning>,
}

impl<'a> Definitions<'a> {
    fn collect(&mut self, tags: &[Tag<'a>], options: &SceneOptions) {
        for (position, tag) in tags.iter().enumerate() {
            match tag {
                Tag::DefineShape(shape) => match build_shape_geometry(shape, options) {
                    Ok(geometry) => {
                        for invalid in &geometry.invalid_styles {
                            let error = Error::malformed(format!("shape {}: {}", shape.id, invalid));
                            self.warnings
                                .push(Warning::new(position, shape_tag_code(shape.version), &error));
                        }
                        self.shapes.insert(shape.id, geometry);
                    }
                    Err(e) => {
                        warn!("Shape {} dropped: {}", shape.id, e);
                        self.warnings
                            .push(Warning::new(position, shape_tag_code(shape.version), &e));
                    }
                },
                Tag::DefineSprite(sprite) => self.collect(&sprite.tags, options),
                Tag::JpegTables(data) => self.jpeg_tables = Some(*data),
                Tag::DefineBitsJpeg(bits) => {
                    self.bitmaps.push(BitmapPayload::from_jpeg(bits, self.jpeg_tables));
                }
                Tag::DefineBitsLossless(bits) => self.bitmaps.push(BitmapPayload::from_lossless(bits)),
                Tag::SetBackgroundColor(color) => self.background_color = Some(gamma_correct(*color)),
                _ => {}
            }
        }
    }
}

/// Builds the scene of a parsed movie. Shapes whose records turn out to be
/// malformed are left out and reported as warnings; display list errors fail
/// the whole build.
pub fn build_scene<'a>(movie: &Movie<'a>, options: &SceneOptions) -> Result<Scene<'a>> {
    let interpreted = interpret_movie(&movie.tags, movie.header.num_frames)?;

    let mut definitions = Definitions::default();
    definitions.collect(&movie.tags, options);

    let mut warnings = movie.warnings.clone();
    warnings.append(&mut definitions.warnings);

    let sound_streams = std::iter::once(&interpreted.root)
        .chain(interpreted.sprites.values())
        .filter_map(|timeline| {
            timeline.sound_stream.as_ref().map(|stream| SoundStreamEntry {
                timeline: timeline.id,
                info: SoundStreamInfo::from(stream),
            })
        })
        .collect();

    debug!(
        "Scene: {} shape(s), {} sprite(s), {} bitmap(s), {} frame(s), {} warning(s)",
        definitions.shapes.len(),
        interpreted.sprites.len(),
        definitions.bitmaps.len(),
        interpreted.root.frames.len(),
        warnings.len()
    );
    Ok(Scene {
        header: movie.header.clone(),
        width: movie.header.width_px(),
        height: movie.header.height_px(),
        background_color: definitions.background_color,
        library: interpreted.library,
        shapes: definitions.shapes,
        root: interpreted.root,
        sprites: interpreted.sprites,
        bitmaps: definitions.bitmaps,
        sound_streams,
        warnings,
    })
}
