use num_traits::FromPrimitive;
use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Result, Warning},
    read::Reader,
    shape::{Shape, ShapeFlag, ShapeStyles, records::ShapeRecords},
    sound::{AudioCompression, SoundFormat, SoundStreamHead},
    tag::{
        DefineBitsJpeg, DefineBitsLossless, Filter, FilterKind, FrameLabel, LosslessFormat,
        OpaqueTag, PlaceFlag, PlaceObject, PlaceObjectAction, RemoveObject, Sprite, Tag, TagCode,
    },
    types::{BlendMode, Fixed8},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagHeader {
    pub code: u16,
    pub length: usize,
    /// Whether the length was stored in the 32-bit long form.
    pub is_long: bool,
}

impl TagHeader {
    pub fn header_len(&self) -> usize {
        if self.is_long { 6 } else { 2 }
    }
}

/// Upper 10 bits are the tag code, lower 6 bits the length. A length of
/// 0x3F means the real length follows as a u32.
pub fn read_tag_header(reader: &mut Reader<'_>) -> Result<TagHeader> {
    let code_and_length = reader.read_u16()?;
    let code = code_and_length >> 6;
    let length = code_and_length & 0b11_1111;
    if length == 0b11_1111 {
        Ok(TagHeader {
            code,
            length: reader.read_u32()? as usize,
            is_long: true,
        })
    } else {
        Ok(TagHeader {
            code,
            length: usize::from(length),
            is_long: false,
        })
    }
}

/// Decodes tags until an End tag or the end of the input.
///
/// A tag whose declared length runs past the input is fatal. A tag whose body
/// fails to decode is kept as [`Tag::Opaque`] and reported in `warnings`.
pub fn decode_tags<'a>(reader: &mut Reader<'a>, warnings: &mut Vec<Warning>) -> Result<Vec<Tag<'a>>> {
    let mut tags = Vec::new();
    while !reader.is_empty() {
        let offset = reader.position();
        let header = read_tag_header(reader)?;
        let available = reader.remaining();
        if header.length > available {
            return Err(Error::TruncatedTag {
                code: header.code,
                offset,
                length: header.length,
                available,
            });
        }
        let body = reader.read_slice(header.length)?;
        let position = tags.len();

        let tag = match decode_tag(header.code, body, reader.version(), warnings) {
            Ok(tag) => tag,
            Err(e) => {
                warn!("Tag #{} (code {}) kept opaque: {}", position, header.code, e);
                warnings.push(Warning::new(position, header.code, &e));
                Tag::Opaque(OpaqueTag {
                    code: header.code,
                    data: body,
                })
            }
        };
        trace!("Tag #{} {} ({} bytes)", position, tag.name(), header.length);

        let is_end = matches!(tag, Tag::End);
        tags.push(tag);
        if is_end {
            break;
        }
    }
    Ok(tags)
}

fn decode_tag<'a>(
    code: u16,
    body: &'a [u8],
    version: u8,
    warnings: &mut Vec<Warning>,
) -> Result<Tag<'a>> {
    let opaque = Tag::Opaque(OpaqueTag { code, data: body });
    let Some(tag_code) = TagCode::from_u16(code) else {
        debug!("Unknown tag code {}", code);
        return Ok(opaque);
    };

    let reader = &mut Reader::new(body, version);
    let tag = match tag_code {
        TagCode::End => Tag::End,
        TagCode::ShowFrame => Tag::ShowFrame,
        TagCode::DefineShape => decode_define_shape(reader, 1)?,
        TagCode::DefineShape2 => decode_define_shape(reader, 2)?,
        TagCode::DefineShape3 => decode_define_shape(reader, 3)?,
        TagCode::DefineShape4 => decode_define_shape(reader, 4)?,
        TagCode::DefineSprite => decode_define_sprite(reader, warnings)?,
        TagCode::PlaceObject => decode_place_object(reader)?,
        TagCode::PlaceObject2 => decode_place_object_2_or_3(reader, 2)?,
        TagCode::PlaceObject3 => decode_place_object_2_or_3(reader, 3)?,
        TagCode::RemoveObject => {
            let character_id = reader.read_u16()?;
            let depth = reader.read_u16()?;
            Tag::RemoveObject(RemoveObject {
                depth,
                character_id: Some(character_id),
            })
        }
        TagCode::RemoveObject2 => Tag::RemoveObject(RemoveObject {
            depth: reader.read_u16()?,
            character_id: None,
        }),
        TagCode::SetBackgroundColor => Tag::SetBackgroundColor(reader.read_rgb()?),
        TagCode::FrameLabel => decode_frame_label(reader)?,
        TagCode::JpegTables => Tag::JpegTables(reader.read_to_end()),
        TagCode::DefineBits => decode_define_bits_jpeg(reader, 1)?,
        TagCode::DefineBitsJpeg2 => decode_define_bits_jpeg(reader, 2)?,
        TagCode::DefineBitsJpeg3 => decode_define_bits_jpeg(reader, 3)?,
        TagCode::DefineBitsJpeg4 => decode_define_bits_jpeg(reader, 4)?,
        TagCode::DefineBitsLossless => decode_define_bits_lossless(reader, 1)?,
        TagCode::DefineBitsLossless2 => decode_define_bits_lossless(reader, 2)?,
        TagCode::SoundStreamHead => decode_sound_stream_head(reader, 1)?,
        TagCode::SoundStreamHead2 => decode_sound_stream_head(reader, 2)?,
        TagCode::SoundStreamBlock => Tag::SoundStreamBlock(reader.read_to_end()),
        _ => opaque,
    };
    Ok(tag)
}

fn decode_define_shape<'a>(reader: &mut Reader<'a>, version: u8) -> Result<Tag<'a>> {
    read_define_shape(reader, version).map(|shape| Tag::DefineShape(Box::new(shape)))
}

pub(crate) fn read_define_shape<'a>(reader: &mut Reader<'a>, version: u8) -> Result<Shape<'a>> {
    let id = reader.read_u16()?;
    let shape_bounds = reader.read_rectangle()?;
    let (edge_bounds, flags) = if version >= 4 {
        let edge_bounds = reader.read_rectangle()?;
        let flags = ShapeFlag::from_bits_truncate(reader.read_u8()?);
        (Some(edge_bounds), flags)
    } else {
        (None, ShapeFlag::empty())
    };
    let styles = ShapeStyles::read(reader, version)?;
    let records = ShapeRecords::read(reader, version)?;
    debug!(
        "DefineShape{} id={} fills={} lines={}",
        version,
        id,
        styles.fill_styles.len(),
        styles.line_styles.len()
    );
    Ok(Shape {
        version,
        id,
        shape_bounds,
        edge_bounds,
        flags,
        styles,
        records,
    })
}

fn decode_define_sprite<'a>(reader: &mut Reader<'a>, warnings: &mut Vec<Warning>) -> Result<Tag<'a>> {
    let id = reader.read_u16()?;
    let num_frames = reader.read_u16()?;
    let tags = decode_tags(reader, warnings)?;
    debug!("DefineSprite id={} frames={} tags={}", id, num_frames, tags.len());
    Ok(Tag::DefineSprite(Sprite {
        id,
        num_frames,
        tags,
    }))
}

fn decode_place_object<'a>(reader: &mut Reader<'a>) -> Result<Tag<'a>> {
    let character_id = reader.read_u16()?;
    let depth = reader.read_u16()?;
    let matrix = reader.read_matrix()?;
    let color_transform = if reader.is_empty() {
        None
    } else {
        Some(reader.read_color_transform(false)?)
    };
    Ok(Tag::PlaceObject(Box::new(PlaceObject {
        version: 1,
        depth,
        action: PlaceObjectAction::Place(character_id),
        matrix: Some(matrix),
        color_transform,
        ratio: None,
        name: None,
        clip_depth: None,
        class_name: None,
        filters: None,
        blend_mode: None,
        is_bitmap_cached: None,
        is_visible: None,
        background_color: None,
    })))
}

fn decode_place_object_2_or_3<'a>(reader: &mut Reader<'a>, version: u8) -> Result<Tag<'a>> {
    let flags = if version >= 3 {
        PlaceFlag::from_bits_truncate(reader.read_u16()?)
    } else {
        PlaceFlag::from_bits_truncate(u16::from(reader.read_u8()?))
    };
    let depth = reader.read_u16()?;

    let class_name = if flags.contains(PlaceFlag::HAS_CLASS_NAME)
        || (flags.contains(PlaceFlag::HAS_IMAGE) && flags.contains(PlaceFlag::HAS_CHARACTER))
    {
        Some(reader.read_str()?)
    } else {
        None
    };

    let character_id = if flags.contains(PlaceFlag::HAS_CHARACTER) {
        Some(reader.read_u16()?)
    } else {
        None
    };
    let action = match (character_id, flags.contains(PlaceFlag::MOVE)) {
        (Some(id), false) => PlaceObjectAction::Place(id),
        (None, true) => PlaceObjectAction::Modify,
        (Some(id), true) => PlaceObjectAction::Replace(id),
        (None, false) => return Err(Error::InvalidData("PlaceObject has neither character nor move flag")),
    };

    let matrix = if flags.contains(PlaceFlag::HAS_MATRIX) {
        Some(reader.read_matrix()?)
    } else {
        None
    };
    let color_transform = if flags.contains(PlaceFlag::HAS_COLOR_TRANSFORM) {
        Some(reader.read_color_transform(true)?)
    } else {
        None
    };
    let ratio = if flags.contains(PlaceFlag::HAS_RATIO) {
        Some(reader.read_u16()?)
    } else {
        None
    };
    let name = if flags.contains(PlaceFlag::HAS_NAME) {
        Some(reader.read_str()?)
    } else {
        None
    };
    let clip_depth = if flags.contains(PlaceFlag::HAS_CLIP_DEPTH) {
        Some(reader.read_u16()?)
    } else {
        None
    };

    let filters = if flags.contains(PlaceFlag::HAS_FILTER_LIST) {
        let num_filters = reader.read_u8()?;
        let mut filters = Vec::with_capacity(usize::from(num_filters));
        for _ in 0..num_filters {
            filters.push(read_filter(reader)?);
        }
        Some(filters)
    } else {
        None
    };
    let blend_mode = if flags.contains(PlaceFlag::HAS_BLEND_MODE) {
        let value = reader.read_u8()?;
        Some(BlendMode::from_u8(value).unwrap_or_else(|| {
            debug!("Unknown blend mode {}, using Normal", value);
            BlendMode::Normal
        }))
    } else {
        None
    };
    let is_bitmap_cached = if flags.contains(PlaceFlag::HAS_CACHE_AS_BITMAP) {
        Some(reader.read_u8()? != 0)
    } else {
        None
    };
    let is_visible = if flags.contains(PlaceFlag::HAS_VISIBLE) {
        Some(reader.read_u8()? != 0)
    } else {
        None
    };
    let background_color = if flags.contains(PlaceFlag::OPAQUE_BACKGROUND) {
        Some(reader.read_rgba()?)
    } else {
        None
    };
    if flags.contains(PlaceFlag::HAS_CLIP_ACTIONS) {
        trace!("Skipping clip actions at depth {}", depth);
    }

    Ok(Tag::PlaceObject(Box::new(PlaceObject {
        version,
        depth,
        action,
        matrix,
        color_transform,
        ratio,
        name,
        clip_depth,
        class_name,
        filters,
        blend_mode,
        is_bitmap_cached,
        is_visible,
        background_color,
    })))
}

/// Filters are sized from their type (and, for the variable-length kinds,
/// from their leading count bytes) and kept raw.
fn read_filter<'a>(reader: &mut Reader<'a>) -> Result<Filter<'a>> {
    let kind = FilterKind::from_u8(reader.read_u8()?).ok_or(Error::InvalidData("Unknown filter type"))?;
    let rest = reader.get_ref();
    let len = match kind {
        FilterKind::DropShadow => 23,
        FilterKind::Blur => 9,
        FilterKind::Glow => 15,
        FilterKind::Bevel => 27,
        FilterKind::ColorMatrix => 80,
        FilterKind::GradientGlow | FilterKind::GradientBevel => {
            let num_colors = usize::from(*rest.first().ok_or(Error::UnexpectedEof)?);
            1 + num_colors * 5 + 19
        }
        FilterKind::Convolution => {
            let [matrix_x, matrix_y, ..] = rest else {
                return Err(Error::UnexpectedEof);
            };
            2 + 8 + 4 * usize::from(*matrix_x) * usize::from(*matrix_y) + 4 + 1
        }
    };
    Ok(Filter {
        kind,
        data: reader.read_slice(len)?,
    })
}

fn decode_frame_label<'a>(reader: &mut Reader<'a>) -> Result<Tag<'a>> {
    let label = reader.read_str()?;
    // The anchor flag byte only exists in SWF 6+.
    let is_anchor = if reader.is_empty() {
        false
    } else {
        reader.read_u8()? == 1
    };
    Ok(Tag::FrameLabel(FrameLabel { label, is_anchor }))
}

fn decode_define_bits_jpeg<'a>(reader: &mut Reader<'a>, version: u8) -> Result<Tag<'a>> {
    let id = reader.read_u16()?;
    let (data, alpha_data, deblocking) = match version {
        1 | 2 => (reader.read_to_end(), &[][..], Fixed8::from_bits(0)),
        _ => {
            let data_size = reader.read_u32()? as usize;
            let deblocking = if version >= 4 {
                reader.read_fixed8()?
            } else {
                Fixed8::from_bits(0)
            };
            let data = reader
                .read_slice(data_size)
                .map_err(|_| Error::InvalidData("JPEG data size exceeds tag length"))?;
            (data, reader.read_to_end(), deblocking)
        }
    };
    Ok(Tag::DefineBitsJpeg(DefineBitsJpeg {
        version,
        id,
        deblocking,
        data,
        alpha_data,
    }))
}

fn decode_define_bits_lossless<'a>(reader: &mut Reader<'a>, version: u8) -> Result<Tag<'a>> {
    let id = reader.read_u16()?;
    let format = reader.read_u8()?;
    let width = reader.read_u16()?;
    let height = reader.read_u16()?;
    let format = match format {
        3 => LosslessFormat::ColorMap8 {
            num_colors: reader.read_u8()?,
        },
        4 => LosslessFormat::Rgb15,
        5 => LosslessFormat::Rgb32,
        _ => return Err(Error::InvalidData("Invalid lossless bitmap format")),
    };
    Ok(Tag::DefineBitsLossless(DefineBitsLossless {
        version,
        id,
        format,
        width,
        height,
        data: reader.read_to_end(),
    }))
}

fn decode_sound_format(reader: &mut Reader<'_>) -> Result<SoundFormat> {
    let flags = reader.read_u8()?;
    let compression =
        AudioCompression::from_u8(flags >> 4).ok_or(Error::InvalidData("Invalid audio format"))?;
    let sample_rate = match (flags >> 2) & 0b11 {
        0 => 5512,
        1 => 11025,
        2 => 22050,
        _ => 44100,
    };
    Ok(SoundFormat {
        compression,
        sample_rate,
        is_16_bit: flags & 0b10 != 0,
        is_stereo: flags & 0b1 != 0,
    })
}

fn decode_sound_stream_head<'a>(reader: &mut Reader<'a>, version: u8) -> Result<Tag<'a>> {
    let playback_format = decode_sound_format(reader)?;
    let stream_format = decode_sound_format(reader)?;
    let num_samples_per_block = reader.read_u16()?;
    let latency_seek = if stream_format.compression == AudioCompression::Mp3 && reader.remaining() >= 2
    {
        reader.read_i16()?
    } else {
        0
    };
    Ok(Tag::SoundStreamHead(Box::new(SoundStreamHead {
        version,
        playback_format,
        stream_format,
        num_samples_per_block,
        latency_seek,
    })))
}
