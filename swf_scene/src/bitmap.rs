//! Bitmap definition payloads. Pixels are never decoded here; the compressed
//! bytes are handed to an image decoder together with enough metadata to
//! pick the right one.

use std::borrow::Cow;

use serde::Serialize;

use crate::{
    tag::{DefineBitsJpeg, DefineBitsLossless, LosslessFormat},
    types::CharacterId,
};

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];
/// EOI+SOI pair some pre-SWF8 encoders put in front of the real SOI.
const ERRONEOUS_HEADER: [u8; 4] = [0xFF, 0xD9, 0xFF, 0xD8];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    /// zlib-compressed raw pixels from DefineBitsLossless.
    Lossless,
    Unknown,
}

/// DefineBitsJPEG2+ may also carry PNG or GIF data.
pub fn determine_image_format(data: &[u8]) -> ImageFormat {
    match data {
        [0xFF, 0xD8, ..] => ImageFormat::Jpeg,
        [0xFF, 0xD9, 0xFF, 0xD8, ..] => ImageFormat::Jpeg,
        [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, ..] => ImageFormat::Png,
        [0x47, 0x49, 0x46, 0x38, 0x39, 0x61, ..] => ImageFormat::Gif,
        _ => ImageFormat::Unknown,
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(tag = "type")]
pub enum BitmapKind {
    Jpeg {
        version: u8,
        deblocking: f32,
        has_alpha: bool,
        uses_jpeg_tables: bool,
    },
    Lossless {
        version: u8,
        format: LosslessFormat,
        width: u16,
        height: u16,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct BitmapPayload<'a> {
    pub id: CharacterId,
    pub format: ImageFormat,
    pub kind: BitmapKind,
    pub data_len: usize,
    #[serde(skip)]
    pub data: &'a [u8],
    /// zlib-compressed alpha plane of DefineBitsJPEG3/4.
    #[serde(skip)]
    pub alpha_data: &'a [u8],
    /// The movie's shared JPEGTables, for version 1 DefineBits.
    #[serde(skip)]
    pub jpeg_tables: Option<&'a [u8]>,
}

impl<'a> BitmapPayload<'a> {
    pub fn from_jpeg(tag: &DefineBitsJpeg<'a>, jpeg_tables: Option<&'a [u8]>) -> Self {
        let jpeg_tables = if tag.version == 1 { jpeg_tables } else { None };
        Self {
            id: tag.id,
            format: determine_image_format(tag.data),
            kind: BitmapKind::Jpeg {
                version: tag.version,
                deblocking: tag.deblocking.to_f32(),
                has_alpha: !tag.alpha_data.is_empty(),
                uses_jpeg_tables: jpeg_tables.is_some(),
            },
            data_len: tag.data.len(),
            data: tag.data,
            alpha_data: tag.alpha_data,
            jpeg_tables,
        }
    }

    pub fn from_lossless(tag: &DefineBitsLossless<'a>) -> Self {
        Self {
            id: tag.id,
            format: ImageFormat::Lossless,
            kind: BitmapKind::Lossless {
                version: tag.version,
                format: tag.format,
                width: tag.width,
                height: tag.height,
            },
            data_len: tag.data.len(),
            data: tag.data,
            alpha_data: &[],
            jpeg_tables: None,
        }
    }

    /// Image bytes ready for a standard decoder: JPEG data is merged with the
    /// shared tables and stripped of the erroneous EOI+SOI header.
    pub fn image_bytes(&self) -> Cow<'a, [u8]> {
        if self.format != ImageFormat::Jpeg {
            return Cow::Borrowed(self.data);
        }
        let data = strip_erroneous_header(self.data);
        match self.jpeg_tables {
            Some(tables) if tables.len() > ERRONEOUS_HEADER.len() => {
                Cow::Owned(glue_jpeg_tables(tables, data))
            }
            _ => Cow::Borrowed(data),
        }
    }
}

fn strip_erroneous_header(data: &[u8]) -> &[u8] {
    data.strip_prefix(&ERRONEOUS_HEADER[..]).unwrap_or(data)
}

/// Drops the tables' trailing EOI and the image's leading SOI so the two
/// halves form one JPEG stream.
fn glue_jpeg_tables(tables: &[u8], data: &[u8]) -> Vec<u8> {
    let tables = strip_erroneous_header(tables);
    let tables = tables.strip_suffix(&EOI[..]).unwrap_or(tables);
    let data = data.strip_prefix(&SOI[..]).unwrap_or(data);
    let mut out = Vec::with_capacity(tables.len() + data.len());
    out.extend_from_slice(tables);
    out.extend_from_slice(data);
    out
}
