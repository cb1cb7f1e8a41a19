use std::io::Read;

use flate2::read::ZlibDecoder;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::{Error, Result, Warning},
    read::Reader,
    tag::{Tag, decode_tags},
    types::Rectangle,
};

/// Signature, version and uncompressed length.
const PREFIX_LEN: usize = 8;
/// Upper bound for trusting the declared length when preallocating.
const MAX_PREALLOC: usize = 64 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Compression {
    /// `FWS`
    None,
    /// `CWS`
    Zlib,
    /// `ZWS`
    Lzma,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Header {
    pub compression: Compression,
    pub version: u8,
    /// Declared size of the whole file once decompressed, prefix included.
    pub uncompressed_len: u32,
    pub stage_size: Rectangle,
    pub frame_rate: f32,
    pub num_frames: u16,
}

impl Header {
    pub fn width_px(&self) -> f64 {
        self.stage_size.width().to_pixels()
    }

    pub fn height_px(&self) -> f64 {
        self.stage_size.height().to_pixels()
    }
}

/// A decompressed movie: its header and the raw tag stream that follows it.
#[derive(Clone, Debug)]
pub struct SwfBuf {
    pub header: Header,
    pub data: Vec<u8>,
}

/// A parsed movie. Tags borrow from the [`SwfBuf`] they were decoded from.
#[derive(Clone, Debug)]
pub struct Movie<'a> {
    pub header: Header,
    pub tags: Vec<Tag<'a>>,
    /// Tags that could not be decoded and were kept opaque.
    pub warnings: Vec<Warning>,
}

/// Checks the signature, inflates the body if needed and reads the header.
pub fn decompress_swf(input: &[u8]) -> Result<SwfBuf> {
    let compression = match input {
        [b'F', b'W', b'S', ..] => Compression::None,
        [b'C', b'W', b'S', ..] => Compression::Zlib,
        [b'Z', b'W', b'S', ..] => Compression::Lzma,
        _ => return Err(Error::InvalidSignature),
    };
    let prefix = input.get(..PREFIX_LEN).ok_or(Error::UnexpectedEof)?;
    let version = prefix[3];
    let uncompressed_len = u32::from_le_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);
    let body = &input[PREFIX_LEN..];

    let mut data = match compression {
        Compression::None => body.to_vec(),
        Compression::Zlib => {
            let capacity = (uncompressed_len as usize)
                .saturating_sub(PREFIX_LEN)
                .min(MAX_PREALLOC);
            let mut data = Vec::with_capacity(capacity);
            ZlibDecoder::new(body).read_to_end(&mut data)?;
            data
        }
        Compression::Lzma => return Err(Error::UnsupportedCompression(compression)),
    };
    if data.len() + PREFIX_LEN != uncompressed_len as usize {
        warn!(
            "SWF declares {} bytes but holds {}",
            uncompressed_len,
            data.len() + PREFIX_LEN
        );
    }

    let mut reader = Reader::new(&data, version);
    let stage_size = reader.read_rectangle()?;
    let frame_rate = f32::from(reader.read_u16()?) / 256.0;
    let num_frames = reader.read_u16()?;
    let header_len = reader.position();

    let header = Header {
        compression,
        version,
        uncompressed_len,
        stage_size,
        frame_rate,
        num_frames,
    };
    debug!(
        "SWF v{} {:?}: {}x{} px, {} fps, {} frames",
        version,
        compression,
        header.width_px(),
        header.height_px(),
        frame_rate,
        num_frames
    );
    Ok(SwfBuf {
        header,
        data: data.split_off(header_len),
    })
}

/// Decodes the top-level tag stream.
pub fn parse_movie(swf_buf: &SwfBuf) -> Result<Movie<'_>> {
    let mut reader = Reader::new(&swf_buf.data, swf_buf.header.version);
    let mut warnings = Vec::new();
    let tags = decode_tags(&mut reader, &mut warnings)?;
    if !matches!(tags.last(), Some(Tag::End)) {
        debug!("Tag stream ended without an End tag");
    }
    debug!("Decoded {} top-level tags, {} warning(s)", tags.len(), warnings.len());
    Ok(Movie {
        header: swf_buf.header.clone(),
        tags,
        warnings,
    })
}

impl Movie<'_> {
    /// The stage size in pixels.
    pub fn stage_size_px(&self) -> (f64, f64) {
        (self.header.width_px(), self.header.height_px())
    }
}
