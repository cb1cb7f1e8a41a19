use serde::Serialize;
use thiserror::Error;

use crate::{
    movie::Compression,
    types::{CharacterId, Depth},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unexpected end of data")]
    UnexpectedEof,

    #[error("Tag {code} at byte {offset} declares {length} bytes but only {available} remain")]
    TruncatedTag {
        code: u16,
        offset: usize,
        length: usize,
        available: usize,
    },

    #[error("Unsupported SWF compression: {0:?}")]
    UnsupportedCompression(Compression),

    #[error("Not a SWF file")]
    InvalidSignature,

    #[error("Malformed shape record: {0}")]
    MalformedShapeRecord(String),

    #[error(
        "Tag #{position} of {} places undefined character {character_id} at depth {depth}",
        timeline_name(.timeline)
    )]
    UndefinedCharacterReference {
        timeline: Option<CharacterId>,
        position: usize,
        depth: Depth,
        character_id: CharacterId,
    },

    #[error(
        "Tag #{position} of {} places a character on occupied depth {depth}",
        timeline_name(.timeline)
    )]
    DepthConflict {
        timeline: Option<CharacterId>,
        position: usize,
        depth: Depth,
    },

    #[error("Tag #{position} of {} references empty depth {depth}", timeline_name(.timeline))]
    DepthNotFound {
        timeline: Option<CharacterId>,
        position: usize,
        depth: Depth,
    },

    #[error("Unsupported fill style type 0x{0:02x}")]
    UnsupportedFillType(u8),

    #[error("Invalid data: {0}")]
    InvalidData(&'static str),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

fn timeline_name(timeline: &Option<CharacterId>) -> String {
    match timeline {
        Some(id) => format!("sprite {}", id),
        None => "the root timeline".to_string(),
    }
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedShapeRecord(reason.into())
    }
}

/// A non-fatal decode problem. The movie still parses; the affected tag or
/// shape degrades to opaque or partial output.
#[derive(Debug, Clone, Serialize)]
pub struct Warning {
    /// Index of the tag inside the tag list it was found in.
    pub position: usize,
    pub tag_code: u16,
    pub message: String,
}

impl Warning {
    pub(crate) fn new(position: usize, tag_code: u16, error: &Error) -> Self {
        Self {
            position,
            tag_code,
            message: error.to_string(),
        }
    }
}
