use bitflags::bitflags;
use num_derive::FromPrimitive;
use serde::Serialize;

use crate::{
    shape::Shape,
    sound::SoundStreamHead,
    types::{BlendMode, CharacterId, Color, ColorTransform, Depth, Fixed8, Matrix},
};

pub(crate) mod decode;

pub use decode::{TagHeader, decode_tags, read_tag_header};

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive)]
pub enum TagCode {
    End = 0,
    ShowFrame = 1,
    DefineShape = 2,
    PlaceObject = 4,
    RemoveObject = 5,
    DefineBits = 6,
    DefineButton = 7,
    JpegTables = 8,
    SetBackgroundColor = 9,
    DefineFont = 10,
    DefineText = 11,
    DoAction = 12,
    DefineFontInfo = 13,
    DefineSound = 14,
    StartSound = 15,
    DefineButtonSound = 17,
    SoundStreamHead = 18,
    SoundStreamBlock = 19,
    DefineBitsLossless = 20,
    DefineBitsJpeg2 = 21,
    DefineShape2 = 22,
    DefineButtonCxform = 23,
    Protect = 24,
    PlaceObject2 = 26,
    RemoveObject2 = 28,
    DefineShape3 = 32,
    DefineText2 = 33,
    DefineButton2 = 34,
    DefineBitsJpeg3 = 35,
    DefineBitsLossless2 = 36,
    DefineEditText = 37,
    DefineSprite = 39,
    ProductInfo = 41,
    FrameLabel = 43,
    SoundStreamHead2 = 45,
    DefineMorphShape = 46,
    DefineFont2 = 48,
    ExportAssets = 56,
    ImportAssets = 57,
    EnableDebugger = 58,
    DoInitAction = 59,
    DefineVideoStream = 60,
    VideoFrame = 61,
    DefineFontInfo2 = 62,
    EnableDebugger2 = 64,
    ScriptLimits = 65,
    SetTabIndex = 66,
    FileAttributes = 69,
    PlaceObject3 = 70,
    ImportAssets2 = 71,
    DefineFontAlignZones = 73,
    CsmTextSettings = 74,
    DefineFont3 = 75,
    SymbolClass = 76,
    Metadata = 77,
    DefineScalingGrid = 78,
    DoAbc = 82,
    DefineShape4 = 83,
    DefineMorphShape2 = 84,
    DefineSceneAndFrameLabelData = 86,
    DefineBinaryData = 87,
    DefineFontName = 88,
    StartSound2 = 89,
    DefineBitsJpeg4 = 90,
    DefineFont4 = 91,
    EnableTelemetry = 93,
    PlaceObject4 = 94,
}

impl TagCode {
    pub fn from_u16(n: u16) -> Option<Self> {
        num_traits::FromPrimitive::from_u16(n)
    }

    /// Definition tags whose body starts with the id of the character they
    /// define.
    pub fn defines_character(self) -> bool {
        matches!(
            self,
            TagCode::DefineShape
                | TagCode::DefineShape2
                | TagCode::DefineShape3
                | TagCode::DefineShape4
                | TagCode::DefineSprite
                | TagCode::DefineBits
                | TagCode::DefineBitsJpeg2
                | TagCode::DefineBitsJpeg3
                | TagCode::DefineBitsJpeg4
                | TagCode::DefineBitsLossless
                | TagCode::DefineBitsLossless2
                | TagCode::DefineButton
                | TagCode::DefineButton2
                | TagCode::DefineFont
                | TagCode::DefineFont2
                | TagCode::DefineFont3
                | TagCode::DefineFont4
                | TagCode::DefineText
                | TagCode::DefineText2
                | TagCode::DefineEditText
                | TagCode::DefineSound
                | TagCode::DefineMorphShape
                | TagCode::DefineMorphShape2
                | TagCode::DefineVideoStream
                | TagCode::DefineBinaryData
        )
    }
}

#[derive(Clone, Debug)]
pub enum Tag<'a> {
    End,
    ShowFrame,
    DefineShape(Box<Shape<'a>>),
    DefineSprite(Sprite<'a>),
    PlaceObject(Box<PlaceObject<'a>>),
    RemoveObject(RemoveObject),
    SetBackgroundColor(Color),
    FrameLabel(FrameLabel),
    DefineBitsJpeg(DefineBitsJpeg<'a>),
    JpegTables(&'a [u8]),
    DefineBitsLossless(DefineBitsLossless<'a>),
    SoundStreamHead(Box<SoundStreamHead>),
    SoundStreamBlock(&'a [u8]),
    /// Recognized-but-unsupported or unknown tags, and supported tags whose
    /// body failed to decode.
    Opaque(OpaqueTag<'a>),
}

impl Tag<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Tag::End => "End",
            Tag::ShowFrame => "ShowFrame",
            Tag::DefineShape(_) => "DefineShape",
            Tag::DefineSprite(_) => "DefineSprite",
            Tag::PlaceObject(_) => "PlaceObject",
            Tag::RemoveObject(_) => "RemoveObject",
            Tag::SetBackgroundColor(_) => "SetBackgroundColor",
            Tag::FrameLabel(_) => "FrameLabel",
            Tag::DefineBitsJpeg(_) => "DefineBitsJpeg",
            Tag::JpegTables(_) => "JpegTables",
            Tag::DefineBitsLossless(_) => "DefineBitsLossless",
            Tag::SoundStreamHead(_) => "SoundStreamHead",
            Tag::SoundStreamBlock(_) => "SoundStreamBlock",
            Tag::Opaque(_) => "Opaque",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct OpaqueTag<'a> {
    pub code: u16,
    pub data: &'a [u8],
}

impl OpaqueTag<'_> {
    pub fn tag_code(&self) -> Option<TagCode> {
        TagCode::from_u16(self.code)
    }

    /// The id defined by this tag, if it is a known definition tag. Also set
    /// for supported definitions whose body failed to decode.
    pub fn character_id(&self) -> Option<CharacterId> {
        let code = self.tag_code()?;
        if !code.defines_character() {
            return None;
        }
        match self.data {
            [lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Sprite<'a> {
    pub id: CharacterId,
    pub num_frames: u16,
    pub tags: Vec<Tag<'a>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PlaceObjectAction {
    /// A new character at an empty depth.
    Place(CharacterId),
    /// Updates whatever is already at the depth.
    Modify,
    /// Swaps the character at an occupied depth.
    Replace(CharacterId),
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PlaceFlag: u16 {
        const MOVE = 1 << 0;
        const HAS_CHARACTER = 1 << 1;
        const HAS_MATRIX = 1 << 2;
        const HAS_COLOR_TRANSFORM = 1 << 3;
        const HAS_RATIO = 1 << 4;
        const HAS_NAME = 1 << 5;
        const HAS_CLIP_DEPTH = 1 << 6;
        const HAS_CLIP_ACTIONS = 1 << 7;

        // PlaceObject3
        const HAS_FILTER_LIST = 1 << 8;
        const HAS_BLEND_MODE = 1 << 9;
        const HAS_CACHE_AS_BITMAP = 1 << 10;
        const HAS_CLASS_NAME = 1 << 11;
        const HAS_IMAGE = 1 << 12;
        const HAS_VISIBLE = 1 << 13;
        const OPAQUE_BACKGROUND = 1 << 14;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlaceObject<'a> {
    pub version: u8,
    pub depth: Depth,
    pub action: PlaceObjectAction,
    pub matrix: Option<Matrix>,
    pub color_transform: Option<ColorTransform>,
    pub ratio: Option<u16>,
    pub name: Option<String>,
    pub clip_depth: Option<Depth>,
    pub class_name: Option<String>,
    pub filters: Option<Vec<Filter<'a>>>,
    pub blend_mode: Option<BlendMode>,
    pub is_bitmap_cached: Option<bool>,
    pub is_visible: Option<bool>,
    pub background_color: Option<Color>,
}

impl PlaceObject<'_> {
    pub fn has_character(&self) -> bool {
        matches!(
            self.action,
            PlaceObjectAction::Place(_) | PlaceObjectAction::Replace(_)
        )
    }

    pub fn has_move(&self) -> bool {
        matches!(
            self.action,
            PlaceObjectAction::Modify | PlaceObjectAction::Replace(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, Serialize)]
pub enum FilterKind {
    DropShadow = 0,
    Blur = 1,
    Glow = 2,
    Bevel = 3,
    GradientGlow = 4,
    Convolution = 5,
    ColorMatrix = 6,
    GradientBevel = 7,
}

/// A bitmap filter kept as its raw record; filters are carried through but
/// not interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Filter<'a> {
    pub kind: FilterKind,
    pub data: &'a [u8],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemoveObject {
    pub depth: Depth,
    /// Only present in RemoveObject (version 1).
    pub character_id: Option<CharacterId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameLabel {
    pub label: String,
    pub is_anchor: bool,
}

/// DefineBits (version 1, relies on a shared JPEGTables tag), DefineBitsJPEG2,
/// DefineBitsJPEG3 (separate zlib alpha plane) and DefineBitsJPEG4 (deblocking).
#[derive(Clone, Copy, Debug)]
pub struct DefineBitsJpeg<'a> {
    pub version: u8,
    pub id: CharacterId,
    pub deblocking: Fixed8,
    pub data: &'a [u8],
    pub alpha_data: &'a [u8],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LosslessFormat {
    ColorMap8 { num_colors: u8 },
    Rgb15,
    Rgb32,
}

#[derive(Clone, Copy, Debug)]
pub struct DefineBitsLossless<'a> {
    /// 1 for DefineBitsLossless, 2 for DefineBitsLossless2 (with alpha).
    pub version: u8,
    pub id: CharacterId,
    pub format: LosslessFormat,
    pub width: u16,
    pub height: u16,
    /// zlib-compressed pixel data, including the color table for `ColorMap8`.
    pub data: &'a [u8],
}
