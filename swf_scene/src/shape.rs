use bitflags::bitflags;
use serde::Serialize;

use crate::{
    error::{Error, Result},
    read::Reader,
    types::{CharacterId, Color, Fixed8, Matrix, Rectangle, Twips},
};

pub mod edge_map;
pub mod path;
pub mod records;

use records::ShapeRecords;

/// A DefineShape (1 to 4) character. Records are decoded on demand.
#[derive(Clone, Debug)]
pub struct Shape<'a> {
    pub version: u8,
    pub id: CharacterId,
    pub shape_bounds: Rectangle,
    /// Bounds without stroke widths, DefineShape4 only.
    pub edge_bounds: Option<Rectangle>,
    pub flags: ShapeFlag,
    pub styles: ShapeStyles,
    pub records: ShapeRecords<'a>,
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ShapeFlag: u8 {
        const HAS_SCALING_STROKES = 1 << 0;
        const HAS_NON_SCALING_STROKES = 1 << 1;
        const NON_ZERO_WINDING_RULE = 1 << 2;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapeStyles {
    pub fill_styles: Vec<FillStyle>,
    pub line_styles: Vec<LineStyle>,
}

impl ShapeStyles {
    /// Reads a fill style array followed by a line style array.
    pub(crate) fn read(reader: &mut Reader<'_>, shape_version: u8) -> Result<Self> {
        let num_fill_styles = read_style_count(reader, shape_version)?;
        let mut fill_styles = Vec::with_capacity(num_fill_styles);
        for _ in 0..num_fill_styles {
            fill_styles.push(FillStyle::read(reader, shape_version)?);
        }

        let num_line_styles = read_style_count(reader, shape_version)?;
        let mut line_styles = Vec::with_capacity(num_line_styles);
        for _ in 0..num_line_styles {
            line_styles.push(LineStyle::read(reader, shape_version)?);
        }

        Ok(Self {
            fill_styles,
            line_styles,
        })
    }

    /// 1-based lookup as used by shape records; 0 means "no style".
    pub fn fill_style(&self, index: u32) -> Option<&FillStyle> {
        index
            .checked_sub(1)
            .and_then(|i| self.fill_styles.get(i as usize))
    }

    pub fn line_style(&self, index: u32) -> Option<&LineStyle> {
        index
            .checked_sub(1)
            .and_then(|i| self.line_styles.get(i as usize))
    }
}

fn read_style_count(reader: &mut Reader<'_>, shape_version: u8) -> Result<usize> {
    let count = reader.read_u8()?;
    if count == 0xFF && shape_version >= 2 {
        Ok(usize::from(reader.read_u16()?))
    } else {
        Ok(usize::from(count))
    }
}

fn read_shape_color(reader: &mut Reader<'_>, shape_version: u8) -> Result<Color> {
    if shape_version >= 3 {
        reader.read_rgba()
    } else {
        reader.read_rgb()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FillStyle {
    Color(Color),
    LinearGradient(Gradient),
    RadialGradient(Gradient),
    FocalGradient {
        gradient: Gradient,
        focal_point: Fixed8,
    },
    Bitmap {
        id: CharacterId,
        matrix: Matrix,
        is_smoothed: bool,
        is_repeating: bool,
    },
}

impl FillStyle {
    pub(crate) fn read(reader: &mut Reader<'_>, shape_version: u8) -> Result<Self> {
        let fill_type = reader.read_u8()?;
        let fill_style = match fill_type {
            0x00 => FillStyle::Color(read_shape_color(reader, shape_version)?),
            0x10 => FillStyle::LinearGradient(Gradient::read(reader, shape_version)?),
            0x12 => FillStyle::RadialGradient(Gradient::read(reader, shape_version)?),
            0x13 => {
                let gradient = Gradient::read(reader, shape_version)?;
                FillStyle::FocalGradient {
                    gradient,
                    focal_point: reader.read_fixed8()?,
                }
            }
            0x40..=0x43 => {
                let id = reader.read_u16()?;
                let matrix = reader.read_matrix()?;
                FillStyle::Bitmap {
                    id,
                    matrix,
                    // 0x40 / 0x41 smoothed, 0x42 / 0x43 not
                    is_smoothed: fill_type & 0b10 == 0,
                    // 0x40 / 0x42 repeating, 0x41 / 0x43 clipped
                    is_repeating: fill_type & 0b01 == 0,
                }
            }
            _ => return Err(Error::UnsupportedFillType(fill_type)),
        };
        Ok(fill_style)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GradientSpread {
    Pad,
    Reflect,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum GradientInterpolation {
    Rgb,
    LinearRgb,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GradientRecord {
    pub ratio: u8,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    /// Maps the 32768x32768 twip gradient square into shape space.
    pub matrix: Matrix,
    pub spread: GradientSpread,
    pub interpolation: GradientInterpolation,
    pub records: Vec<GradientRecord>,
}

impl Gradient {
    fn read(reader: &mut Reader<'_>, shape_version: u8) -> Result<Self> {
        let matrix = reader.read_matrix()?;
        let spread = match reader.read_ubits(2)? {
            0 => GradientSpread::Pad,
            1 => GradientSpread::Reflect,
            2 => GradientSpread::Repeat,
            _ => return Err(Error::InvalidData("Invalid gradient spread mode")),
        };
        let interpolation = match reader.read_ubits(2)? {
            0 => GradientInterpolation::Rgb,
            1 => GradientInterpolation::LinearRgb,
            _ => return Err(Error::InvalidData("Invalid gradient interpolation mode")),
        };
        let num_records = reader.read_ubits(4)? as usize;
        let mut records = Vec::with_capacity(num_records);
        for _ in 0..num_records {
            records.push(GradientRecord {
                ratio: reader.read_u8()?,
                color: read_shape_color(reader, shape_version)?,
            });
        }
        Ok(Self {
            matrix,
            spread,
            interpolation,
            records,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LineCapStyle {
    Round,
    None,
    Square,
}

impl LineCapStyle {
    fn from_bits(bits: u32) -> Result<Self> {
        match bits {
            0 => Ok(LineCapStyle::Round),
            1 => Ok(LineCapStyle::None),
            2 => Ok(LineCapStyle::Square),
            _ => Err(Error::InvalidData("Invalid line cap style")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LineJoinStyle {
    Round,
    Bevel,
    Miter(Fixed8),
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LineStyleFlag: u8 {
        const NO_H_SCALE = 1 << 0;
        const NO_V_SCALE = 1 << 1;
        const PIXEL_HINTING = 1 << 2;
        const NO_CLOSE = 1 << 3;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    pub width: Twips,
    pub color: Color,
    pub start_cap: LineCapStyle,
    pub end_cap: LineCapStyle,
    pub join_style: LineJoinStyle,
    /// LineStyle2 strokes may be painted with any fill instead of a color.
    pub fill_style: Option<FillStyle>,
    pub flags: LineStyleFlag,
}

impl LineStyle {
    pub(crate) fn read(reader: &mut Reader<'_>, shape_version: u8) -> Result<Self> {
        let width = Twips::new(i32::from(reader.read_u16()?));
        if shape_version < 4 {
            return Ok(Self {
                width,
                color: read_shape_color(reader, shape_version)?,
                start_cap: LineCapStyle::Round,
                end_cap: LineCapStyle::Round,
                join_style: LineJoinStyle::Round,
                fill_style: None,
                flags: LineStyleFlag::empty(),
            });
        }

        // LineStyle2
        let start_cap = LineCapStyle::from_bits(reader.read_ubits(2)?)?;
        let join_bits = reader.read_ubits(2)?;
        let has_fill = reader.read_bit()?;
        let mut flags = LineStyleFlag::empty();
        flags.set(LineStyleFlag::NO_H_SCALE, reader.read_bit()?);
        flags.set(LineStyleFlag::NO_V_SCALE, reader.read_bit()?);
        flags.set(LineStyleFlag::PIXEL_HINTING, reader.read_bit()?);
        reader.read_ubits(5)?;
        flags.set(LineStyleFlag::NO_CLOSE, reader.read_bit()?);
        let end_cap = LineCapStyle::from_bits(reader.read_ubits(2)?)?;

        let join_style = match join_bits {
            0 => LineJoinStyle::Round,
            1 => LineJoinStyle::Bevel,
            2 => LineJoinStyle::Miter(reader.read_fixed8()?),
            _ => return Err(Error::InvalidData("Invalid line join style")),
        };
        let (color, fill_style) = if has_fill {
            let fill_style = FillStyle::read(reader, shape_version)?;
            let color = match &fill_style {
                FillStyle::Color(color) => *color,
                _ => Color::BLACK,
            };
            (color, Some(fill_style))
        } else {
            (reader.read_rgba()?, None)
        };

        Ok(Self {
            width,
            color,
            start_cap,
            end_cap,
            join_style,
            fill_style,
            flags,
        })
    }
}
