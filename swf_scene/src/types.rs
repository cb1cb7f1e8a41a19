use std::ops::{Add, AddAssign, Sub};

use num_derive::FromPrimitive;
use serde::Serialize;

pub type CharacterId = u16;
pub type Depth = u16;

/// 1/20 of a pixel, the native SWF coordinate unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Twips(i32);

impl Twips {
    pub const ZERO: Self = Self(0);
    pub const TWIPS_PER_PIXEL: i32 = 20;

    pub const fn new(twips: i32) -> Self {
        Self(twips)
    }

    pub const fn get(self) -> i32 {
        self.0
    }

    pub fn to_pixels(self) -> f64 {
        f64::from(self.0) / f64::from(Self::TWIPS_PER_PIXEL)
    }
}

impl Add for Twips {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Twips {
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.wrapping_add(other.0);
    }
}

impl Sub for Twips {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self(self.0.wrapping_sub(other.0))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: Twips,
    pub y: Twips,
}

impl Point {
    pub const ZERO: Self = Self {
        x: Twips::ZERO,
        y: Twips::ZERO,
    };

    pub const fn new(x: Twips, y: Twips) -> Self {
        Self { x, y }
    }

    pub fn to_pixels(self) -> (f64, f64) {
        (self.x.to_pixels(), self.y.to_pixels())
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    pub x_min: Twips,
    pub x_max: Twips,
    pub y_min: Twips,
    pub y_max: Twips,
}

impl Rectangle {
    pub fn width(&self) -> Twips {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> Twips {
        self.y_max - self.y_min
    }

    /// An inverted rectangle that any `encompass` call will snap onto.
    pub(crate) fn empty() -> Self {
        Self {
            x_min: Twips::new(i32::MAX),
            x_max: Twips::new(i32::MIN),
            y_min: Twips::new(i32::MAX),
            y_max: Twips::new(i32::MIN),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.x_min <= self.x_max && self.y_min <= self.y_max
    }

    pub(crate) fn encompass(&mut self, point: Point) {
        self.x_min = self.x_min.min(point.x);
        self.x_max = self.x_max.max(point.x);
        self.y_min = self.y_min.min(point.y);
        self.y_max = self.y_max.max(point.y);
    }
}

/// Signed 8.8 fixed point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fixed8(i16);

impl Fixed8 {
    pub const ONE: Self = Self(1 << 8);

    pub const fn from_bits(bits: i16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> i16 {
        self.0
    }

    pub fn to_f32(self) -> f32 {
        f32::from(self.0) / 256.0
    }
}

/// Signed 16.16 fixed point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Fixed16(i32);

impl Fixed16 {
    pub const ONE: Self = Self(1 << 16);
    pub const ZERO: Self = Self(0);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 65536.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Self = Self::from_rgb(0x000000, 255);
    pub const WHITE: Self = Self::from_rgb(0xFFFFFF, 255);

    pub const fn from_rgb(rgb: u32, alpha: u8) -> Self {
        Self {
            r: ((rgb >> 16) & 0xFF) as u8,
            g: ((rgb >> 8) & 0xFF) as u8,
            b: (rgb & 0xFF) as u8,
            a: alpha,
        }
    }

    /// Parses `0xRRGGBB`, `#RRGGBB` and `RRGGBBAA` style strings.
    /// Short values are treated as an integer with its leading zeros dropped,
    /// so `"ff"` is blue and `"0x0"` is black.
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value
            .trim()
            .trim_start_matches('#')
            .trim_start_matches("0x")
            .trim_start_matches("0X");
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            8 => {
                let rgba = u32::from_str_radix(digits, 16).ok()?;
                Some(Self::from_rgb(rgba >> 8, (rgba & 0xFF) as u8))
            }
            len if len <= 6 => {
                let rgb = u32::from_str_radix(digits, 16).ok()?;
                Some(Self::from_rgb(rgb, 255))
            }
            _ => None,
        }
    }
}

/// SWF MATRIX record. `a`/`d` are the scale terms, `b`/`c` the rotate-skew
/// terms; a point maps to `(a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Matrix {
    pub a: Fixed16,
    pub b: Fixed16,
    pub c: Fixed16,
    pub d: Fixed16,
    pub tx: Twips,
    pub ty: Twips,
}

impl Matrix {
    pub const IDENTITY: Self = Self {
        a: Fixed16::ONE,
        b: Fixed16::ZERO,
        c: Fixed16::ZERO,
        d: Fixed16::ONE,
        tx: Twips::ZERO,
        ty: Twips::ZERO,
    };

    /// Converts to a `glam` affine transform with translation expressed in
    /// `units_per_twip` (e.g. `1.0 / 20.0` for pixels).
    pub fn to_affine(&self, units_per_twip: f32) -> glam::Affine2 {
        glam::Affine2::from_cols_array(&[
            self.a.to_f32(),
            self.b.to_f32(),
            self.c.to_f32(),
            self.d.to_f32(),
            self.tx.get() as f32 * units_per_twip,
            self.ty.get() as f32 * units_per_twip,
        ])
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ColorTransform {
    pub r_multiply: Fixed8,
    pub g_multiply: Fixed8,
    pub b_multiply: Fixed8,
    pub a_multiply: Fixed8,
    pub r_add: i16,
    pub g_add: i16,
    pub b_add: i16,
    pub a_add: i16,
}

impl ColorTransform {
    pub const IDENTITY: Self = Self {
        r_multiply: Fixed8::ONE,
        g_multiply: Fixed8::ONE,
        b_multiply: Fixed8::ONE,
        a_multiply: Fixed8::ONE,
        r_add: 0,
        g_add: 0,
        b_add: 0,
        a_add: 0,
    };
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Default, Clone, Copy, Debug, Eq, FromPrimitive, PartialEq, Serialize)]
pub enum BlendMode {
    #[default]
    Normal = 0,
    Layer = 2,
    Multiply = 3,
    Screen = 4,
    Lighten = 5,
    Darken = 6,
    Difference = 7,
    Add = 8,
    Subtract = 9,
    Invert = 10,
    Alpha = 11,
    Erase = 12,
    Overlay = 13,
    HardLight = 14,
}

impl BlendMode {
    /// Both 0 and 1 mean "normal" in the file format.
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            1 => Some(BlendMode::Normal),
            _ => num_traits::FromPrimitive::from_u8(n),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_colors_tolerate_missing_padding() {
        assert_eq!(Color::from_hex("0xff"), Some(Color::from_rgb(0x0000FF, 255)));
        assert_eq!(Color::from_hex("0x0"), Some(Color::BLACK));
        assert_eq!(Color::from_hex("#FFFFFF"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("f80"), Some(Color::from_rgb(0x000F80, 255)));
        assert_eq!(Color::from_hex("0xf80"), Some(Color::from_rgb(0x000F80, 255)));
        assert_eq!(Color::from_hex("0x1234"), Some(Color::from_rgb(0x001234, 255)));
        assert_eq!(
            Color::from_hex("11223380"),
            Some(Color {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x80
            })
        );
        assert_eq!(Color::from_hex("xyz"), None);
        assert_eq!(Color::from_hex(""), None);
    }

    #[test]
    fn matrix_to_affine_scales_translation() {
        let matrix = Matrix {
            a: Fixed16::from_bits(2 << 16),
            tx: Twips::new(200),
            ty: Twips::new(-40),
            ..Matrix::IDENTITY
        };
        let affine = matrix.to_affine(1.0 / 20.0);
        let p = affine.transform_point2(glam::Vec2::new(1.0, 1.0));
        assert!((p.x - 12.0).abs() < 1e-6);
        assert!((p.y - -1.0).abs() < 1e-6);
    }

    #[test]
    fn blend_mode_one_is_normal() {
        assert_eq!(BlendMode::from_u8(1), Some(BlendMode::Normal));
        assert_eq!(BlendMode::from_u8(14), Some(BlendMode::HardLight));
        assert_eq!(BlendMode::from_u8(15), None);
    }
}
