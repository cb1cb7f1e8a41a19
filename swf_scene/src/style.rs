//! Resolves fill and line styles into normalized, renderer-neutral values.

use glam::Affine2;
use serde::Serialize;
use tracing::trace;

use crate::{
    shape::{
        FillStyle, Gradient, GradientInterpolation, GradientSpread, LineCapStyle, LineJoinStyle,
        LineStyle, LineStyleFlag, ShapeStyles, edge_map::EdgeMapGroup,
    },
    types::{CharacterId, Color},
};

/// Gamma applied to the RGB channels of every resolved color.
pub const GAMMA: f32 = 2.2;

/// Normalized RGBA with gamma-corrected RGB. Alpha stays linear.
pub fn gamma_correct(color: Color) -> [f32; 4] {
    let channel = |c: u8| (f32::from(c) / 255.0).powf(GAMMA);
    [
        channel(color.r),
        channel(color.g),
        channel(color.b),
        f32::from(color.a) / 255.0,
    ]
}

/// Parses a hex color of any padding (`0xff`, `#00ff00`, `f80`) and gamma
/// corrects it.
pub fn hex_to_rgba(value: &str) -> Option<[f32; 4]> {
    Color::from_hex(value).map(gamma_correct)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FillKind {
    Solid,
    LinearGradient,
    RadialGradient,
    FocalGradient,
    Bitmap,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GradientStop {
    /// Position along the gradient, 0..1.
    pub ratio: f32,
    pub color: [f32; 4],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedGradient {
    pub spread: GradientSpread,
    pub interpolation: GradientInterpolation,
    pub stops: Vec<GradientStop>,
    /// -1..1 along the radius, focal gradients only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_point: Option<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BitmapFill {
    pub id: CharacterId,
    pub is_repeating: bool,
    pub is_smoothed: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedFill {
    pub kind: FillKind,
    /// The solid color; for gradients the first stop, for bitmaps white.
    pub color: [f32; 4],
    /// Gradient square or bitmap space to shape space. Identity for solid fills.
    pub transform: Affine2,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<ResolvedGradient>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitmap: Option<BitmapFill>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedLine {
    /// Stroke width in the resolver's unit.
    pub width: f32,
    pub color: [f32; 4],
    pub start_cap: LineCapStyle,
    pub end_cap: LineCapStyle,
    pub join_style: LineJoinStyle,
    /// Paint of a LineStyle2 stroke filled with a gradient or bitmap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<ResolvedFill>,
    /// Closed paths are drawn without joining the last point to the first.
    pub no_close: bool,
    pub allow_scale_x: bool,
    pub allow_scale_y: bool,
    pub is_pixel_hinted: bool,
}

/// Both style tables of one vocabulary, resolved. Lookups use the 1-based
/// indices found in edges.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResolvedStyles {
    pub fills: Vec<ResolvedFill>,
    pub lines: Vec<ResolvedLine>,
}

impl ResolvedStyles {
    pub fn fill(&self, index: u32) -> Option<&ResolvedFill> {
        index
            .checked_sub(1)
            .and_then(|i| self.fills.get(i as usize))
    }

    pub fn line(&self, index: u32) -> Option<&ResolvedLine> {
        index
            .checked_sub(1)
            .and_then(|i| self.lines.get(i as usize))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleResolver {
    /// Translations and widths are multiplied by this. `1 / 20` yields pixels.
    pub units_per_twip: f32,
}

impl Default for StyleResolver {
    fn default() -> Self {
        Self {
            units_per_twip: 1.0 / 20.0,
        }
    }
}

impl StyleResolver {
    pub fn new(units_per_twip: f32) -> Self {
        Self { units_per_twip }
    }

    pub fn resolve_fill(&self, fill: &FillStyle) -> ResolvedFill {
        match fill {
            FillStyle::Color(color) => ResolvedFill {
                kind: FillKind::Solid,
                color: gamma_correct(*color),
                transform: Affine2::IDENTITY,
                gradient: None,
                bitmap: None,
            },
            FillStyle::LinearGradient(gradient) => {
                self.resolve_gradient(FillKind::LinearGradient, gradient, None)
            }
            FillStyle::RadialGradient(gradient) => {
                self.resolve_gradient(FillKind::RadialGradient, gradient, None)
            }
            FillStyle::FocalGradient {
                gradient,
                focal_point,
            } => self.resolve_gradient(FillKind::FocalGradient, gradient, Some(focal_point.to_f32())),
            FillStyle::Bitmap {
                id,
                matrix,
                is_smoothed,
                is_repeating,
            } => ResolvedFill {
                kind: FillKind::Bitmap,
                color: gamma_correct(Color::WHITE),
                transform: matrix.to_affine(self.units_per_twip),
                gradient: None,
                bitmap: Some(BitmapFill {
                    id: *id,
                    is_repeating: *is_repeating,
                    is_smoothed: *is_smoothed,
                }),
            },
        }
    }

    fn resolve_gradient(&self, kind: FillKind, gradient: &Gradient, focal_point: Option<f32>) -> ResolvedFill {
        let stops: Vec<GradientStop> = gradient
            .records
            .iter()
            .map(|record| GradientStop {
                ratio: f32::from(record.ratio) / 255.0,
                color: gamma_correct(record.color),
            })
            .collect();
        let color = stops
            .first()
            .map(|stop| stop.color)
            .unwrap_or_else(|| gamma_correct(Color::BLACK));
        ResolvedFill {
            kind,
            color,
            transform: gradient.matrix.to_affine(self.units_per_twip),
            gradient: Some(ResolvedGradient {
                spread: gradient.spread,
                interpolation: gradient.interpolation,
                stops,
                focal_point,
            }),
            bitmap: None,
        }
    }

    pub fn resolve_line(&self, line: &LineStyle) -> ResolvedLine {
        ResolvedLine {
            width: line.width.get() as f32 * self.units_per_twip,
            color: gamma_correct(line.color),
            start_cap: line.start_cap,
            end_cap: line.end_cap,
            join_style: line.join_style,
            fill: line.fill_style.as_ref().and_then(|fill| match fill {
                FillStyle::Color(_) => None,
                _ => Some(self.resolve_fill(fill)),
            }),
            no_close: line.flags.contains(LineStyleFlag::NO_CLOSE),
            allow_scale_x: !line.flags.contains(LineStyleFlag::NO_H_SCALE),
            allow_scale_y: !line.flags.contains(LineStyleFlag::NO_V_SCALE),
            is_pixel_hinted: line.flags.contains(LineStyleFlag::PIXEL_HINTING),
        }
    }

    pub fn resolve_styles(&self, styles: &ShapeStyles) -> ResolvedStyles {
        trace!(
            "Resolving {} fill(s), {} line(s)",
            styles.fill_styles.len(),
            styles.line_styles.len()
        );
        ResolvedStyles {
            fills: styles.fill_styles.iter().map(|f| self.resolve_fill(f)).collect(),
            lines: styles.line_styles.iter().map(|l| self.resolve_line(l)).collect(),
        }
    }

    /// Styles of one edge map group. Edge indices are only meaningful against
    /// the table of the group they were filed in.
    pub fn resolve_group(&self, group: &EdgeMapGroup) -> ResolvedStyles {
        self.resolve_styles(&group.styles)
    }
}
