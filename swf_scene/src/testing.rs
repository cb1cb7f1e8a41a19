//! Byte stream builders for tests.

use crate::{
    error::Result,
    read::Reader,
    shape::Shape,
    tag::decode::read_define_shape,
    types::{Color, Matrix, Rectangle, Twips},
};

/// Bits needed to store every value as a signed field.
pub fn sbits_width(values: &[i32]) -> u32 {
    values
        .iter()
        .map(|&v| {
            let magnitude = if v < 0 { !v } else { v };
            33 - magnitude.leading_zeros()
        })
        .max()
        .unwrap_or(0)
}

/// Bits needed to store `value` as an unsigned field.
pub fn ubits_width(value: u32) -> u32 {
    32 - value.leading_zeros()
}

#[derive(Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: bool) {
        if self.bit_pos == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> self.bit_pos;
        }
        self.bit_pos = (self.bit_pos + 1) % 8;
    }

    pub fn write_ubits(&mut self, num_bits: u32, value: u32) {
        for i in (0..num_bits).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    pub fn write_sbits(&mut self, num_bits: u32, value: i32) {
        self.write_ubits(num_bits, value as u32);
    }

    pub fn align(&mut self) {
        self.bit_pos = 0;
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.align();
        self.bytes.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
        self.write_u8(0);
    }

    pub fn write_rgb(&mut self, color: Color) {
        self.write_bytes(&[color.r, color.g, color.b]);
    }

    pub fn write_rgba(&mut self, color: Color) {
        self.write_bytes(&[color.r, color.g, color.b, color.a]);
    }

    pub fn write_rectangle(&mut self, rect: &Rectangle) {
        self.align();
        let values = [
            rect.x_min.get(),
            rect.x_max.get(),
            rect.y_min.get(),
            rect.y_max.get(),
        ];
        let num_bits = sbits_width(&values);
        self.write_ubits(5, num_bits);
        for value in values {
            self.write_sbits(num_bits, value);
        }
        self.align();
    }

    pub fn write_matrix(&mut self, matrix: &Matrix) {
        self.align();
        let has_scale = matrix.a != Matrix::IDENTITY.a || matrix.d != Matrix::IDENTITY.d;
        self.write_bit(has_scale);
        if has_scale {
            let values = [matrix.a.bits(), matrix.d.bits()];
            let num_bits = sbits_width(&values);
            self.write_ubits(5, num_bits);
            values.iter().for_each(|&v| self.write_sbits(num_bits, v));
        }
        let has_rotate = matrix.b != Matrix::IDENTITY.b || matrix.c != Matrix::IDENTITY.c;
        self.write_bit(has_rotate);
        if has_rotate {
            let values = [matrix.b.bits(), matrix.c.bits()];
            let num_bits = sbits_width(&values);
            self.write_ubits(5, num_bits);
            values.iter().for_each(|&v| self.write_sbits(num_bits, v));
        }
        let values = [matrix.tx.get(), matrix.ty.get()];
        let num_bits = sbits_width(&values);
        self.write_ubits(5, num_bits);
        values.iter().for_each(|&v| self.write_sbits(num_bits, v));
        self.align();
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// A tag with the shortest header that fits its body.
pub fn tag(code: u16, body: &[u8]) -> Vec<u8> {
    if body.len() < 0x3F {
        let mut bytes = ((code << 6) | body.len() as u16).to_le_bytes().to_vec();
        bytes.extend_from_slice(body);
        bytes
    } else {
        long_tag(code, body)
    }
}

/// A tag that always uses the 32-bit length form.
pub fn long_tag(code: u16, body: &[u8]) -> Vec<u8> {
    let mut bytes = ((code << 6) | 0x3F).to_le_bytes().to_vec();
    bytes.extend_from_slice(&(body.len() as u32).to_le_bytes());
    bytes.extend_from_slice(body);
    bytes
}

pub fn stage(width_px: i32, height_px: i32) -> Rectangle {
    Rectangle {
        x_min: Twips::ZERO,
        x_max: Twips::new(width_px * Twips::TWIPS_PER_PIXEL),
        y_min: Twips::ZERO,
        y_max: Twips::new(height_px * Twips::TWIPS_PER_PIXEL),
    }
}

/// Header fields after the 8-byte signature/version/length prefix.
pub fn movie_body(stage: &Rectangle, frame_rate: u16, num_frames: u16, tags: &[u8]) -> Vec<u8> {
    let mut writer = BitWriter::new();
    writer.write_rectangle(stage);
    writer.write_u16(frame_rate);
    writer.write_u16(num_frames);
    writer.write_bytes(tags);
    writer.finish()
}

/// An uncompressed `FWS` file.
pub fn swf_file(version: u8, stage: &Rectangle, num_frames: u16, tags: &[u8]) -> Vec<u8> {
    let body = movie_body(stage, 24 << 8, num_frames, tags);
    let mut bytes = b"FWS".to_vec();
    bytes.push(version);
    bytes.extend_from_slice(&(body.len() as u32 + 8).to_le_bytes());
    bytes.extend(body);
    bytes
}

/// Encodes a DefineShape body with solid fills and plain line styles.
pub struct ShapeBuilder {
    id: u16,
    version: u8,
    bounds: Rectangle,
    styles: BitWriter,
    records: BitWriter,
    fill_bits: u32,
    line_bits: u32,
    initial_bits: (u32, u32),
}

impl ShapeBuilder {
    pub fn new(id: u16, version: u8, fills: &[Color], lines: &[(u16, Color)]) -> Self {
        let mut styles = BitWriter::new();
        write_style_arrays(&mut styles, version, fills, lines);
        let fill_bits = ubits_width(fills.len() as u32);
        let line_bits = ubits_width(lines.len() as u32);
        Self {
            id,
            version,
            bounds: stage(100, 100),
            styles,
            records: BitWriter::new(),
            fill_bits,
            line_bits,
            initial_bits: (fill_bits, line_bits),
        }
    }

    pub fn style_change(
        &mut self,
        move_to: Option<(i32, i32)>,
        fill0: Option<u32>,
        fill1: Option<u32>,
        line: Option<u32>,
    ) -> &mut Self {
        self.write_style_change(false, move_to, fill0, fill1, line);
        self
    }

    /// A style change record that swaps in new style tables. The indices are
    /// written with the old bit widths but refer to the new tables.
    pub fn new_styles(
        &mut self,
        fills: &[Color],
        lines: &[(u16, Color)],
        fill1: Option<u32>,
        line: Option<u32>,
    ) -> &mut Self {
        self.write_style_change(true, None, None, fill1, line);
        write_style_arrays(&mut self.records, self.version, fills, lines);
        self.fill_bits = ubits_width(fills.len() as u32);
        self.line_bits = ubits_width(lines.len() as u32);
        self.records.write_ubits(4, self.fill_bits);
        self.records.write_ubits(4, self.line_bits);
        self
    }

    fn write_style_change(
        &mut self,
        new_styles: bool,
        move_to: Option<(i32, i32)>,
        fill0: Option<u32>,
        fill1: Option<u32>,
        line: Option<u32>,
    ) {
        let r = &mut self.records;
        r.write_bit(false);
        r.write_bit(new_styles);
        r.write_bit(line.is_some());
        r.write_bit(fill1.is_some());
        r.write_bit(fill0.is_some());
        r.write_bit(move_to.is_some());
        if let Some((x, y)) = move_to {
            let num_bits = sbits_width(&[x, y]);
            r.write_ubits(5, num_bits);
            r.write_sbits(num_bits, x);
            r.write_sbits(num_bits, y);
        }
        if let Some(index) = fill0 {
            r.write_ubits(self.fill_bits, index);
        }
        if let Some(index) = fill1 {
            r.write_ubits(self.fill_bits, index);
        }
        if let Some(index) = line {
            r.write_ubits(self.line_bits, index);
        }
    }

    pub fn straight(&mut self, dx: i32, dy: i32) -> &mut Self {
        let r = &mut self.records;
        let num_bits = sbits_width(&[dx, dy]).max(2);
        r.write_bit(true);
        r.write_bit(true);
        r.write_ubits(4, num_bits - 2);
        if dx != 0 && dy != 0 {
            r.write_bit(true);
            r.write_sbits(num_bits, dx);
            r.write_sbits(num_bits, dy);
        } else if dx == 0 {
            r.write_bit(false);
            r.write_bit(true);
            r.write_sbits(num_bits, dy);
        } else {
            r.write_bit(false);
            r.write_bit(false);
            r.write_sbits(num_bits, dx);
        }
        self
    }

    pub fn curve(&mut self, control_dx: i32, control_dy: i32, anchor_dx: i32, anchor_dy: i32) -> &mut Self {
        let r = &mut self.records;
        let values = [control_dx, control_dy, anchor_dx, anchor_dy];
        let num_bits = sbits_width(&values).max(2);
        r.write_bit(true);
        r.write_bit(false);
        r.write_ubits(4, num_bits - 2);
        values.iter().for_each(|&v| r.write_sbits(num_bits, v));
        self
    }

    /// The tag body, terminated with an end record.
    pub fn body(&mut self) -> Vec<u8> {
        let mut writer = BitWriter::new();
        writer.write_u16(self.id);
        writer.write_rectangle(&self.bounds);
        if self.version >= 4 {
            writer.write_rectangle(&self.bounds);
            writer.write_u8(0);
        }
        writer.write_bytes(&std::mem::take(&mut self.styles).finish());
        writer.write_ubits(4, self.initial_bits.0);
        writer.write_ubits(4, self.initial_bits.1);

        let mut records = std::mem::take(&mut self.records);
        records.write_ubits(6, 0);
        writer.write_bytes(&records.finish());
        writer.finish()
    }
}

fn write_style_arrays(writer: &mut BitWriter, version: u8, fills: &[Color], lines: &[(u16, Color)]) {
    writer.write_u8(fills.len() as u8);
    for &color in fills {
        writer.write_u8(0x00);
        if version >= 3 {
            writer.write_rgba(color);
        } else {
            writer.write_rgb(color);
        }
    }
    writer.write_u8(lines.len() as u8);
    for &(width, color) in lines {
        writer.write_u16(width);
        if version >= 4 {
            // round caps and joins, no fill, no flags
            writer.write_u16(0);
        }
        if version >= 3 {
            writer.write_rgba(color);
        } else {
            writer.write_rgb(color);
        }
    }
}

/// Decodes a DefineShape body as written by [`ShapeBuilder`] (version 3).
pub fn decode_shape(body: &[u8]) -> Result<Shape<'_>> {
    read_define_shape(&mut Reader::new(body, 10), 3)
}
