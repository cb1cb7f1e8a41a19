//! Primitive decoding for SWF's mix of bit-packed and byte-aligned fields.
//!
//! Multi-field records must be read flags first: many field widths are
//! themselves a small bit count read from the stream, and reading anything
//! out of order desynchronizes every following read.

use crate::{
    error::{Error, Result},
    types::{Color, ColorTransform, Fixed8, Fixed16, Matrix, Rectangle, Twips},
};

pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    /// Bits already consumed from `input[pos]`; 0 when byte aligned.
    bit_pos: u8,
    version: u8,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8], version: u8) -> Self {
        Self {
            input,
            pos: 0,
            bit_pos: 0,
            version,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Byte offset of the cursor. A partially consumed byte counts as unread.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The unread, byte-aligned remainder of the input.
    pub fn get_ref(&self) -> &'a [u8] {
        let start = if self.bit_pos > 0 { self.pos + 1 } else { self.pos };
        self.input.get(start..).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Drops any partially read byte so the next read starts on a byte boundary.
    pub fn align(&mut self) {
        if self.bit_pos > 0 {
            self.bit_pos = 0;
            self.pos += 1;
        }
    }

    // ---------- bit level ----------

    pub fn read_bit(&mut self) -> Result<bool> {
        let byte = *self.input.get(self.pos).ok_or(Error::UnexpectedEof)?;
        let bit = (byte >> (7 - self.bit_pos)) & 1;
        self.bit_pos += 1;
        if self.bit_pos == 8 {
            self.bit_pos = 0;
            self.pos += 1;
        }
        Ok(bit == 1)
    }

    pub fn read_ubits(&mut self, num_bits: u32) -> Result<u32> {
        debug_assert!(num_bits <= 32);
        let mut value = 0u32;
        for _ in 0..num_bits {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Two's-complement value of `num_bits` width, sign extended to 32 bits.
    pub fn read_sbits(&mut self, num_bits: u32) -> Result<i32> {
        if num_bits == 0 {
            return Ok(0);
        }
        let value = self.read_ubits(num_bits)?;
        let shift = 32 - num_bits;
        Ok(((value << shift) as i32) >> shift)
    }

    pub fn read_sbits_twips(&mut self, num_bits: u32) -> Result<Twips> {
        self.read_sbits(num_bits).map(Twips::new)
    }

    pub fn read_fbits(&mut self, num_bits: u32) -> Result<Fixed16> {
        self.read_sbits(num_bits).map(Fixed16::from_bits)
    }

    // ---------- byte level ----------

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        self.align();
        let end = self.pos.checked_add(len).ok_or(Error::UnexpectedEof)?;
        let slice = self.input.get(self.pos..end).ok_or(Error::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    /// Consumes everything left in the input.
    pub fn read_to_end(&mut self) -> &'a [u8] {
        self.align();
        let slice = self.input.get(self.pos..).unwrap_or_default();
        self.pos = self.input.len();
        slice
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(self.read_slice(N)?);
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_fixed8(&mut self) -> Result<Fixed8> {
        self.read_i16().map(Fixed8::from_bits)
    }

    /// Null-terminated string. SWF 6+ stores UTF-8; older movies store a
    /// single-byte locale encoding, read here as Latin-1.
    pub fn read_str(&mut self) -> Result<String> {
        self.align();
        let rest = self.input.get(self.pos..).unwrap_or_default();
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::UnexpectedEof)?;
        let bytes = self.read_slice(len)?;
        self.pos += 1;
        Ok(if self.version >= 6 {
            String::from_utf8_lossy(bytes).into_owned()
        } else {
            bytes.iter().map(|&b| char::from(b)).collect()
        })
    }

    // ---------- composite records ----------

    pub fn read_rectangle(&mut self) -> Result<Rectangle> {
        self.align();
        let num_bits = self.read_ubits(5)?;
        let rectangle = Rectangle {
            x_min: self.read_sbits_twips(num_bits)?,
            x_max: self.read_sbits_twips(num_bits)?,
            y_min: self.read_sbits_twips(num_bits)?,
            y_max: self.read_sbits_twips(num_bits)?,
        };
        self.align();
        Ok(rectangle)
    }

    pub fn read_matrix(&mut self) -> Result<Matrix> {
        self.align();
        let mut matrix = Matrix::IDENTITY;
        // Scale
        if self.read_bit()? {
            let num_bits = self.read_ubits(5)?;
            matrix.a = self.read_fbits(num_bits)?;
            matrix.d = self.read_fbits(num_bits)?;
        }
        // Rotate/Skew
        if self.read_bit()? {
            let num_bits = self.read_ubits(5)?;
            matrix.b = self.read_fbits(num_bits)?;
            matrix.c = self.read_fbits(num_bits)?;
        }
        // Translate (always present)
        let num_bits = self.read_ubits(5)?;
        matrix.tx = self.read_sbits_twips(num_bits)?;
        matrix.ty = self.read_sbits_twips(num_bits)?;
        self.align();
        Ok(matrix)
    }

    pub fn read_color_transform(&mut self, with_alpha: bool) -> Result<ColorTransform> {
        self.align();
        let has_add = self.read_bit()?;
        let has_multiply = self.read_bit()?;
        let num_bits = self.read_ubits(4)?;
        let mut color_transform = ColorTransform::IDENTITY;
        if has_multiply {
            color_transform.r_multiply = Fixed8::from_bits(self.read_sbits(num_bits)? as i16);
            color_transform.g_multiply = Fixed8::from_bits(self.read_sbits(num_bits)? as i16);
            color_transform.b_multiply = Fixed8::from_bits(self.read_sbits(num_bits)? as i16);
            if with_alpha {
                color_transform.a_multiply = Fixed8::from_bits(self.read_sbits(num_bits)? as i16);
            }
        }
        if has_add {
            color_transform.r_add = self.read_sbits(num_bits)? as i16;
            color_transform.g_add = self.read_sbits(num_bits)? as i16;
            color_transform.b_add = self.read_sbits(num_bits)? as i16;
            if with_alpha {
                color_transform.a_add = self.read_sbits(num_bits)? as i16;
            }
        }
        self.align();
        Ok(color_transform)
    }

    pub fn read_rgb(&mut self) -> Result<Color> {
        let [r, g, b] = self.read_array()?;
        Ok(Color { r, g, b, a: 255 })
    }

    pub fn read_rgba(&mut self) -> Result<Color> {
        let [r, g, b, a] = self.read_array()?;
        Ok(Color { r, g, b, a })
    }
}
