use std::iter::FusedIterator;

use serde::Serialize;
use tracing::trace;

use crate::{
    error::{Error, Result},
    read::Reader,
    shape::ShapeStyles,
    types::{Point, Twips},
};

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeRecord {
    StyleChange(Box<StyleChangeData>),
    StraightEdge {
        delta: Point,
        kind: StraightEdgeKind,
    },
    CurvedEdge {
        control_delta: Point,
        anchor_delta: Point,
    },
    End,
}

/// How a straight edge's delta was stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StraightEdgeKind {
    General,
    Vertical,
    Horizontal,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleChangeData {
    /// Absolute position relative to the shape origin.
    pub move_to: Option<Point>,
    pub fill_style_0: Option<u32>,
    pub fill_style_1: Option<u32>,
    pub line_style: Option<u32>,
    /// Replacement style tables. The indices in the same record already
    /// refer to these.
    pub new_styles: Option<ShapeStyles>,
}

/// The still-encoded record stream of a shape, with the bit widths its style
/// indices start out with.
#[derive(Clone, Copy, Debug)]
pub struct ShapeRecords<'a> {
    data: &'a [u8],
    shape_version: u8,
    num_fill_bits: u8,
    num_line_bits: u8,
}

impl<'a> ShapeRecords<'a> {
    pub(crate) fn read(reader: &mut Reader<'a>, shape_version: u8) -> Result<Self> {
        let num_fill_bits = reader.read_ubits(4)? as u8;
        let num_line_bits = reader.read_ubits(4)? as u8;
        Ok(Self {
            data: reader.read_to_end(),
            shape_version,
            num_fill_bits,
            num_line_bits,
        })
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn iter(&self) -> ShapeRecordIter<'a> {
        ShapeRecordIter {
            // Shape records never contain strings, so the SWF version is irrelevant.
            reader: Reader::new(self.data, 0),
            shape_version: self.shape_version,
            num_fill_bits: u32::from(self.num_fill_bits),
            num_line_bits: u32::from(self.num_line_bits),
            finished: false,
        }
    }
}

/// Decodes one record per step. Yields [`ShapeRecord::End`] last; after an
/// error nothing more is yielded since the bit position can't be trusted.
pub struct ShapeRecordIter<'a> {
    reader: Reader<'a>,
    shape_version: u8,
    num_fill_bits: u32,
    num_line_bits: u32,
    finished: bool,
}

impl ShapeRecordIter<'_> {
    fn read_record(&mut self) -> Result<ShapeRecord> {
        let is_edge = self.reader.read_bit()?;
        if is_edge {
            self.read_edge()
        } else {
            self.read_style_change()
        }
    }

    fn read_edge(&mut self) -> Result<ShapeRecord> {
        let r = &mut self.reader;
        let is_straight = r.read_bit()?;
        let num_bits = r.read_ubits(4)? + 2;
        let record = if is_straight {
            let (delta, kind) = if r.read_bit()? {
                let dx = r.read_sbits_twips(num_bits)?;
                let dy = r.read_sbits_twips(num_bits)?;
                (Point::new(dx, dy), StraightEdgeKind::General)
            } else if r.read_bit()? {
                let dy = r.read_sbits_twips(num_bits)?;
                (Point::new(Twips::ZERO, dy), StraightEdgeKind::Vertical)
            } else {
                let dx = r.read_sbits_twips(num_bits)?;
                (Point::new(dx, Twips::ZERO), StraightEdgeKind::Horizontal)
            };
            ShapeRecord::StraightEdge { delta, kind }
        } else {
            let control_delta = Point::new(r.read_sbits_twips(num_bits)?, r.read_sbits_twips(num_bits)?);
            let anchor_delta = Point::new(r.read_sbits_twips(num_bits)?, r.read_sbits_twips(num_bits)?);
            ShapeRecord::CurvedEdge {
                control_delta,
                anchor_delta,
            }
        };
        Ok(record)
    }

    fn read_style_change(&mut self) -> Result<ShapeRecord> {
        let flags = self.reader.read_ubits(5)?;
        if flags == 0 {
            return Ok(ShapeRecord::End);
        }

        let r = &mut self.reader;
        let mut data = StyleChangeData::default();
        if flags & 0b1 != 0 {
            let num_bits = r.read_ubits(5)?;
            let x = r.read_sbits_twips(num_bits)?;
            let y = r.read_sbits_twips(num_bits)?;
            data.move_to = Some(Point::new(x, y));
        }
        if flags & 0b10 != 0 {
            data.fill_style_0 = Some(r.read_ubits(self.num_fill_bits)?);
        }
        if flags & 0b100 != 0 {
            data.fill_style_1 = Some(r.read_ubits(self.num_fill_bits)?);
        }
        if flags & 0b1000 != 0 {
            data.line_style = Some(r.read_ubits(self.num_line_bits)?);
        }
        if flags & 0b10000 != 0 {
            let styles = ShapeStyles::read(r, self.shape_version)?;
            self.num_fill_bits = r.read_ubits(4)?;
            self.num_line_bits = r.read_ubits(4)?;
            trace!(
                "New styles: {} fills, {} lines, bits {}/{}",
                styles.fill_styles.len(),
                styles.line_styles.len(),
                self.num_fill_bits,
                self.num_line_bits
            );
            data.new_styles = Some(styles);
        }
        Ok(ShapeRecord::StyleChange(Box::new(data)))
    }
}

impl Iterator for ShapeRecordIter<'_> {
    type Item = Result<ShapeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let record = match self.read_record() {
            Err(Error::UnexpectedEof) => Err(Error::malformed(format!(
                "record stream ended at byte {} without an end record",
                self.reader.position()
            ))),
            record => record,
        };
        if matches!(record, Ok(ShapeRecord::End) | Err(_)) {
            self.finished = true;
        }
        Some(record)
    }
}

impl FusedIterator for ShapeRecordIter<'_> {}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{testing::ShapeBuilder, types::Color};

    fn records(body: &[u8], version: u8) -> anyhow::Result<Vec<ShapeRecord>> {
        let mut reader = Reader::new(body, 10);
        reader.read_u16()?;
        reader.read_rectangle()?;
        ShapeStyles::read(&mut reader, version)?;
        let records = ShapeRecords::read(&mut reader, version)?;
        Ok(records.iter().collect::<Result<Vec<_>>>()?)
    }

    #[test]
    fn decodes_edges_and_style_changes() -> anyhow::Result<()> {
        let body = ShapeBuilder::new(1, 1, &[Color::BLACK], &[])
            .style_change(Some((10, -10)), None, Some(1), None)
            .straight(100, 0)
            .straight(0, 50)
            .straight(-100, -50)
            .curve(5, 5, -5, 5)
            .body();
        let records = records(&body, 1)?;
        assert_eq!(records.len(), 6);

        let ShapeRecord::StyleChange(change) = &records[0] else {
            panic!("expected a style change");
        };
        assert_eq!(change.move_to, Some(Point::new(Twips::new(10), Twips::new(-10))));
        assert_eq!((change.fill_style_0, change.fill_style_1, change.line_style), (None, Some(1), None));

        assert_eq!(
            records[1],
            ShapeRecord::StraightEdge {
                delta: Point::new(Twips::new(100), Twips::ZERO),
                kind: StraightEdgeKind::Horizontal,
            }
        );
        assert!(matches!(records[2], ShapeRecord::StraightEdge { kind: StraightEdgeKind::Vertical, .. }));
        assert!(matches!(records[3], ShapeRecord::StraightEdge { kind: StraightEdgeKind::General, .. }));
        assert_eq!(
            records[4],
            ShapeRecord::CurvedEdge {
                control_delta: Point::new(Twips::new(5), Twips::new(5)),
                anchor_delta: Point::new(Twips::new(-5), Twips::new(5)),
            }
        );
        assert_eq!(records[5], ShapeRecord::End);
        Ok(())
    }

    #[test]
    fn new_styles_change_index_widths() -> anyhow::Result<()> {
        let fills = [Color::BLACK, Color::WHITE, Color::from_rgb(0xFF0000, 255)];
        let body = ShapeBuilder::new(1, 2, &[Color::BLACK], &[])
            .style_change(None, None, Some(1), None)
            .straight(20, 0)
            .new_styles(&fills, &[(20, Color::BLACK)], Some(1), None)
            .style_change(None, Some(3), None, Some(1))
            .straight(0, 20)
            .body();
        let records = records(&body, 2)?;

        let ShapeRecord::StyleChange(swap) = &records[2] else {
            panic!("expected a style change");
        };
        let new_styles = swap.new_styles.as_ref().map(|s| (s.fill_styles.len(), s.line_styles.len()));
        assert_eq!(new_styles, Some((3, 1)));

        // Read with the widened 2-bit fill index.
        let ShapeRecord::StyleChange(change) = &records[3] else {
            panic!("expected a style change");
        };
        assert_eq!((change.fill_style_0, change.line_style), (Some(3), Some(1)));
        assert!(matches!(records[4], ShapeRecord::StraightEdge { .. }));
        assert_eq!(records.last(), Some(&ShapeRecord::End));
        Ok(())
    }

    #[test]
    fn missing_end_record_is_malformed() -> anyhow::Result<()> {
        let mut reader = Reader::new(&[0x10], 10);
        let records = ShapeRecords::read(&mut reader, 1)?;
        assert!(records.data().is_empty());

        let mut iter = records.iter();
        assert!(matches!(iter.next(), Some(Err(Error::MalformedShapeRecord(_)))));
        assert!(iter.next().is_none());
        Ok(())
    }

    #[test]
    fn iteration_stops_after_end() -> anyhow::Result<()> {
        // end record, then garbage
        let data = [0x00, 0xFF, 0xFF];
        let records = ShapeRecords {
            data: &data,
            shape_version: 1,
            num_fill_bits: 1,
            num_line_bits: 0,
        };
        let decoded: Vec<_> = records.iter().collect::<Result<_>>()?;
        assert_eq!(decoded, vec![ShapeRecord::End]);
        Ok(())
    }
}
