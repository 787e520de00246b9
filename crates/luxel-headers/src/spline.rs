//! Spline serialization
//!
//! Control points travel as deltas (the first point is a delta from the
//! origin); the color and sigma profiles are signed varints. Validation
//! happens on both sides: the encoder refuses malformed splines, the
//! decoder refuses malformed streams.

use luxel_bitstream::{BitstreamReader, BitstreamWriter};
use luxel_core::consts::{MAX_SPLINE_COORD, MAX_SPLINE_POINTS, MIN_SPLINE_POINTS, SPLINE_DCT_LEN};
use luxel_core::{Error, Result, Spline};

pub fn write_splines(splines: &[Spline], writer: &mut BitstreamWriter) -> Result<()> {
    writer.write_varint(splines.len() as u64);
    for spline in splines {
        spline.validate()?;
        writer.write_varint(spline.points.len() as u64);
        let mut prev = (0i32, 0i32);
        for &(x, y) in &spline.points {
            writer.write_signed_varint((x - prev.0) as i64);
            writer.write_signed_varint((y - prev.1) as i64);
            prev = (x, y);
        }
        for channel in &spline.color_dct {
            for &c in channel.iter() {
                writer.write_signed_varint(c as i64);
            }
        }
        for &s in spline.sigma_dct.iter() {
            writer.write_signed_varint(s as i64);
        }
    }
    Ok(())
}

pub fn parse_splines(reader: &mut BitstreamReader<'_>) -> Result<Vec<Spline>> {
    let count = reader.read_varint()? as usize;
    let mut splines = Vec::with_capacity(count.min(256));
    for _ in 0..count {
        let num_points = reader.read_varint()? as usize;
        if !(MIN_SPLINE_POINTS..=MAX_SPLINE_POINTS).contains(&num_points) {
            return Err(Error::DecodeFailed(format!(
                "spline control point count {}",
                num_points
            )));
        }
        let mut points = Vec::with_capacity(num_points);
        let mut prev = (0i64, 0i64);
        for _ in 0..num_points {
            let x = prev.0 + reader.read_signed_varint()?;
            let y = prev.1 + reader.read_signed_varint()?;
            if x.abs() >= MAX_SPLINE_COORD || y.abs() >= MAX_SPLINE_COORD {
                return Err(Error::DecodeFailed(format!(
                    "spline coordinate ({}, {}) out of range",
                    x, y
                )));
            }
            points.push((x as i32, y as i32));
            prev = (x, y);
        }
        let mut color_dct = [[0i32; SPLINE_DCT_LEN]; 3];
        for channel in color_dct.iter_mut() {
            for c in channel.iter_mut() {
                *c = reader.read_signed_varint()? as i32;
            }
        }
        let mut sigma_dct = [0i32; SPLINE_DCT_LEN];
        for s in sigma_dct.iter_mut() {
            *s = reader.read_signed_varint()? as i32;
        }
        splines.push(Spline {
            points,
            color_dct,
            sigma_dct,
        });
    }
    Ok(splines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_spline() -> Spline {
        let mut color_dct = [[0i32; SPLINE_DCT_LEN]; 3];
        color_dct[0][0] = 500;
        color_dct[1][1] = -200;
        color_dct[2][31] = 77;
        let mut sigma_dct = [0i32; SPLINE_DCT_LEN];
        sigma_dct[0] = 40;
        Spline {
            points: vec![(10, 20), (50, 20), (50, -30), (120, 99)],
            color_dct,
            sigma_dct,
        }
    }

    #[test]
    fn roundtrip() {
        let splines = vec![sample_spline()];
        let mut writer = BitstreamWriter::new();
        write_splines(&splines, &mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = BitstreamReader::new(&bytes);
        assert_eq!(parse_splines(&mut reader).unwrap(), splines);
    }

    #[test]
    fn negative_coordinates_roundtrip() {
        let mut spline = sample_spline();
        spline.points = vec![(-4000, -4000), (4000, 4000)];
        let mut writer = BitstreamWriter::new();
        write_splines(&[spline.clone()], &mut writer).unwrap();
        let bytes = writer.into_bytes();
        let mut reader = BitstreamReader::new(&bytes);
        assert_eq!(parse_splines(&mut reader).unwrap(), vec![spline]);
    }

    #[test]
    fn invalid_spline_refused_on_write() {
        let mut spline = sample_spline();
        spline.points.truncate(1);
        let mut writer = BitstreamWriter::new();
        assert!(write_splines(&[spline], &mut writer).is_err());
    }

    #[test]
    fn undersized_point_count_refused_on_parse() {
        let mut writer = BitstreamWriter::new();
        writer.write_varint(1);
        writer.write_varint(1); // single control point
        writer.write_signed_varint(3);
        writer.write_signed_varint(4);
        let bytes = writer.into_bytes();
        let mut reader = BitstreamReader::new(&bytes);
        assert!(parse_splines(&mut reader).is_err());
    }
}
