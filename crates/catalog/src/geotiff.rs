//! GeoTIFF band decoding for fetched assets.
//!
//! Decodes a single-band GeoTIFF into a `Raster<f64>`. The archive
//! serves bands already clipped and resampled to the requested grid, so
//! georeferencing is attached by the provider from the request itself.

use std::io::Cursor;

use tiff::decoder::{Decoder, DecodingResult};

use benthos_core::raster::Raster;

use crate::error::{CatalogError, Result};

/// Decode the first image of a single-band GeoTIFF into an `f64`
/// raster. Supports u8, u16, f32 and f64 sample formats; NaN is the
/// output no-data value (integer formats have none to map).
pub fn decode_band(bytes: &[u8]) -> Result<Raster<f64>> {
    let mut decoder =
        Decoder::new(Cursor::new(bytes)).map_err(|e| CatalogError::Decode(e.to_string()))?;
    let (width, height) = decoder
        .dimensions()
        .map_err(|e| CatalogError::Decode(e.to_string()))?;
    let (rows, cols) = (height as usize, width as usize);

    let data: Vec<f64> = match decoder
        .read_image()
        .map_err(|e| CatalogError::Decode(e.to_string()))?
    {
        DecodingResult::U8(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(buf) => buf.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F64(buf) => buf,
        _ => {
            return Err(CatalogError::Decode(
                "unsupported sample format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(CatalogError::Decode(format!(
            "expected {} samples for {}x{}, got {} (multi-band asset?)",
            rows * cols,
            rows,
            cols,
            data.len()
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols).map_err(CatalogError::Core)?;
    raster.set_nodata(Some(f64::NAN));
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{colortype, TiffEncoder};

    fn encode_gray_f32(rows: usize, cols: usize, values: &[f32]) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        {
            let mut encoder = TiffEncoder::new(&mut bytes).unwrap();
            encoder
                .write_image::<colortype::Gray32Float>(cols as u32, rows as u32, values)
                .unwrap();
        }
        bytes.into_inner()
    }

    #[test]
    fn test_decode_f32_band() {
        let values: Vec<f32> = (0..12).map(|v| v as f32 * 0.5).collect();
        let bytes = encode_gray_f32(3, 4, &values);

        let raster = decode_band(&bytes).unwrap();
        assert_eq!(raster.shape(), (3, 4));
        assert_eq!(raster.get(0, 0).unwrap(), 0.0);
        assert_eq!(raster.get(2, 3).unwrap(), 5.5);
    }

    #[test]
    fn test_decode_garbage_errors() {
        assert!(decode_band(&[0u8, 1, 2, 3]).is_err());
        assert!(decode_band(&[]).is_err());
    }
}
