//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for TIFF I/O and handles the handful of GeoTIFF
//! tags the flood pipeline needs: pixel scale, tiepoint, the GeoKey
//! directory (EPSG code only) and GDAL_NODATA.
//!
//! Windowed reads decode only the strips or tiles that intersect the
//! requested window, so a large coastal mosaic never has to fit in memory.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{BoundingBox, GeoTransform, PixelWindow, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::encoder::colortype::{Gray32Float, Gray8};
use tiff::encoder::compression::{Deflate, Lzw, Uncompressed};
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

const KEY_MODEL_TYPE: u16 = 1024;
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// Compression applied when writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    #[default]
    Deflate,
    Lzw,
}

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    pub compression: Compression,
}

/// Georeferencing metadata of a GeoTIFF, read without decoding pixels
#[derive(Debug, Clone, PartialEq)]
pub struct GeoTiffHeader {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
    /// Declared no-data value (GDAL_NODATA tag)
    pub nodata: Option<f64>,
}

impl GeoTiffHeader {
    /// Geographic extent of the whole file
    pub fn extent(&self) -> Result<BoundingBox> {
        self.transform.extent(self.cols, self.rows)
    }

    /// Pixel window covered by `bbox`, or `NoCoverage`
    pub fn window_for(&self, bbox: &BoundingBox) -> Result<PixelWindow> {
        self.transform
            .window_for(bbox, self.cols, self.rows)
            .ok_or_else(|| Error::NoCoverage(bbox.to_string()))
    }
}

fn open_decoder<P: AsRef<Path>>(path: P) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path.as_ref())?;
    let decoder = Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited());
    Ok(decoder)
}

/// Read only the georeferencing header of a GeoTIFF
pub fn read_geotiff_header<P: AsRef<Path>>(path: P) -> Result<GeoTiffHeader> {
    let mut decoder = open_decoder(path)?;
    read_header(&mut decoder)
}

/// Read a whole GeoTIFF file into a Raster
pub fn read_geotiff<T, P>(path: P) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let mut decoder = open_decoder(path)?;
    let header = read_header(&mut decoder)?;
    let window = PixelWindow::new(0, 0, header.rows, header.cols);
    decode_window(&mut decoder, &header, &window)
}

/// Read the part of a GeoTIFF covered by `bbox`.
///
/// Fails with [`Error::NoCoverage`] when the box does not intersect the file.
pub fn read_geotiff_window<T, P>(path: P, bbox: &BoundingBox) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let mut decoder = open_decoder(path)?;
    let header = read_header(&mut decoder)?;
    let window = header.window_for(bbox)?;
    decode_window(&mut decoder, &header, &window)
}

fn read_header<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTiffHeader> {
    let (width, height) = decoder.dimensions()?;
    let transform = read_geotransform(decoder)?;
    let crs = read_crs(decoder);
    let nodata = decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
        .ok()
        .and_then(|s| f64::parse_nodata(&s));

    Ok(GeoTiffHeader {
        rows: height as usize,
        cols: width as usize,
        transform,
        crs,
        nodata,
    })
}

/// Decode the strips/tiles overlapping `window` and copy them out
fn decode_window<T, R>(
    decoder: &mut Decoder<R>,
    header: &GeoTiffHeader,
    window: &PixelWindow,
) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    if window.is_empty() {
        return Err(Error::InvalidDimensions {
            width: window.cols,
            height: window.rows,
        });
    }
    if window.row_end() > header.rows || window.col_end() > header.cols {
        return Err(Error::IndexOutOfBounds {
            row: window.row_end(),
            col: window.col_end(),
            rows: header.rows,
            cols: header.cols,
        });
    }

    let (chunk_w, chunk_h) = decoder.chunk_dimensions();
    let (chunk_w, chunk_h) = (chunk_w as usize, chunk_h as usize);
    if chunk_w == 0 || chunk_h == 0 {
        return Err(Error::Tiff("zero-sized TIFF chunk".to_string()));
    }
    let chunks_across = header.cols.div_ceil(chunk_w);

    let mut data = vec![T::default_nodata(); window.rows * window.cols];

    let first_chunk_row = window.row_offset / chunk_h;
    let last_chunk_row = (window.row_end() - 1) / chunk_h;
    let first_chunk_col = window.col_offset / chunk_w;
    let last_chunk_col = (window.col_end() - 1) / chunk_w;

    for chunk_row in first_chunk_row..=last_chunk_row {
        for chunk_col in first_chunk_col..=last_chunk_col {
            let index = (chunk_row * chunks_across + chunk_col) as u32;
            let (data_w, data_h) = decoder.chunk_data_dimensions(index);
            let (data_w, data_h) = (data_w as usize, data_h as usize);
            let values: Vec<T> = decoded_to_vec(decoder.read_chunk(index)?)?;

            let origin_row = chunk_row * chunk_h;
            let origin_col = chunk_col * chunk_w;

            let r0 = window.row_offset.max(origin_row);
            let r1 = window.row_end().min(origin_row + data_h);
            let c0 = window.col_offset.max(origin_col);
            let c1 = window.col_end().min(origin_col + data_w);

            let stride = data_w;
            for r in r0..r1 {
                let src = (r - origin_row) * stride + (c0 - origin_col);
                let dst = (r - window.row_offset) * window.cols + (c0 - window.col_offset);
                let n = c1 - c0;
                if src + n > values.len() {
                    return Err(Error::Tiff(format!("chunk {} is shorter than expected", index)));
                }
                data[dst..dst + n].copy_from_slice(&values[src..src + n]);
            }
        }
    }

    let mut raster = Raster::from_vec(data, window.rows, window.cols)?;
    raster.set_transform(header.transform.for_window(window));
    raster.set_crs(header.crs.clone());
    raster.set_nodata(header.nodata.and_then(T::from_f64));
    Ok(raster)
}

fn decoded_to_vec<T: RasterElement>(result: DecodingResult) -> Result<Vec<T>> {
    macro_rules! cast_all {
        ($buf:expr) => {
            $buf.into_iter()
                .map(|v| num_traits::cast(v).unwrap_or(T::default_nodata()))
                .collect()
        };
    }

    let values: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_all!(buf),
        DecodingResult::F64(buf) => cast_all!(buf),
        DecodingResult::U8(buf) => cast_all!(buf),
        DecodingResult::U16(buf) => cast_all!(buf),
        DecodingResult::U32(buf) => cast_all!(buf),
        DecodingResult::I8(buf) => cast_all!(buf),
        DecodingResult::I16(buf) => cast_all!(buf),
        DecodingResult::I32(buf) => cast_all!(buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };
    Ok(values)
}

/// Read GeoTransform from ModelPixelScale + ModelTiepoint tags
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE))
        .map_err(|_| Error::Other("not georeferenced: no ModelPixelScale tag".into()))?;

    let tiepoint = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT))
        .map_err(|_| Error::Other("not georeferenced: no ModelTiepoint tag".into()))?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Ok(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }

    Err(Error::Other("Cannot determine geotransform".into()))
}

/// Pull the model type and an EPSG code out of the GeoKey directory, when
/// they are stored inline
fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))
        .ok()?;

    let mut model = None;
    let mut geographic = None;
    let mut projected = None;
    for entry in keys.get(4..)?.chunks_exact(4) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 {
            continue;
        }
        match key {
            KEY_MODEL_TYPE => model = Some(value),
            KEY_GEOGRAPHIC_TYPE => geographic = Some(value),
            KEY_PROJECTED_CS_TYPE => projected = Some(value),
            _ => {}
        }
    }

    let is_geographic = match model {
        Some(MODEL_TYPE_GEOGRAPHIC) => Some(true),
        Some(MODEL_TYPE_PROJECTED) => Some(false),
        _ => None,
    };
    let code = projected
        .or(geographic)
        .filter(|&code| code != 0 && code != USER_DEFINED);

    match (code, is_geographic) {
        (Some(code), Some(g)) => Some(CRS::from_epsg(code as u32).with_model_type(g)),
        (Some(code), None) => Some(CRS::from_epsg(code as u32)),
        (None, Some(g)) => Some(CRS::user_defined(g)),
        (None, None) => None,
    }
}

fn geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let epsg = crs.and_then(|c| c.epsg()).and_then(|c| u16::try_from(c).ok());
    let geographic = crs.map_or(false, |c| c.is_geographic());

    let mut keys: Vec<[u16; 4]> = vec![
        [
            KEY_MODEL_TYPE,
            0,
            1,
            if geographic { MODEL_TYPE_GEOGRAPHIC } else { MODEL_TYPE_PROJECTED },
        ],
        [KEY_RASTER_TYPE, 0, 1, RASTER_PIXEL_IS_AREA],
    ];
    if let Some(code) = epsg {
        let key = if geographic {
            KEY_GEOGRAPHIC_TYPE
        } else {
            KEY_PROJECTED_CS_TYPE
        };
        keys.push([key, 0, 1, code]);
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

/// Write a Raster as a 32-bit float GeoTIFF
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();
    let nodata = raster.nodata().and_then(|v| v.to_f64());

    let file = File::create(path.as_ref())?;
    encode(
        file,
        raster,
        nodata,
        options.unwrap_or_default(),
        Samples::Float32(&data),
    )
}

/// Write an 8-bit single-band GeoTIFF (flood masks)
pub fn write_mask_geotiff<P: AsRef<Path>>(
    raster: &Raster<u8>,
    path: P,
    options: Option<GeoTiffOptions>,
) -> Result<()> {
    let data: Vec<u8> = raster.data().iter().copied().collect();
    let nodata = raster.nodata().map(f64::from);

    let file = File::create(path.as_ref())?;
    encode(
        file,
        raster,
        nodata,
        options.unwrap_or_default(),
        Samples::UInt8(&data),
    )
}

enum Samples<'a> {
    Float32(&'a [f32]),
    UInt8(&'a [u8]),
}

fn encode<T, W>(
    writer: W,
    raster: &Raster<T>,
    nodata: Option<f64>,
    options: GeoTiffOptions,
    samples: Samples<'_>,
) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer)?;
    let (rows, cols) = raster.shape();
    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    let geokeys = geokey_directory(raster.crs());
    let nodata_text = nodata.map(|v| if v.is_nan() { "nan".to_string() } else { format!("{}", v) });

    macro_rules! write_image {
        ($color:ty, $compression:expr, $data:expr) => {{
            let mut image =
                encoder.new_image_with_compression::<$color, _>(cols as u32, rows as u32, $compression)?;
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE), &scale[..])?;
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT), &tiepoint[..])?;
            image
                .encoder()
                .write_tag(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY), geokeys.as_slice())?;
            if let Some(text) = &nodata_text {
                image
                    .encoder()
                    .write_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA), text.as_str())?;
            }
            image.write_data($data)?;
        }};
    }

    match (samples, options.compression) {
        (Samples::Float32(d), Compression::None) => write_image!(Gray32Float, Uncompressed, d),
        (Samples::Float32(d), Compression::Deflate) => write_image!(Gray32Float, Deflate::default(), d),
        (Samples::Float32(d), Compression::Lzw) => write_image!(Gray32Float, Lzw, d),
        (Samples::UInt8(d), Compression::None) => write_image!(Gray8, Uncompressed, d),
        (Samples::UInt8(d), Compression::Deflate) => write_image!(Gray8, Deflate::default(), d),
        (Samples::UInt8(d), Compression::Lzw) => write_image!(Gray8, Lzw, d),
    }

    Ok(())
}
