//! GDAL VRT mosaic output
//!
//! Tiles are written as independent GeoTIFFs; a VRT stitches them into one
//! virtual dataset so GIS tools can open the whole region at once. Sources
//! are listed in order, so where tiles overlap the later tile wins.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::GeoTransform;

/// One raster referenced by a VRT mosaic
#[derive(Debug, Clone)]
pub struct VrtSource {
    pub path: PathBuf,
    pub transform: GeoTransform,
    pub rows: usize,
    pub cols: usize,
}

/// Write a single-band Byte VRT mosaicking `sources`.
///
/// All sources must share the pixel size of the first one. Paths are
/// written relative to the VRT's directory when possible.
pub fn write_vrt_mosaic<P: AsRef<Path>>(
    sources: &[VrtSource],
    crs: Option<&CRS>,
    nodata: Option<u8>,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    let first = sources.first().ok_or_else(|| Error::InvalidParameter {
        name: "sources",
        value: "[]".to_string(),
        reason: "a mosaic needs at least one source".to_string(),
    })?;

    let (px_w, px_h) = first.transform.pixel_size();
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for src in sources {
        let (w, h) = src.transform.pixel_size();
        if (w - px_w).abs() > px_w * 1e-6 || (h - px_h).abs() > px_h * 1e-6 {
            return Err(Error::InvalidParameter {
                name: "sources",
                value: src.path.display().to_string(),
                reason: format!("pixel size {}x{} differs from {}x{}", w, h, px_w, px_h),
            });
        }
        let (x0, y0, x1, y1) = src.transform.bounds(src.cols, src.rows);
        min_x = min_x.min(x0);
        min_y = min_y.min(y0);
        max_x = max_x.max(x1);
        max_y = max_y.max(y1);
    }

    let width = ((max_x - min_x) / px_w).round() as usize;
    let height = ((max_y - min_y) / px_h).round() as usize;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    let mut xml = String::new();
    // Writing into a String never fails
    let _ = writeln!(xml, r#"<VRTDataset rasterXSize="{}" rasterYSize="{}">"#, width, height);
    let srs = crs.and_then(|crs| {
        crs.wkt()
            .map(str::to_string)
            .or_else(|| crs.epsg().map(|code| format!("EPSG:{}", code)))
    });
    if let Some(srs) = srs {
        let _ = writeln!(xml, "  <SRS>{}</SRS>", escape(&srs));
    }
    let _ = writeln!(
        xml,
        "  <GeoTransform>{:.15e}, {:.15e}, 0.0, {:.15e}, 0.0, {:.15e}</GeoTransform>",
        min_x, px_w, max_y, -px_h
    );
    let _ = writeln!(xml, r#"  <VRTRasterBand dataType="Byte" band="1">"#);
    if let Some(nd) = nodata {
        let _ = writeln!(xml, "    <NoDataValue>{}</NoDataValue>", nd);
    }

    for src in sources {
        let (x0, _, _, y1) = src.transform.bounds(src.cols, src.rows);
        let x_off = ((x0 - min_x) / px_w).round() as i64;
        let y_off = ((max_y - y1) / px_h).round() as i64;

        let (name, relative) = match src.path.strip_prefix(base) {
            Ok(rel) if !base.as_os_str().is_empty() => (rel.to_path_buf(), 1),
            _ => (src.path.clone(), 0),
        };

        let _ = writeln!(xml, "    <SimpleSource>");
        let _ = writeln!(
            xml,
            r#"      <SourceFilename relativeToVRT="{}">{}</SourceFilename>"#,
            relative,
            escape(&name.to_string_lossy())
        );
        let _ = writeln!(xml, "      <SourceBand>1</SourceBand>");
        let _ = writeln!(
            xml,
            r#"      <SrcRect xOff="0" yOff="0" xSize="{}" ySize="{}" />"#,
            src.cols, src.rows
        );
        let _ = writeln!(
            xml,
            r#"      <DstRect xOff="{}" yOff="{}" xSize="{}" ySize="{}" />"#,
            x_off, y_off, src.cols, src.rows
        );
        let _ = writeln!(xml, "    </SimpleSource>");
    }

    let _ = writeln!(xml, "  </VRTRasterBand>");
    let _ = writeln!(xml, "</VRTDataset>");

    std::fs::write(path, xml)?;
    Ok(())
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_tile_mosaic() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![
            VrtSource {
                path: dir.path().join("tile_000.tif"),
                transform: GeoTransform::new(0.0, 10.0, 1.0, -1.0),
                rows: 10,
                cols: 6,
            },
            VrtSource {
                path: dir.path().join("tile_001.tif"),
                transform: GeoTransform::new(5.0, 10.0, 1.0, -1.0),
                rows: 10,
                cols: 5,
            },
        ];
        let vrt = dir.path().join("mosaic.vrt");
        write_vrt_mosaic(&sources, Some(&CRS::wgs84()), Some(255), &vrt).unwrap();

        let xml = std::fs::read_to_string(&vrt).unwrap();
        assert!(xml.contains(r#"rasterXSize="10" rasterYSize="10""#));
        assert!(xml.contains("<SRS>EPSG:4326</SRS>"));
        assert!(xml.contains(r#"<SourceFilename relativeToVRT="1">tile_001.tif</SourceFilename>"#));
        assert!(xml.contains(r#"<DstRect xOff="5" yOff="0" xSize="5" ySize="10" />"#));
        assert!(xml.contains("<NoDataValue>255</NoDataValue>"));
    }

    #[test]
    fn test_empty_mosaic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_vrt_mosaic(&[], None, None, dir.path().join("x.vrt"));
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }
}
