//! GPX file generation from telemetry samples.
//!
//! Writes GPX 1.1 XML that `pacer route` and `pacer predict` can read back.

use std::{fs, path::Path};

use crate::telemetry::TelemetrySample;

/// How the points are laid out in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpxLayout {
    /// `<trk><trkseg><trkpt>` with timestamps, like a recorded activity.
    #[default]
    Track,
    /// `<rte><rtept>` without timestamps, like a planned course.
    Route,
}

/// Generates a GPX 1.1 XML string from samples.
pub fn generate_gpx(samples: &[TelemetrySample], name: &str, layout: GpxLayout) -> Vec<u8> {
    let mut gpx = String::new();

    gpx.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    gpx.push('\n');
    gpx.push_str(r#"<gpx version="1.1" creator="pacer-test-data""#);
    gpx.push_str(r#" xmlns="http://www.topografix.com/GPX/1/1""#);
    gpx.push_str(r#" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#);
    gpx.push_str(r#" xsi:schemaLocation="http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd">"#);
    gpx.push('\n');

    gpx.push_str("  <metadata>\n");
    gpx.push_str(&format!("    <name>{}</name>\n", escape_xml(name)));
    gpx.push_str("  </metadata>\n");

    let (open, close, point_tag, indent) = match layout {
        GpxLayout::Track => ("  <trk>\n", "    </trkseg>\n  </trk>\n", "trkpt", "      "),
        GpxLayout::Route => ("  <rte>\n", "  </rte>\n", "rtept", "    "),
    };

    gpx.push_str(open);
    gpx.push_str(&format!("    <name>{}</name>\n", escape_xml(name)));
    if layout == GpxLayout::Track {
        gpx.push_str("    <trkseg>\n");
    }

    for sample in samples {
        gpx.push_str(&format!(
            r#"{indent}<{point_tag} lat="{:.7}" lon="{:.7}">"#,
            sample.lat, sample.lon
        ));
        gpx.push('\n');
        gpx.push_str(&format!("{indent}  <ele>{:.2}</ele>\n", sample.altitude));

        if layout == GpxLayout::Track {
            let formatted = sample
                .timestamp
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default();
            gpx.push_str(&format!("{indent}  <time>{formatted}</time>\n"));
        }

        gpx.push_str(&format!("{indent}</{point_tag}>\n"));
    }

    gpx.push_str(close);
    gpx.push_str("</gpx>\n");

    gpx.into_bytes()
}

/// Writes [`generate_gpx`] output to `path`, creating parent directories.
pub fn write_gpx(
    path: impl AsRef<Path>,
    samples: &[TelemetrySample],
    name: &str,
    layout: GpxLayout,
) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, generate_gpx(samples, name, layout))
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
