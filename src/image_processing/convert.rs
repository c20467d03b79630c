use std::io::{BufWriter, Write};
use std::path::Path;

use super::quantize::IndexedImage;
use super::TransformError;

/// Encode an indexed image as an 8-bit palette PNG.
///
/// Alpha is carried in a `tRNS` chunk, trimmed after the last non-opaque entry.
pub fn encode_png<W: Write>(indexed: &IndexedImage, writer: W) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(writer, indexed.width, indexed.height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);

    let palette: Vec<u8> = indexed
        .palette
        .iter()
        .flat_map(|c| [c[0], c[1], c[2]])
        .collect();
    encoder.set_palette(palette);

    if indexed.has_transparency() {
        let mut trns: Vec<u8> = indexed.palette.iter().map(|c| c[3]).collect();
        while trns.last() == Some(&255) {
            trns.pop();
        }
        encoder.set_trns(trns);
    }

    let mut writer = encoder.write_header()?;
    writer.write_image_data(&indexed.indices)?;
    writer.finish()
}

/// Write the PNG next to `output` under a temporary name, then rename it into place.
///
/// On any failure the temporary file is removed and `output` is left untouched.
pub fn write_png_atomically(indexed: &IndexedImage, output: &Path) -> Result<(), TransformError> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".artwork-")
        .suffix(".part")
        .tempfile_in(dir)?;

    {
        let mut buffered = BufWriter::new(tmp.as_file_mut());
        encode_png(indexed, &mut buffered)?;
        buffered.flush()?;
    }

    // Replaces an existing file of the same name
    tmp.persist(output).map_err(|e| e.error)?;
    Ok(())
}
