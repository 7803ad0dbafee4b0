//! Gzip and zip handling for downloaded dumps

use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use tracing::debug;

use crate::error::{IngestError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];

pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| IngestError::Archive(format!("gzip: {}", e)))?;
    debug!(compressed = data.len(), decompressed = decompressed.len(), "Decompressed gzip");
    Ok(decompressed)
}

/// Contents of the first zip entry whose name satisfies `select`
pub fn extract_zip_entry<F>(data: &[u8], select: F) -> Result<(String, Vec<u8>)>
where
    F: Fn(&str) -> bool,
{
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() || !select(file.name()) {
            continue;
        }
        let name = file.name().to_string();
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        debug!(entry = %name, bytes = contents.len(), "Extracted zip entry");
        return Ok((name, contents));
    }

    Err(IngestError::Archive(
        "zip archive has no matching entry".to_string(),
    ))
}

/// Unpack `data` according to its file name or magic bytes.
///
/// `.gz` is gunzipped; `.zip` yields its first non-directory entry; anything
/// else is returned unchanged.
pub fn maybe_decompress(name: &str, data: Vec<u8>) -> Result<Vec<u8>> {
    let lower = name.to_lowercase();
    if lower.ends_with(".gz") || data.starts_with(&GZIP_MAGIC) {
        decompress_gzip(&data)
    } else if lower.ends_with(".zip") || data.starts_with(&ZIP_MAGIC) {
        extract_zip_entry(&data, |_| true).map(|(_, contents)| contents)
    } else {
        Ok(data)
    }
}
