use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use exif::{In, Reader, Tag, Value};

/// Source of an embedded "date taken" value.
pub trait MetadataReader {
    /// Raw `YYYY:MM:DD HH:MM:SS` value, `Ok(None)` if the file has none.
    /// Errors are not fatal to the caller: they mean "field absent".
    fn read_date_taken(&self, path: &Path) -> anyhow::Result<Option<String>>;
}

/// Reads `DateTimeOriginal` from the primary IFD using kamadak-exif.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifMetadata;

impl MetadataReader for ExifMetadata {
    fn read_date_taken(&self, path: &Path) -> anyhow::Result<Option<String>> {
        let file = File::open(path)?;
        let exif = Reader::new()
            .read_from_container(&mut BufReader::new(file))
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        Ok(exif
            .get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .and_then(|field| match &field.value {
                Value::Ascii(values) => values
                    .first()
                    .map(|raw| String::from_utf8_lossy(raw).into_owned()),
                _ => None,
            }))
    }
}
