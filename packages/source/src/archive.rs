//! In-memory extraction of CSV members from the published archives.
//!
//! Both datasets are distributed as an outer zip holding one inner zip per
//! table (`data/<name>.zip`), each wrapping a single `<name>.csv`. Nothing
//! is extracted to disk: the inner archive is buffered and opened from
//! memory. A pre-extracted `<name>.csv` next to the archive is accepted in
//! place of the archive.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use zip::ZipArchive;

use crate::SourceError;

/// Reads the CSV member `name` (without extension) from `archive` in
/// `data_dir`, falling back to `data_dir/<name>.csv` when the archive is
/// absent.
///
/// # Errors
///
/// Returns [`SourceError::MissingEntry`] if neither source holds the
/// member, or an I/O or zip error if a file cannot be read.
pub fn read_member(data_dir: &Path, archive: &str, name: &str) -> Result<Vec<u8>, SourceError> {
    let archive_path = data_dir.join(archive);
    if archive_path.exists() {
        return read_nested(&archive_path, name);
    }

    let plain = data_dir.join(format!("{name}.csv"));
    if plain.exists() {
        log::info!("Reading {}", plain.display());
        return std::fs::read(&plain).map_err(|e| SourceError::Io {
            path: plain.display().to_string(),
            source: e,
        });
    }

    Err(SourceError::MissingEntry {
        path: archive_path.display().to_string(),
        name: name.to_string(),
    })
}

/// Reads `<name>.csv` out of `data/<name>.zip` inside the zip at
/// `archive_path`. A CSV stored directly in the outer archive is also
/// accepted.
///
/// # Errors
///
/// Returns an error if either archive cannot be read or the member is
/// missing.
pub fn read_nested(archive_path: &Path, name: &str) -> Result<Vec<u8>, SourceError> {
    let display = archive_path.display().to_string();
    log::info!("Reading {name} from {display}");

    let file = std::fs::File::open(archive_path).map_err(|e| SourceError::Io {
        path: display.clone(),
        source: e,
    })?;
    let mut outer = ZipArchive::new(file).map_err(|e| SourceError::Zip {
        path: display.clone(),
        source: e,
    })?;

    let inner_name = format!("{name}.zip");
    let csv_name = format!("{name}.csv");

    if let Some(bytes) = read_entry(&mut outer, &inner_name, &display)? {
        let inner_display = format!("{display}!{inner_name}");
        log::debug!("  {inner_name}: {} bytes", bytes.len());

        let mut inner = ZipArchive::new(Cursor::new(bytes)).map_err(|e| SourceError::Zip {
            path: inner_display.clone(),
            source: e,
        })?;
        return read_entry(&mut inner, &csv_name, &inner_display)?.ok_or(
            SourceError::MissingEntry {
                path: inner_display,
                name: csv_name,
            },
        );
    }

    read_entry(&mut outer, &csv_name, &display)?.ok_or(SourceError::MissingEntry {
        path: display,
        name: inner_name,
    })
}

/// Reads the first entry whose file name (ignoring directories) is
/// `file_name`. Returns `Ok(None)` when there is no such entry.
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    file_name: &str,
    display: &str,
) -> Result<Option<Vec<u8>>, SourceError> {
    let Some(index) = (0..archive.len()).find(|&i| {
        archive
            .name_for_index(i)
            .is_some_and(|entry| entry.rsplit('/').next() == Some(file_name))
    }) else {
        return Ok(None);
    };

    let mut entry = archive.by_index(index).map_err(|e| SourceError::Zip {
        path: display.to_string(),
        source: e,
    })?;

    let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or_default());
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| SourceError::Io {
            path: format!("{display}!{file_name}"),
            source: e,
        })?;

    Ok(Some(bytes))
}

/// Writes a two-level archive in the published layout. Test fixture.
#[cfg(test)]
pub(crate) fn write_nested_archive(path: &Path, members: &[(&str, &[u8])]) {
    use std::io::Write;

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    let mut outer = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, csv) in members {
        let mut inner = zip::ZipWriter::new(Cursor::new(Vec::new()));
        inner.start_file(format!("{name}.csv"), options).unwrap();
        inner.write_all(csv).unwrap();
        let inner_bytes = inner.finish().unwrap().into_inner();

        outer
            .start_file(format!("data/{name}.zip"), options)
            .unwrap();
        outer.write_all(&inner_bytes).unwrap();
    }
    outer.finish().unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> std::path::PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&tmp);
        std::fs::create_dir_all(&tmp).unwrap();
        tmp
    }

    #[test]
    fn reads_csv_from_nested_archive() {
        let tmp = scratch("traffic_link_archive_nested");
        write_nested_archive(
            &tmp.join("counts.zip"),
            &[
                ("AADF-data-major-roads", b"Road\nA1\n"),
                ("AADF-data-minor-roads", b"Road\nC\n"),
            ],
        );

        let bytes = read_member(&tmp, "counts.zip", "AADF-data-minor-roads").unwrap();
        assert_eq!(bytes, b"Road\nC\n");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_member_is_reported() {
        let tmp = scratch("traffic_link_archive_missing");
        write_nested_archive(&tmp.join("counts.zip"), &[("AADF-data-major-roads", b"Road\n")]);

        let err = read_member(&tmp, "counts.zip", "AADF-data-minor-roads").unwrap_err();
        assert!(matches!(err, SourceError::MissingEntry { .. }), "{err}");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn falls_back_to_plain_csv() {
        let tmp = scratch("traffic_link_archive_plain");
        std::fs::write(tmp.join("DfTRoadSafety_Accidents_2015.csv"), b"Accident_Index\n").unwrap();

        let bytes = read_member(&tmp, "absent.zip", "DfTRoadSafety_Accidents_2015").unwrap();
        assert_eq!(bytes, b"Accident_Index\n");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn nothing_to_read() {
        let tmp = scratch("traffic_link_archive_nothing");
        let err = read_member(&tmp, "absent.zip", "AADF-data-major-roads").unwrap_err();
        assert!(matches!(err, SourceError::MissingEntry { .. }));
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn corrupt_archive_is_a_zip_error() {
        let tmp = scratch("traffic_link_archive_corrupt");
        std::fs::write(tmp.join("counts.zip"), b"not a zip").unwrap();

        let err = read_member(&tmp, "counts.zip", "AADF-data-major-roads").unwrap_err();
        assert!(matches!(err, SourceError::Zip { .. }), "{err}");

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
