use crate::error::{CoreError, CoreResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

// Deterministic zip:
// - entries sorted lexicographically by name
// - fixed timestamps (DOS epoch)
// - fixed compression method/level and permissions
// - empty archive comment
pub fn zip_entries_deterministic(entries: &[(String, Vec<u8>)], out_zip: &Path) -> CoreResult<String> {
    let mut sorted: Vec<&(String, Vec<u8>)> = entries.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(CoreError::InvalidInput(format!(
                "duplicate zip entry {}",
                pair[0].0
            )));
        }
    }

    if let Some(parent) = out_zip.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let f = File::create(out_zip)?;
    let mut zw = ZipWriter::new(f);

    let fixed_time = zip::DateTime::from_date_and_time(1980, 1, 1, 0, 0, 0).map_err(|_| {
        CoreError::DeterminismViolation("failed to create fixed zip datetime".to_string())
    })?;
    let opts = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
        .last_modified_time(fixed_time)
        .unix_permissions(0o644);

    for (name, bytes) in sorted {
        zw.start_file(name.as_str(), opts)
            .map_err(|e| CoreError::Zip(e.to_string()))?;
        zw.write_all(bytes)?;
    }

    zw.set_comment("");
    zw.finish().map_err(|e| CoreError::Zip(e.to_string()))?;

    let zip_bytes = std::fs::read(out_zip)?;
    Ok(crate::determinism::run_id::sha256_hex(&zip_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_entries_same_hash() {
        let dir = tempfile::tempdir().unwrap();
        let a = vec![
            ("b.csv".to_string(), b"x\n".to_vec()),
            ("a.csv".to_string(), b"y\n".to_vec()),
        ];
        let mut b = a.clone();
        b.reverse();
        let h1 = zip_entries_deterministic(&a, &dir.path().join("1.zip")).unwrap();
        let h2 = zip_entries_deterministic(&b, &dir.path().join("2.zip")).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn duplicate_names_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            ("a.csv".to_string(), vec![]),
            ("a.csv".to_string(), vec![]),
        ];
        assert!(zip_entries_deterministic(&entries, &dir.path().join("x.zip")).is_err());
    }
}
