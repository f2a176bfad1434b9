use crate::db::log::ttlog;
use crate::db::pool::open_connection;
use crate::errors::{AppError, AppResult};
use crate::utils::path::{ensure_writable, expand_tilde};
use std::fs;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::FileOptions;

pub struct BackupLogic;

impl BackupLogic {
    /// Copy the database to `dest_file`, optionally zipping it.
    /// Returns the path of the file actually written.
    pub fn backup(
        db_path: &str,
        dest_file: &str,
        compress: bool,
        force: bool,
    ) -> AppResult<PathBuf> {
        let src = Path::new(db_path);
        let dest = expand_tilde(dest_file);

        // 1️⃣ Check DB exists
        if !src.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Database not found: {}", src.display()),
            )
            .into());
        }

        // 2️⃣ Ensure destination folder exists
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        // 3️⃣ Never overwrite silently
        let final_target = if compress {
            dest.with_extension("zip")
        } else {
            dest.clone()
        };
        ensure_writable(&final_target, force)?;

        // 4️⃣ Consistent snapshot: fold the WAL back into the main file first
        let conn = open_connection(src)?;
        conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))?;

        fs::copy(src, &dest)?;
        println!("✅ Backup created: {}", dest.display());

        // 5️⃣ Optional compression
        let final_path = if compress {
            let compressed = compress_backup(&dest)?;

            if compressed != dest {
                if let Err(e) = fs::remove_file(&dest) {
                    eprintln!("⚠️ Failed to remove uncompressed backup: {}", e);
                } else {
                    println!("🗑️ Removed uncompressed backup: {}", dest.display());
                }
            }

            compressed
        } else {
            dest
        };

        // 6️⃣ Log in DB
        if let Err(e) = ttlog(
            &conn,
            "backup",
            &final_path.to_string_lossy(),
            if compress {
                "Backup created and compressed"
            } else {
                "Backup created"
            },
        ) {
            eprintln!("⚠️ Failed to write internal log: {}", e);
        }

        Ok(final_path)
    }
}

/// Compress a backup using .zip
fn compress_backup(path: &Path) -> AppResult<PathBuf> {
    let zip_path = path.with_extension("zip");
    let file = fs::File::create(&zip_path)?;
    let mut zip = ZipWriter::new(file);

    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let entry_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| AppError::Other(format!("Invalid backup path: {}", path.display())))?;

    let mut f = fs::File::open(path)?;
    zip.start_file(entry_name, options)
        .map_err(std::io::Error::other)?;

    std::io::copy(&mut f, &mut zip)?;
    zip.finish().map_err(std::io::Error::other)?;

    println!("📦 Compressed: {}", zip_path.display());

    Ok(zip_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::SqliteStore;

    #[test]
    fn backup_copies_and_compresses() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("rcluck.sqlite");
        SqliteStore::open(&db).unwrap();

        let plain = BackupLogic::backup(
            db.to_str().unwrap(),
            dir.path().join("copy.sqlite").to_str().unwrap(),
            false,
            false,
        )
        .unwrap();
        assert!(plain.exists());

        let zipped = BackupLogic::backup(
            db.to_str().unwrap(),
            dir.path().join("snap.sqlite").to_str().unwrap(),
            true,
            false,
        )
        .unwrap();
        assert_eq!(zipped.extension().unwrap(), "zip");
        assert!(zipped.exists());
        assert!(!dir.path().join("snap.sqlite").exists());
    }

    #[test]
    fn missing_database_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.sqlite");
        assert!(
            BackupLogic::backup(missing.to_str().unwrap(), "/tmp/x.sqlite", false, true).is_err()
        );
    }
}
