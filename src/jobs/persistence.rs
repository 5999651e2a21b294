//! # Persistencia de Jobs
//! src/jobs/persistence.rs
//!
//! Snapshot JSON del almacén para que los registros sobrevivan a un
//! reinicio. Sólo lo usa el hilo de mantenimiento y el arranque del
//! servidor; las operaciones del manager nunca tocan disco.

use crate::error::StorageError;
use crate::jobs::types::Job;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Escribe todos los jobs en `path`
///
/// Escribe primero a `<path>.tmp` y luego renombra, así un lector nunca ve
/// un archivo a medio escribir.
pub fn save_snapshot(path: &Path, jobs: &[Job]) -> Result<(), StorageError> {
    let temp_path = temp_path(path);

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, jobs)?;
        writer.flush()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Lee el snapshot de `path`
///
/// Un archivo inexistente equivale a un snapshot vacío. Un archivo corrupto
/// es un error: el llamador decide si lo ignora.
pub fn load_snapshot(path: &Path) -> Result<Vec<Job>, StorageError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let jobs = serde_json::from_reader(BufReader::new(file))?;
    Ok(jobs)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::JobStatus;
    use chrono::Utc;

    fn temp_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        let _ = fs::remove_file(&path); // Limpiar
        path
    }

    // ==================== Save / Load ====================

    #[test]
    fn test_snapshot_save_and_load() {
        let path = temp_file("job_server_snapshot_roundtrip.json");

        let now = Utc::now();
        let pending = Job::new("a.pending", None, Some(5), now);
        let mut done = Job::new("a.done", None, None, now);
        done.start(now).unwrap();
        done.complete(Some("/servers/1".to_string()), now).unwrap();

        save_snapshot(&path, &[pending.clone(), done.clone()]).unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, vec![pending, done]);
        assert!(!temp_path(&path).exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_snapshot_overwrites_previous() {
        let path = temp_file("job_server_snapshot_overwrite.json");
        let now = Utc::now();

        save_snapshot(&path, &[Job::new("a", None, None, now)]).unwrap();
        save_snapshot(&path, &[]).unwrap();

        assert!(load_snapshot(&path).unwrap().is_empty());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_file() {
        let path = temp_file("job_server_snapshot_missing.json");

        let loaded = load_snapshot(&path).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_snapshot_format_is_camel_case() {
        let path = temp_file("job_server_snapshot_format.json");
        let now = Utc::now();

        let mut job = Job::new("a.b", None, None, now);
        job.cancel(now).unwrap();
        save_snapshot(&path, &[job]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"createdAt\""));
        assert!(raw.contains("\"finishedAt\""));
        assert!(raw.contains("\"CANCELED\""));

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded[0].status, JobStatus::Canceled);

        let _ = fs::remove_file(&path);
    }

    // ==================== Corrupted File Handling ====================

    #[test]
    fn test_load_corrupted_file() {
        let path = temp_file("job_server_snapshot_corrupted.json");
        fs::write(&path, b"{ this is not valid json }").unwrap();

        let result = load_snapshot(&path);
        assert!(matches!(result, Err(StorageError::Json(_))));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_empty_file() {
        let path = temp_file("job_server_snapshot_empty.json");
        fs::write(&path, b"").unwrap();

        assert!(load_snapshot(&path).is_err());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_save_into_missing_directory() {
        let path = std::env::temp_dir()
            .join("job_server_no_such_dir")
            .join("jobs.json");

        let result = save_snapshot(&path, &[]);
        assert!(matches!(result, Err(StorageError::Io(_))));
    }
}
