//! Rotate-file command implementation.

use chrono::Local;
use rollfile::{naming, Config, ManualManager, RollingWriter, Writer};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Runs the rotate-file command.
///
/// Opens the active file described by `config`, moves it to `target` (or a
/// time-tagged name), and waits for compression to finish.
pub fn run(config: Config, target: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let target = rotate(config, target)?;
    info!(target = %target.display(), "rotated");
    Ok(())
}

/// Rotates once and returns the requested target name.
pub fn rotate(
    config: Config,
    target: Option<PathBuf>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let config = Arc::new(config);
    let target = target.unwrap_or_else(|| naming::historical_path(&config, &Local::now()));

    let manager = ManualManager::new(Arc::clone(&config));
    let writer = Writer::open(config, Box::new(manager))?;
    writer.reopen(target.clone())?;
    writer.close()?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rotate_moves_active_file() {
        let dir = tempdir().unwrap();
        let active = dir.path().join("svc.log");
        std::fs::write(&active, b"before").unwrap();

        let target = dir.path().join("svc.log.manual");
        rotate(Config::new(dir.path(), "svc"), Some(target.clone())).unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"before");
        assert!(std::fs::read(&active).unwrap().is_empty());
    }

    #[test]
    fn test_rotate_default_name_is_time_tagged() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("svc.log"), b"x").unwrap();

        let target = rotate(Config::new(dir.path(), "svc"), None).unwrap();
        let name = target.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("svc.log."));
        assert!(target.exists());
    }

    #[test]
    fn test_rotate_compressed() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("svc.log"), b"zip me").unwrap();

        let target = dir.path().join("svc.log.1.gz");
        rotate(
            Config::new(dir.path(), "svc").with_compress(true),
            Some(target.clone()),
        )
        .unwrap();

        assert!(target.exists());
        assert!(!dir.path().join("svc.log.1.gz.tmp").exists());
    }
}
