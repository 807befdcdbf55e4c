//! File naming for active and historical log files.
//!
//! ```text
//! <log_path>/
//! ├─ app.log                          # active file
//! ├─ app.log.20240101000000           # historical file
//! ├─ app.log.20240102000000.gz        # compressed historical file
//! └─ app.log.20240103000000.gz.tmp    # rotated, compression pending
//! ```

use crate::config::Config;
use chrono::{DateTime, TimeZone};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of a rotated file whose compression has not finished.
pub const TMP_SUFFIX: &str = ".tmp";

/// Suffix of a compressed historical file.
pub const GZIP_SUFFIX: &str = ".gz";

/// Returns the path of the active log file.
#[must_use]
pub fn active_path(config: &Config) -> PathBuf {
    config.log_path.join(active_file_name(config))
}

fn active_file_name(config: &Config) -> String {
    if config.file_extension.is_empty() {
        config.file_name.clone()
    } else {
        format!("{}.{}", config.file_name, config.file_extension)
    }
}

/// Returns the historical file name for a rotation happening at `now`.
///
/// The name is `<active>.<time tag>`, with `.gz` appended when compression is on.
#[must_use]
pub fn historical_path<Tz>(config: &Config, now: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut name = format!(
        "{}.{}",
        active_file_name(config),
        now.format(&config.time_tag_format)
    );
    if config.compress {
        name.push_str(GZIP_SUFFIX);
    }
    config.log_path.join(name)
}

/// Appends `.tmp` to `path`.
#[must_use]
pub fn tmp_path(path: &Path) -> PathBuf {
    with_suffix(path, TMP_SUFFIX)
}

/// Returns `target`, or `target` with a numeric suffix if it is already taken.
///
/// A name counts as taken if either it or its `.tmp` sibling exists, so two
/// rotations inside one time tag never overwrite each other.
#[must_use]
pub fn unique_target(target: &Path) -> PathBuf {
    if !is_taken(target) {
        return target.to_path_buf();
    }

    let (stem, gz) = match target.to_str().and_then(|s| s.strip_suffix(GZIP_SUFFIX)) {
        Some(stem) => (PathBuf::from(stem), true),
        None => (target.to_path_buf(), false),
    };

    (1u32..)
        .map(|n| {
            let candidate = with_suffix(&stem, &format!(".{n}"));
            if gz {
                with_suffix(&candidate, GZIP_SUFFIX)
            } else {
                candidate
            }
        })
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| target.to_path_buf())
}

fn is_taken(path: &Path) -> bool {
    path.exists() || tmp_path(path).exists()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
    }

    #[test]
    fn active_path_with_extension() {
        let config = Config::new("/var/log", "app");
        assert_eq!(active_path(&config), PathBuf::from("/var/log/app.log"));
    }

    #[test]
    fn active_path_without_extension() {
        let config = Config::new("/var/log", "app").with_file_extension("");
        assert_eq!(active_path(&config), PathBuf::from("/var/log/app"));
    }

    #[test]
    fn historical_name_uses_time_tag() {
        let config = Config::new("/var/log", "app");
        assert_eq!(
            historical_path(&config, &at_noon()),
            PathBuf::from("/var/log/app.log.20240309120000")
        );
    }

    #[test]
    fn historical_name_compressed() {
        let config = Config::new("/var/log", "app")
            .with_compress(true)
            .with_time_tag_format("%Y-%m-%d");
        assert_eq!(
            historical_path(&config, &at_noon()),
            PathBuf::from("/var/log/app.log.2024-03-09.gz")
        );
    }

    #[test]
    fn tmp_suffix_appended() {
        assert_eq!(
            tmp_path(Path::new("/a/app.log.1.gz")),
            PathBuf::from("/a/app.log.1.gz.tmp")
        );
    }

    #[test]
    fn unique_target_free_name_unchanged() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("app.log.1");
        assert_eq!(unique_target(&target), target);
    }

    #[test]
    fn unique_target_skips_taken_names() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("app.log.tag");
        std::fs::write(&target, b"x").unwrap();
        std::fs::write(dir.path().join("app.log.tag.1"), b"x").unwrap();

        assert_eq!(unique_target(&target), dir.path().join("app.log.tag.2"));
    }

    #[test]
    fn unique_target_keeps_gzip_suffix_last() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("app.log.tag.gz");
        std::fs::write(tmp_path(&target), b"pending").unwrap();

        assert_eq!(unique_target(&target), dir.path().join("app.log.tag.1.gz"));
    }
}
