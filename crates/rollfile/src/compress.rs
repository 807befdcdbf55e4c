//! Gzip compression of rotated files.

use crate::error::{WriterError, WriterResult};
use crate::naming;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

/// Compresses `<target>.tmp` into `target` and removes the `.tmp` file.
///
/// On failure the partially written `target` is deleted and the `.tmp` file
/// is left in place, so no rotated data is lost.
///
/// # Errors
///
/// Returns [`WriterError::Compression`] if reading, encoding or writing fails,
/// or [`WriterError::Io`] if the `.tmp` file cannot be removed afterwards.
pub fn compress_rotated(target: &Path) -> WriterResult<()> {
    let source = naming::tmp_path(target);

    if let Err(source_err) = gzip_file(&source, target) {
        if let Err(remove_err) = fs::remove_file(target) {
            if remove_err.kind() != io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %target.display(),
                    error = %remove_err,
                    "failed to remove partial compressed file"
                );
            }
        }
        return Err(WriterError::Compression {
            path: target.to_path_buf(),
            source: source_err,
        });
    }

    fs::remove_file(&source)?;
    Ok(())
}

fn gzip_file(source: &Path, target: &Path) -> io::Result<()> {
    let mut input = BufReader::new(File::open(source)?);
    let output = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)?;

    let mut encoder = GzEncoder::new(BufWriter::new(output), Compression::default());
    io::copy(&mut input, &mut encoder)?;
    let output = encoder
        .finish()?
        .into_inner()
        .map_err(io::IntoInnerError::into_error)?;
    output.sync_all()
}
