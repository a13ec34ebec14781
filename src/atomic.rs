//! Escritura atómica: los manejadores escriben en un archivo temporal del mismo
//! directorio y solo un renombrado publica el resultado completo.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use tempfile::{Builder, PathPersistError};
use tracing::debug;

use crate::error::HandlerError;

const STAGING_PREFIX: &str = ".scrubmeta-";

/// Resultado de una escritura publicada.
#[derive(Debug)]
pub struct Staged<T> {
    pub value: T,
    pub bytes_written: u64,
}

/// Publica salidas mediante archivo temporal + renombrado en el mismo volumen.
#[derive(Clone, Copy, Debug, Default)]
pub struct AtomicWriter {
    overwrite: bool,
}

impl AtomicWriter {
    pub fn new(overwrite: bool) -> Self {
        Self { overwrite }
    }

    /// Ejecuta `write` sobre una ruta temporal y, si tiene éxito, la renombra a `output`.
    ///
    /// La ruta temporal se elimina en cualquier otra salida, incluidos errores y pánicos de `write`.
    pub fn with_staging<T, F>(&self, output: &Path, write: F) -> Result<Staged<T>, HandlerError>
    where
        F: FnOnce(&Path) -> Result<T, HandlerError>,
    {
        let parent = output
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        fs::create_dir_all(parent).map_err(|error| {
            HandlerError::output(
                format!(
                    "Failed to create output directory {}: {error}",
                    parent.display()
                ),
                Some(error),
            )
        })?;

        let suffix = output
            .extension()
            .map(|extension| {
                let mut suffix = OsStr::new(".").to_os_string();
                suffix.push(extension);
                suffix
            })
            .unwrap_or_default();

        let staging = Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(&suffix)
            .tempfile_in(parent)
            .map_err(|error| {
                HandlerError::output(
                    format!(
                        "Failed to create temporary file in {}: {error}",
                        parent.display()
                    ),
                    Some(error),
                )
            })?
            .into_temp_path();

        let value = write(&staging)?;

        let bytes_written = fs::metadata(&staging)
            .map(|metadata| metadata.len())
            .map_err(|error| HandlerError::io(staging.to_path_buf(), error))?;

        let promoted = if self.overwrite {
            staging.persist(output)
        } else {
            staging.persist_noclobber(output)
        };

        promoted.map_err(|PathPersistError { error, .. }| {
            HandlerError::output(
                format!("Failed to move cleaned file into {}: {error}", output.display()),
                Some(error),
            )
        })?;

        debug!(output = %output.display(), bytes_written, "output promoted");
        Ok(Staged {
            value,
            bytes_written,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ErrorCategory;
    use std::io;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use tempfile::tempdir;

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn promotes_complete_file_and_creates_directories() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let output = dir.path().join("nested/deeper/clean.pdf");

        let staged = AtomicWriter::new(false).with_staging(&output, |staging| {
            assert_eq!(staging.parent(), output.parent());
            assert_eq!(staging.extension(), Some(OsStr::new("pdf")));
            fs::write(staging, b"clean bytes").map_err(|e| HandlerError::io(staging, e))?;
            Ok("done")
        })?;

        assert_eq!(staged.value, "done");
        assert_eq!(staged.bytes_written, 11);
        assert_eq!(fs::read(&output)?, b"clean bytes");
        assert_eq!(entries(dir.path().join("nested/deeper").as_path()), vec!["clean.pdf"]);
        Ok(())
    }

    #[test]
    fn failure_mid_write_leaves_prior_file_and_no_staging() -> Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempdir()?;
        let output = dir.path().join("report.docx");
        fs::write(&output, b"previous complete output")?;

        let result = AtomicWriter::new(true).with_staging(&output, |staging| {
            fs::write(staging, b"trunc").map_err(|e| HandlerError::io(staging, e))?;
            Err::<(), _>(HandlerError::io(
                staging,
                io::Error::new(io::ErrorKind::StorageFull, "disk full"),
            ))
        });

        let error = result.err().ok_or("the write should have failed")?;
        assert_eq!(error.category(), ErrorCategory::OutputError);
        assert_eq!(fs::read(&output)?, b"previous complete output");
        assert_eq!(entries(dir.path()), vec!["report.docx"]);
        Ok(())
    }

    #[test]
    fn failure_without_prior_file_leaves_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let output = dir.path().join("clip.mp4");

        let result = AtomicWriter::new(false).with_staging(&output, |staging| {
            fs::write(staging, b"half").map_err(|e| HandlerError::io(staging, e))?;
            Err::<(), _>(HandlerError::Processing("encoder crashed".to_string()))
        });

        assert!(result.is_err());
        assert!(!output.exists());
        assert!(entries(dir.path()).is_empty());
        Ok(())
    }

    #[test]
    fn panic_inside_writer_still_removes_staging() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let output = dir.path().join("photo.png");

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            AtomicWriter::new(false).with_staging(&output, |staging| -> Result<(), HandlerError> {
                let _ = fs::write(staging, b"partial");
                panic!("handler bug");
            })
        }));

        assert!(outcome.is_err());
        assert!(entries(dir.path()).is_empty());
        Ok(())
    }

    #[test]
    fn no_clobber_refuses_to_replace_existing_output() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let output = dir.path().join("photo.png");
        fs::write(&output, b"someone else")?;

        let result = AtomicWriter::new(false).with_staging(&output, |staging| {
            fs::write(staging, b"ours").map_err(|e| HandlerError::io(staging, e))
        });

        let error = result.err().ok_or("promotion should be refused")?;
        assert_eq!(error.category(), ErrorCategory::OutputError);
        assert_eq!(fs::read(&output)?, b"someone else");
        assert_eq!(entries(dir.path()), vec!["photo.png"]);
        Ok(())
    }

    #[test]
    fn uncreatable_parent_is_an_output_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"file")?;

        let result = AtomicWriter::new(false)
            .with_staging(&blocker.join("clean.jpg"), |_| Ok::<(), HandlerError>(()));

        let error = result.err().ok_or("directory creation should fail")?;
        assert_eq!(error.category(), ErrorCategory::OutputError);
        Ok(())
    }
}
