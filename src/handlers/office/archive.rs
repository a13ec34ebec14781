use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::HandlerError;

/// Copia el paquete `input` en `output` aplicando `transform` a cada entrada.
///
/// Conserva orden, compresión, permisos y fechas de cada entrada. Devuelve los
/// nombres de las partes que la transformación modificó.
pub(crate) fn rewrite_package<F>(
    input: &Path,
    output: &Path,
    mut transform: F,
) -> Result<Vec<String>, HandlerError>
where
    F: FnMut(&str, Vec<u8>) -> Result<(Vec<u8>, bool), HandlerError>,
{
    let source = File::open(input).map_err(|error| HandlerError::io(input, error))?;
    let mut archive = ZipArchive::new(source).map_err(|error| read_error(input, error))?;

    let target = File::create(output).map_err(|error| HandlerError::io(output, error))?;
    let mut writer = ZipWriter::new(target);
    let mut changed_parts = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|error| read_error(input, error))?;
        let name = entry.name().to_string();

        let mut options = SimpleFileOptions::default().compression_method(entry.compression());
        if let Some(mode) = entry.unix_mode() {
            options = options.unix_permissions(mode);
        }
        if let Some(time) = entry.last_modified() {
            options = options.last_modified_time(time);
        }

        if entry.is_dir() {
            writer
                .add_directory(name, options)
                .map_err(|error| write_error(output, error))?;
            continue;
        }

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|error| HandlerError::io(input, error))?;

        let (contents, changed) = transform(&name, contents)?;
        if changed {
            changed_parts.push(name.clone());
        }

        writer
            .start_file(name, options)
            .map_err(|error| write_error(output, error))?;
        writer
            .write_all(&contents)
            .map_err(|error| HandlerError::io(output, error))?;
    }

    writer.finish().map_err(|error| write_error(output, error))?;

    Ok(changed_parts)
}

pub(crate) fn not_an_office_document() -> HandlerError {
    HandlerError::invalid_input(
        "Not a valid Office document (corrupted or invalid ZIP)",
        "Verify file is a valid DOCX/XLSX/PPTX or try opening it in Office first",
    )
}

pub(crate) fn read_error(path: &Path, error: ZipError) -> HandlerError {
    match error {
        ZipError::Io(error) => HandlerError::io(path, error),
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => not_an_office_document(),
        other => HandlerError::Processing(format!("failed to read Office package: {other}")),
    }
}

fn write_error(path: &Path, error: ZipError) -> HandlerError {
    match error {
        ZipError::Io(error) => HandlerError::io(path, error),
        other => HandlerError::Processing(format!("failed to write Office package: {other}")),
    }
}
