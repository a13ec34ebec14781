use std::fs::File;
use std::io::Read;
use std::path::Path;

use xmltree::XMLNode;
use zip::ZipArchive;
use zip::result::ZipError;

use super::archive::read_error;
use super::constants::{APP_NEUTRAL_VALUES, APP_PART, CORE_NEUTRAL_VALUES, CORE_PART, CUSTOM_PART};
use super::sanitize::parse_properties;
use super::xml::{FieldSpec, app_field_spec, children_hold_value, core_field_spec, element_text_content};
use crate::error::HandlerError;

/// Comprueba que un paquete ya reescrito no conserva propiedades identificativas.
pub(crate) fn verify_office_metadata_clean(path: &Path) -> Result<bool, HandlerError> {
    let file = File::open(path).map_err(|error| HandlerError::io(path, error))?;
    let mut archive = ZipArchive::new(file).map_err(|error| read_error(path, error))?;

    let core_clean = match read_part(&mut archive, path, CORE_PART)? {
        Some(contents) => holds_neutral_values(&contents, &CORE_NEUTRAL_VALUES, core_field_spec)?,
        None => true,
    };
    let app_clean = match read_part(&mut archive, path, APP_PART)? {
        Some(contents) => holds_neutral_values(&contents, &APP_NEUTRAL_VALUES, app_field_spec)?,
        None => true,
    };
    let custom_clean = match read_part(&mut archive, path, CUSTOM_PART)? {
        Some(contents) => is_custom_metadata_clean(&contents)?,
        None => true,
    };

    Ok(core_clean && app_clean && custom_clean)
}

fn read_part(
    archive: &mut ZipArchive<File>,
    path: &Path,
    name: &str,
) -> Result<Option<Vec<u8>>, HandlerError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(error) => return Err(read_error(path, error)),
    };

    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|error| HandlerError::io(path, error))?;
    Ok(Some(contents))
}

fn holds_neutral_values(
    contents: &[u8],
    neutral_values: &[(&str, &str)],
    lookup: fn(&str) -> Option<FieldSpec>,
) -> Result<bool, HandlerError> {
    let root = parse_properties(contents)?;

    Ok(neutral_values.iter().all(|&(tag, expected)| {
        lookup(tag).is_none_or(|spec| children_hold_value(&root, spec, expected))
    }))
}

/// `custom.xml` está limpio si su raíz no contiene propiedades ni texto.
pub(crate) fn is_custom_metadata_clean(contents: &[u8]) -> Result<bool, HandlerError> {
    let root = parse_properties(contents)?;

    let has_properties = root
        .children
        .iter()
        .any(|node| matches!(node, XMLNode::Element(_)));

    Ok(!has_properties && element_text_content(&root).is_empty())
}
