use std::io::Cursor;

use xmltree::{Element, EmitterConfig};

use super::constants::{APP_NEUTRAL_VALUES, CORE_NEUTRAL_VALUES, CUSTOM_PROPERTIES_EMPTY};
use super::verify::is_custom_metadata_clean;
use super::xml::{FieldSpec, app_field_spec, core_field_spec, neutralize_children};
use crate::error::HandlerError;

pub(crate) fn sanitize_core_properties(
    contents: Vec<u8>,
) -> Result<(Vec<u8>, bool), HandlerError> {
    neutralize_xml(contents, &CORE_NEUTRAL_VALUES, core_field_spec)
}

pub(crate) fn sanitize_app_properties(contents: Vec<u8>) -> Result<(Vec<u8>, bool), HandlerError> {
    neutralize_xml(contents, &APP_NEUTRAL_VALUES, app_field_spec)
}

/// Las propiedades personalizadas se sustituyen por un documento vacío.
pub(crate) fn sanitize_custom_properties(
    contents: Vec<u8>,
) -> Result<(Vec<u8>, bool), HandlerError> {
    if is_custom_metadata_clean(&contents)? {
        return Ok((contents, false));
    }
    Ok((CUSTOM_PROPERTIES_EMPTY.as_bytes().to_vec(), true))
}

fn neutralize_xml(
    contents: Vec<u8>,
    neutral_values: &[(&str, &str)],
    lookup: fn(&str) -> Option<FieldSpec>,
) -> Result<(Vec<u8>, bool), HandlerError> {
    let mut root = parse_properties(&contents)?;

    let mut modified = false;
    for &(tag, value) in neutral_values {
        if let Some(spec) = lookup(tag) {
            modified |= neutralize_children(&mut root, spec, value);
        }
    }

    if !modified {
        return Ok((contents, false));
    }

    let mut config = EmitterConfig::new();
    config.perform_indent = false;
    config.write_document_declaration = true;

    let mut output = Vec::new();
    root.write_with_config(&mut output, config).map_err(|error| {
        HandlerError::Processing(format!("failed to write document properties: {error}"))
    })?;

    Ok((output, true))
}

pub(crate) fn parse_properties(contents: &[u8]) -> Result<Element, HandlerError> {
    Element::parse(Cursor::new(contents)).map_err(|error| {
        HandlerError::invalid_input(
            format!("Document properties are not valid XML: {error}"),
            "Verify file is a valid DOCX/XLSX/PPTX or try opening it in Office first",
        )
    })
}
