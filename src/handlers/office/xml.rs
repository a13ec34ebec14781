use xmltree::{Element, XMLNode};

use super::constants::{
    APP_NEUTRAL_VALUES, APP_NS, CORE_NEUTRAL_VALUES, CP_NS, DC_NS, DCTERMS_NS,
};

/// Describe cómo localizar un nodo en el XML de propiedades.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FieldSpec {
    pub(crate) local_name: &'static str,
    pub(crate) namespace: &'static str,
}

/// Campo de `core.xml` para una etiqueta `prefijo:nombre` conocida.
pub(crate) fn core_field_spec(tag: &str) -> Option<FieldSpec> {
    let known = CORE_NEUTRAL_VALUES
        .iter()
        .map(|(name, _)| *name)
        .find(|name| *name == tag)?;
    let (prefix, local_name) = known.split_once(':')?;

    let namespace = match prefix {
        "dc" => DC_NS,
        "cp" => CP_NS,
        "dcterms" => DCTERMS_NS,
        _ => return None,
    };

    Some(FieldSpec {
        local_name,
        namespace,
    })
}

/// Campo de `app.xml`; estos elementos no llevan prefijo.
pub(crate) fn app_field_spec(tag: &str) -> Option<FieldSpec> {
    APP_NEUTRAL_VALUES
        .iter()
        .map(|(name, _)| *name)
        .find(|name| *name == tag)
        .map(|local_name| FieldSpec {
            local_name,
            namespace: APP_NS,
        })
}

/// Sustituye el texto de todos los hijos que coinciden con `spec`.
///
/// Los campos ausentes no se crean: un documento sin la propiedad ya está limpio.
pub(crate) fn neutralize_children(root: &mut Element, spec: FieldSpec, value: &str) -> bool {
    let mut modified = false;
    for node in root.children.iter_mut() {
        if let XMLNode::Element(child) = node
            && element_matches(child, &spec)
        {
            modified |= set_element_text(child, value);
        }
    }
    modified
}

pub(crate) fn element_matches(element: &Element, spec: &FieldSpec) -> bool {
    element.name == spec.local_name && element.namespace.as_deref() == Some(spec.namespace)
}

fn set_element_text(element: &mut Element, value: &str) -> bool {
    if element_text_content(element) == value && !has_nested_elements(element) {
        return false;
    }

    element.children.clear();
    if !value.is_empty() {
        element.children.push(XMLNode::Text(value.to_string()));
    }
    true
}

fn has_nested_elements(element: &Element) -> bool {
    element
        .children
        .iter()
        .any(|node| matches!(node, XMLNode::Element(_)))
}

/// Texto plano de un elemento, sin espacios en los extremos.
pub(crate) fn element_text_content(element: &Element) -> String {
    let mut content = String::new();
    for node in &element.children {
        if let XMLNode::Text(text) | XMLNode::CData(text) = node {
            content.push_str(text);
        }
    }
    content.trim().to_string()
}

/// Todos los elementos que coinciden con `spec` contienen exactamente `expected`.
pub(crate) fn children_hold_value(root: &Element, spec: FieldSpec, expected: &str) -> bool {
    root.children.iter().all(|node| match node {
        XMLNode::Element(child) if element_matches(child, &spec) => {
            element_text_content(child) == expected && !has_nested_elements(child)
        }
        _ => true,
    })
}
