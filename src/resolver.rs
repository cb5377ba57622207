//! Name-to-binding resolution.
//!
//! A handler called `update_children_of_output_1` with a parameter
//! `value_of_input_1` writes `output_1.children` and reads `input_1.value`.
//! The name reads `property_of_component`, reversed from the key order, and
//! either half can be shortened to just the component: outputs then default
//! to `children`, inputs to `value`.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::binding::{Binding, Input, Output};

/// Prefixes a handler name must contain, tried in this order.
pub const VALID_PREFIXES: [&str; 2] = ["update_", "callback_"];

/// Splits `property_of_component`. Only the last occurrence counts.
pub const SEPARATOR: &str = "_of_";

pub const DEFAULT_OUTPUT_PROPERTY: &str = "children";
pub const DEFAULT_INPUT_PROPERTY: &str = "value";

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("auto_callback requires '{name}' to contain one of {prefixes:?}")]
    NamingConvention {
        name: String,
        prefixes: [&'static str; 2],
    },

    #[error("'{name}' is not a valid identifier")]
    InvalidIdentifier { name: String },

    #[error("'{name}' resolves to an empty {part}")]
    EmptyBinding { name: String, part: &'static str },
}

/// One output and the ordered inputs for a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBindings {
    pub output: Output,
    pub inputs: Vec<Input>,
}

/// Resolve a handler's bindings from its name and parameter names.
///
/// Fails before producing anything if the name lacks a recognized prefix or
/// any name is malformed, so callers never register a partial binding set.
pub fn resolve<S: AsRef<str>>(
    handler_name: &str,
    parameter_names: &[S],
) -> Result<ResolvedBindings, ResolveError> {
    let output = resolve_output(handler_name)?;
    let inputs = parameter_names
        .iter()
        .map(|p| resolve_input(p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ResolvedBindings { output, inputs })
}

pub fn resolve_output(handler_name: &str) -> Result<Output, ResolveError> {
    let start = descriptor_start(handler_name).ok_or_else(|| ResolveError::NamingConvention {
        name: handler_name.to_string(),
        prefixes: VALID_PREFIXES,
    })?;
    check_identifier(handler_name)?;
    let descriptor = &handler_name[start..];
    let binding = split_binding(handler_name, descriptor, DEFAULT_OUTPUT_PROPERTY)?;
    Ok(Output(binding))
}

pub fn resolve_input(parameter_name: &str) -> Result<Input, ResolveError> {
    check_identifier(parameter_name)?;
    let binding = split_binding(parameter_name, parameter_name, DEFAULT_INPUT_PROPERTY)?;
    Ok(Input(binding))
}

/// Byte offset just past the first recognized prefix.
fn descriptor_start(name: &str) -> Option<usize> {
    VALID_PREFIXES
        .iter()
        .find_map(|prefix| name.find(prefix).map(|idx| idx + prefix.len()))
}

fn split_binding(
    full_name: &str,
    descriptor: &str,
    default_property: &str,
) -> Result<Binding, ResolveError> {
    let binding = match descriptor.rfind(SEPARATOR) {
        // A leading separator (position 0) would leave no property: treat the
        // whole thing as a component id.
        Some(pos) if pos >= 1 => Binding::new(
            &descriptor[pos + SEPARATOR.len()..],
            &descriptor[..pos],
        ),
        _ => Binding::new(descriptor, default_property),
    };

    if binding.component_id.is_empty() {
        return Err(ResolveError::EmptyBinding {
            name: full_name.to_string(),
            part: "component id",
        });
    }
    if binding.property.is_empty() {
        return Err(ResolveError::EmptyBinding {
            name: full_name.to_string(),
            part: "property",
        });
    }
    Ok(binding)
}

fn check_identifier(name: &str) -> Result<(), ResolveError> {
    if IDENTIFIER_RE.is_match(name) {
        Ok(())
    } else {
        Err(ResolveError::InvalidIdentifier {
            name: name.to_string(),
        })
    }
}
