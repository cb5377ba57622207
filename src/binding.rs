//! Component/property bindings used to wire callbacks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A (component, property) pair, e.g. `output_5.children`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    #[serde(rename = "id")]
    pub component_id: String,
    pub property: String,
}

impl Binding {
    pub fn new(component_id: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            property: property.into(),
        }
    }

    /// `component.property`, the key the browser and the registry agree on.
    pub fn key(&self) -> String {
        format!("{}.{}", self.component_id, self.property)
    }

    /// Parse a `component.property` key. The property is everything after the
    /// last dot so component ids may themselves contain dots.
    pub fn parse_key(key: &str) -> Option<Self> {
        let (component_id, property) = key.rsplit_once('.')?;
        if component_id.is_empty() || property.is_empty() {
            return None;
        }
        Some(Self::new(component_id, property))
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component_id, self.property)
    }
}

/// The property a callback writes. Exactly one per callback.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Output(pub Binding);

/// A property a callback reads. Order matches the handler's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Input(pub Binding);

impl Output {
    pub fn new(component_id: impl Into<String>, property: impl Into<String>) -> Self {
        Self(Binding::new(component_id, property))
    }
}

impl Input {
    pub fn new(component_id: impl Into<String>, property: impl Into<String>) -> Self {
        Self(Binding::new(component_id, property))
    }
}

impl Deref for Output {
    type Target = Binding;

    fn deref(&self) -> &Binding {
        &self.0
    }
}

impl Deref for Input {
    type Target = Binding;

    fn deref(&self) -> &Binding {
        &self.0
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Output `{}`>", self.0)
    }
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Input `{}`>", self.0)
    }
}

/// Format a list of inputs the way the debug print shows them: `[<Input `a.b`>, ...]`.
pub fn format_inputs(inputs: &[Input]) -> String {
    let items: Vec<String> = inputs.iter().map(|i| i.to_string()).collect();
    format!("[{}]", items.join(", "))
}
