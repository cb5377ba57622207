//! A minimal serializable component tree.
//!
//! Components serialize as `{"namespace", "type", "props"}`, which is what the
//! browser renderer in `templates/index.html` walks. `props.children` may hold
//! a string, a number, null, a component, or a list of those.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub namespace: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub props: Map<String, Value>,
}

impl Component {
    pub fn new(namespace: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            kind: kind.into(),
            props: Map::new(),
        }
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.prop("id", Value::String(id.into()))
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn children(self, children: impl Into<Value>) -> Self {
        self.prop("children", children)
    }

    pub fn get_id(&self) -> Option<&str> {
        self.props.get("id").and_then(Value::as_str)
    }

    /// All ids in this subtree, including ids nested inside `children` values.
    pub fn ids(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        collect_ids(&Value::from(self.clone()), &mut ids);
        ids
    }
}

impl From<Component> for Value {
    fn from(c: Component) -> Self {
        let mut obj = Map::new();
        obj.insert("namespace".to_string(), Value::String(c.namespace));
        obj.insert("type".to_string(), Value::String(c.kind));
        obj.insert("props".to_string(), Value::Object(c.props));
        Value::Object(obj)
    }
}

fn collect_ids(value: &Value, ids: &mut BTreeSet<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_ids(v, ids)),
        Value::Object(obj) => {
            if let Some(Value::Object(props)) = obj.get("props") {
                if let Some(Value::String(id)) = props.get("id") {
                    ids.insert(id.clone());
                }
                if let Some(children) = props.get("children") {
                    collect_ids(children, ids);
                }
            }
        }
        _ => {}
    }
}

/// Plain HTML elements.
pub mod html {
    use super::Component;
    use serde_json::Value;

    pub const NAMESPACE: &str = "html";

    pub fn div(children: impl Into<Value>) -> Component {
        Component::new(NAMESPACE, "Div").children(children)
    }

    pub fn img(src: impl Into<String>) -> Component {
        Component::new(NAMESPACE, "Img").prop("src", Value::String(src.into()))
    }

    pub fn h1(text: impl Into<String>) -> Component {
        Component::new(NAMESPACE, "H1").children(Value::String(text.into()))
    }
}

/// Interactive widgets.
pub mod widgets {
    use super::Component;
    use serde_json::Value;

    pub const NAMESPACE: &str = "widgets";

    pub fn input(id: impl Into<String>, value: impl Into<Value>) -> Component {
        Component::new(NAMESPACE, "Input").id(id).prop("value", value)
    }

    /// Container for image output; the browser renders its `children` like a `Div`.
    pub fn graph(id: impl Into<String>) -> Component {
        Component::new(NAMESPACE, "Graph").id(id)
    }
}
