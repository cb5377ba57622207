//! Callback registry owned by an [`EasyDash`](crate::EasyDash) app.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

use crate::binding::{Input, Output};
use crate::handler::CallbackFn;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("output {0} already has a callback")]
    DuplicateOutput(String),

    #[error("no callback registered for output {0}")]
    UnknownOutput(String),

    #[error("callback for {output} expects {expected} inputs, got {got}")]
    ArityMismatch {
        output: String,
        expected: usize,
        got: usize,
    },

    #[error("callback for {output} would form a circular dependency through {via}")]
    CircularDependency { output: String, via: String },

    #[error("callback for {output} failed: {cause:#}")]
    Handler { output: String, cause: anyhow::Error },
}

/// One registered callback.
#[derive(Clone)]
pub struct Callback {
    pub output: Output,
    pub inputs: Vec<Input>,
    handler: CallbackFn,
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback")
            .field("output", &self.output)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

impl Callback {
    pub fn handler(&self) -> CallbackFn {
        self.handler.clone()
    }
}

/// Serialized form served at `/_dash-dependencies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySpec {
    pub output: String,
    pub inputs: Vec<Input>,
}

#[derive(Default)]
pub struct CallbackRegistry {
    callbacks: Vec<Callback>,
    by_output: HashMap<String, usize>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Add a callback. An output can only be written by one callback, and
    /// the callback graph must stay acyclic; a rejected registration leaves
    /// the registry untouched.
    pub fn register(
        &mut self,
        output: Output,
        inputs: Vec<Input>,
        handler: CallbackFn,
    ) -> Result<(), RegistryError> {
        let key = output.key();
        if self.by_output.contains_key(&key) {
            return Err(RegistryError::DuplicateOutput(key));
        }
        if let Some(via) = self.cycle_through(&output, &inputs) {
            return Err(RegistryError::CircularDependency { output: key, via });
        }
        self.by_output.insert(key, self.callbacks.len());
        self.callbacks.push(Callback {
            output,
            inputs,
            handler,
        });
        Ok(())
    }

    pub fn get(&self, output_key: &str) -> Option<&Callback> {
        self.by_output.get(output_key).map(|&i| &self.callbacks[i])
    }

    pub fn callbacks(&self) -> &[Callback] {
        &self.callbacks
    }

    /// Run the callback for `output_key` with input values in declaration order.
    pub fn dispatch(&self, output_key: &str, args: &[Value]) -> Result<Value, RegistryError> {
        let callback = self
            .get(output_key)
            .ok_or_else(|| RegistryError::UnknownOutput(output_key.to_string()))?;
        if args.len() != callback.inputs.len() {
            return Err(RegistryError::ArityMismatch {
                output: output_key.to_string(),
                expected: callback.inputs.len(),
                got: args.len(),
            });
        }
        (callback.handler)(args).map_err(|cause| RegistryError::Handler {
            output: output_key.to_string(),
            cause,
        })
    }

    pub fn dependencies(&self) -> Vec<DependencySpec> {
        self.callbacks
            .iter()
            .map(|c| DependencySpec {
                output: c.output.key(),
                inputs: c.inputs.clone(),
            })
            .collect()
    }

    /// Outputs that must be recomputed when `input` changes.
    pub fn dependents_of(&self, input: &Input) -> Vec<&Output> {
        self.callbacks
            .iter()
            .filter(|c| c.inputs.contains(input))
            .map(|c| &c.output)
            .collect()
    }

    /// First of `inputs` reachable from `output` by following existing
    /// callbacks downstream, including `output` itself.
    fn cycle_through(&self, output: &Output, inputs: &[Input]) -> Option<String> {
        let targets: HashSet<String> = inputs.iter().map(|i| i.key()).collect();
        let mut seen = HashSet::new();
        let mut stack = vec![output.clone()];
        while let Some(current) = stack.pop() {
            let key = current.key();
            if targets.contains(&key) {
                return Some(key);
            }
            if !seen.insert(key) {
                continue;
            }
            let as_input = Input(current.0.clone());
            stack.extend(self.dependents_of(&as_input).into_iter().cloned());
        }
        None
    }

    /// Every component id any callback reads or writes.
    pub fn component_ids(&self) -> BTreeSet<&str> {
        let mut ids = BTreeSet::new();
        for c in &self.callbacks {
            ids.insert(c.output.component_id.as_str());
            for i in &c.inputs {
                ids.insert(i.component_id.as_str());
            }
        }
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::callback_fn;
    use serde_json::json;

    fn echo() -> CallbackFn {
        callback_fn(|args| Ok(args.first().cloned().unwrap_or(Value::Null)))
    }

    #[test]
    fn test_register_and_dispatch() {
        let mut reg = CallbackRegistry::new();
        reg.register(
            Output::new("output1", "children"),
            vec![Input::new("input", "value")],
            echo(),
        )
        .unwrap();

        let out = reg.dispatch("output1.children", &[json!("hello")]).unwrap();
        assert_eq!(out, json!("hello"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_duplicate_output_rejected_and_first_kept() {
        let mut reg = CallbackRegistry::new();
        reg.register(Output::new("o", "children"), vec![Input::new("a", "value")], echo())
            .unwrap();
        let err = reg
            .register(
                Output::new("o", "children"),
                vec![],
                callback_fn(|_| Ok(json!("second"))),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateOutput(ref k) if k == "o.children"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.dispatch("o.children", &[json!(1)]).unwrap(), json!(1));
    }

    #[test]
    fn test_same_component_different_property_is_allowed() {
        let mut reg = CallbackRegistry::new();
        reg.register(Output::new("o", "children"), vec![], echo()).unwrap();
        reg.register(Output::new("o", "style"), vec![], echo()).unwrap();
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn test_unknown_output() {
        let reg = CallbackRegistry::new();
        assert!(matches!(
            reg.dispatch("missing.children", &[]),
            Err(RegistryError::UnknownOutput(_))
        ));
    }

    #[test]
    fn test_arity_mismatch() {
        let mut reg = CallbackRegistry::new();
        reg.register(
            Output::new("o", "children"),
            vec![Input::new("a", "value"), Input::new("b", "value")],
            echo(),
        )
        .unwrap();
        let err = reg.dispatch("o.children", &[json!(1)]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::ArityMismatch { expected: 2, got: 1, .. }
        ));
    }

    #[test]
    fn test_handler_error_is_wrapped() {
        let mut reg = CallbackRegistry::new();
        reg.register(
            Output::new("o", "children"),
            vec![],
            callback_fn(|_| Err(anyhow::anyhow!("boom"))),
        )
        .unwrap();
        let err = reg.dispatch("o.children", &[]).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_dependencies_and_dependents() {
        let mut reg = CallbackRegistry::new();
        let input = Input::new("input", "value");
        reg.register(Output::new("output1", "children"), vec![input.clone()], echo())
            .unwrap();
        reg.register(Output::new("output2", "children"), vec![input.clone()], echo())
            .unwrap();
        reg.register(
            Output::new("other", "children"),
            vec![Input::new("slider", "value")],
            echo(),
        )
        .unwrap();

        let deps = reg.dependencies();
        assert_eq!(deps[0].output, "output1.children");
        assert_eq!(deps[2].inputs, vec![Input::new("slider", "value")]);

        let dependents: Vec<String> = reg.dependents_of(&input).iter().map(|o| o.key()).collect();
        assert_eq!(dependents, vec!["output1.children", "output2.children"]);

        let ids: Vec<&str> = reg.component_ids().into_iter().collect();
        assert_eq!(ids, vec!["input", "other", "output1", "output2", "slider"]);
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut reg = CallbackRegistry::new();
        let err = reg
            .register(Output::new("x", "value"), vec![Input::new("x", "value")], echo())
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::CircularDependency { ref output, ref via } if output == "x.value" && via == "x.value"
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_two_callback_cycle_rejected() {
        let mut reg = CallbackRegistry::new();
        reg.register(Output::new("a", "value"), vec![Input::new("b", "value")], echo())
            .unwrap();
        let err = reg
            .register(Output::new("b", "value"), vec![Input::new("a", "value")], echo())
            .unwrap_err();
        assert!(matches!(err, RegistryError::CircularDependency { ref via, .. } if via == "a.value"));
        assert_eq!(reg.len(), 1);
        assert!(reg.get("b.value").is_none());
    }

    #[test]
    fn test_longer_cycle_rejected_but_chain_allowed() {
        let mut reg = CallbackRegistry::new();
        reg.register(Output::new("b", "value"), vec![Input::new("a", "value")], echo())
            .unwrap();
        reg.register(Output::new("c", "value"), vec![Input::new("b", "value")], echo())
            .unwrap();
        // a -> b -> c -> a
        assert!(matches!(
            reg.register(Output::new("a", "value"), vec![Input::new("c", "value")], echo()),
            Err(RegistryError::CircularDependency { .. })
        ));
        // a different property of the same component is a separate node
        reg.register(Output::new("a", "children"), vec![Input::new("c", "value")], echo())
            .unwrap();
        assert_eq!(reg.len(), 3);
    }
}
