//! Handler descriptors and the boxed handler type.
//!
//! Rust has no runtime view of a function's parameter names, so callers
//! declare them: either with [`HandlerDescriptor::new`] or by letting the
//! [`auto_callback!`](crate::auto_callback) macro read them off the `fn` item.

use serde_json::Value;
use std::sync::Arc;

use crate::resolver::{self, ResolveError, ResolvedBindings};

/// A registered handler: receives input values in declaration order and
/// returns the new value of the output property.
pub type CallbackFn = Arc<dyn Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// A handler's name and ordered parameter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    pub name: String,
    pub params: Vec<String>,
}

impl HandlerDescriptor {
    pub fn new<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// Append a parameter.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(name.into());
        self
    }

    pub fn resolve(&self) -> Result<ResolvedBindings, ResolveError> {
        resolver::resolve(&self.name, &self.params)
    }
}

/// Wrap a closure as a [`CallbackFn`].
pub fn callback_fn<F>(f: F) -> CallbackFn
where
    F: Fn(&[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Register a handler whose bindings come from its own name and parameters.
///
/// Every parameter arrives as a `serde_json::Value` (`Null` if the browser sent
/// nothing), so formatting one directly prints JSON: a string keeps its
/// quotes. Use `.as_str()` and friends to get at the plain value. The body may
/// evaluate to anything `Serialize`.
///
/// ```ignore
/// auto_callback!(app, fn update_children_of_output_1(value_of_input_1) {
///     value_of_input_1
/// })?;
///
/// auto_callback!(app, fn update_caption(value_of_size) {
///     format!("New Size: {}", value_of_size.as_str().unwrap_or_default())
/// })?;
///
/// // print the resolved bindings before registering
/// auto_callback!(app, debug, fn update_output_2(input_1) { input_1 })?;
/// ```
#[macro_export]
macro_rules! auto_callback {
    (@register $app:expr, $debug:expr, $name:ident, ($($param:ident),*), $body:block) => {{
        let params: ::std::vec::Vec<&str> = ::std::vec![$(stringify!($param)),*];
        let descriptor = $crate::HandlerDescriptor::new(stringify!($name), params);
        $app.auto_callback_with(
            descriptor,
            $debug,
            move |args: &[$crate::serde_json::Value]| -> $crate::anyhow::Result<$crate::serde_json::Value> {
                #[allow(unused_mut, unused_variables)]
                let mut args = args.iter().cloned();
                $(
                    let $param = args.next().unwrap_or($crate::serde_json::Value::Null);
                )*
                let result = $body;
                Ok($crate::serde_json::to_value(result)?)
            },
        )
    }};
    ($app:expr, debug, fn $name:ident($($param:ident),* $(,)?) $body:block) => {
        $crate::auto_callback!(@register $app, true, $name, ($($param),*), $body)
    };
    ($app:expr, fn $name:ident($($param:ident),* $(,)?) $body:block) => {
        $crate::auto_callback!(@register $app, false, $name, ($($param),*), $body)
    };
}
