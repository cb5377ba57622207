//! Reactive dashboards whose callback wiring is read from handler names.
//!
//! ```ignore
//! let mut app = EasyDash::new("demo");
//! app.set_layout(html::div(vec![
//!     widgets::input("input_1", "hello").into(),
//!     html::div(Value::Null).id("output_1").into(),
//! ]));
//! auto_callback!(app, fn update_children_of_output_1(value_of_input_1) {
//!     value_of_input_1
//! })?;
//! app.run().await?;
//! ```

pub mod app;
pub mod binding;
pub mod components;
pub mod config;
pub mod dashboard;
pub mod handler;
pub mod logger;
pub mod preview;
pub mod registry;
pub mod resolver;
pub mod viz;

// Re-exports for library consumers and for `auto_callback!` expansions
pub use anyhow;
pub use serde_json;

pub use app::EasyDash;
pub use binding::{Binding, Input, Output};
pub use components::{html, widgets, Component};
pub use config::AppConfig;
pub use handler::{callback_fn, CallbackFn, HandlerDescriptor};
pub use preview::{PreviewFrame, PreviewOptions};
pub use registry::{CallbackRegistry, RegistryError};
pub use resolver::{resolve, ResolveError, ResolvedBindings};
pub use viz::{ImageArray, ImageOptions, ImageSource};
