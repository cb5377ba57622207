//! The `EasyDash` application: layout, callbacks and the server entry points.

use anyhow::{Context, Result};
use colored::*;
use serde_json::Value;
use std::sync::Arc;

use crate::binding::{format_inputs, Input, Output};
use crate::components::Component;
use crate::config::AppConfig;
use crate::dashboard::{self, DashboardState};
use crate::handler::{callback_fn, CallbackFn, HandlerDescriptor};
use crate::logger::Logger;
use crate::preview::{self, PreviewFrame, PreviewOptions};
use crate::registry::CallbackRegistry;
use crate::resolver::ResolvedBindings;
use crate::viz::{self, ImageOptions, ImageSource};

pub struct EasyDash {
    name: String,
    config: AppConfig,
    layout: Option<Component>,
    registry: CallbackRegistry,
    logger: Option<Logger>,
}

impl EasyDash {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, AppConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: AppConfig) -> Self {
        Self {
            name: name.into(),
            config,
            layout: None,
            registry: CallbackRegistry::new(),
            logger: None,
        }
    }

    /// Record registrations and invocations under `config.log_dir`.
    pub fn with_session_log(mut self) -> Result<Self> {
        let logger = Logger::new(&self.config.log_dir)
            .with_context(|| format!("Failed to open session log for '{}'", self.name))?;
        self.logger = Some(logger);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    pub fn layout(&self) -> Option<&Component> {
        self.layout.as_ref()
    }

    pub fn set_layout(&mut self, layout: Component) {
        self.layout = Some(layout);
    }

    pub fn registry(&self) -> &CallbackRegistry {
        &self.registry
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    /// Register a callback with explicit bindings.
    pub fn callback(&mut self, output: Output, inputs: Vec<Input>, handler: CallbackFn) -> Result<()> {
        self.registry.register(output.clone(), inputs.clone(), handler)?;
        if let Some(logger) = &self.logger {
            let _ = logger.log_registration("<explicit>", &output, &inputs);
        }
        Ok(())
    }

    /// Register a handler whose bindings are read from its name and parameter
    /// names. Prints the bindings first when `debug` is set in the config.
    pub fn auto_callback<F>(&mut self, descriptor: HandlerDescriptor, handler: F) -> Result<ResolvedBindings>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        let debug = self.config.debug;
        self.auto_callback_with(descriptor, debug, handler)
    }

    pub fn auto_callback_with<F>(
        &mut self,
        descriptor: HandlerDescriptor,
        debug: bool,
        handler: F,
    ) -> Result<ResolvedBindings>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register_resolved(&descriptor, debug, callback_fn(handler))
    }

    /// Like [`auto_callback`](Self::auto_callback), but the handler returns an
    /// image which is sent to the browser as an `Img` component.
    pub fn image_callback<F>(&mut self, descriptor: HandlerDescriptor, handler: F) -> Result<ResolvedBindings>
    where
        F: Fn(&[Value]) -> Result<ImageSource> + Send + Sync + 'static,
    {
        let options = self.config.image.clone();
        self.image_callback_with(descriptor, options, handler)
    }

    pub fn image_callback_with<F>(
        &mut self,
        descriptor: HandlerDescriptor,
        options: ImageOptions,
        handler: F,
    ) -> Result<ResolvedBindings>
    where
        F: Fn(&[Value]) -> Result<ImageSource> + Send + Sync + 'static,
    {
        let debug = self.config.debug;
        self.register_resolved(&descriptor, debug, viz::image_handler(options, handler))
    }

    fn register_resolved(
        &mut self,
        descriptor: &HandlerDescriptor,
        debug: bool,
        handler: CallbackFn,
    ) -> Result<ResolvedBindings> {
        let resolved = descriptor.resolve()?;
        if debug {
            eprintln!("{} {}", "Output:".bright_cyan(), resolved.output);
            eprintln!("{} {}", "Inputs:".bright_cyan(), format_inputs(&resolved.inputs));
        }
        self.registry
            .register(resolved.output.clone(), resolved.inputs.clone(), handler)?;
        if let Some(logger) = &self.logger {
            let _ = logger.log_registration(&descriptor.name, &resolved.output, &resolved.inputs);
        }
        Ok(resolved)
    }

    /// Component ids used by callbacks that do not appear in the layout.
    pub fn missing_layout_ids(&self) -> Vec<String> {
        let known = self.layout.as_ref().map(Component::ids).unwrap_or_default();
        self.registry
            .component_ids()
            .into_iter()
            .filter(|id| !known.contains(*id))
            .map(str::to_string)
            .collect()
    }

    /// Work out where a notebook should point its iframe and adjust the
    /// config to match: the hub proxy prefix, and local-only assets when offline.
    pub fn preview(&mut self, options: &PreviewOptions) -> PreviewFrame {
        self.preview_with_hub(options, preview::hub_prefix_from_env().as_deref())
    }

    /// [`preview`](Self::preview) with the JupyterHub service prefix given
    /// explicitly instead of read from the environment.
    pub fn preview_with_hub(&mut self, options: &PreviewOptions, hub_prefix: Option<&str>) -> PreviewFrame {
        let frame = preview::preview_frame(options, hub_prefix);
        if let Some(prefix) = &frame.pathname_prefix {
            self.config.requests_pathname_prefix = prefix.clone();
        }
        if options.offline {
            self.config.serve_locally = true;
        }
        frame
    }

    /// Print the notebook preview snippet, then serve on all interfaces.
    pub async fn show_app(mut self, options: PreviewOptions) -> Result<()> {
        let frame = self.preview(&options);
        println!("{}", frame.html);
        self.run_server("0.0.0.0", options.port).await
    }

    /// Serve on the configured host and port.
    pub async fn run(self) -> Result<()> {
        let host = self.config.host.clone();
        let port = self.config.port;
        self.run_server(&host, port).await
    }

    pub async fn run_server(self, host: &str, port: u16) -> Result<()> {
        if self.layout.is_none() {
            anyhow::bail!("'{}' has no layout; call set_layout before serving", self.name);
        }
        for id in self.missing_layout_ids() {
            eprintln!(
                "{} callback references '{}', which is not in the layout",
                "Warning:".yellow(),
                id
            );
        }

        let addr = format!("{}:{}", host, port);
        println!(
            "{} {} ({} callbacks) on http://{}",
            "Serving".bright_green().bold(),
            self.name,
            self.registry.len(),
            addr
        );

        let state = Arc::new(DashboardState::new(self));
        dashboard::start_dashboard(state, &addr).await
    }
}
