//! Embedding a running app in a notebook cell.

/// Set by JupyterHub (and Binder) inside single-user servers.
pub const HUB_PREFIX_VAR: &str = "JUPYTERHUB_SERVICE_PREFIX";
pub const BINDER_HOST: &str = "https://hub.mybinder.org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewOptions {
    pub port: u16,
    /// Any CSS length accepted by the iframe `width` attribute.
    pub width: String,
    pub height: u32,
    /// Serve without external stylesheets.
    pub offline: bool,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            port: 9999,
            width: "100%".to_string(),
            height: 700,
            offline: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewFrame {
    pub url: String,
    /// Browser-side path prefix when running behind the hub proxy.
    pub pathname_prefix: Option<String>,
    /// Link plus iframe, ready for a notebook's HTML display.
    pub html: String,
}

pub fn hub_prefix_from_env() -> Option<String> {
    std::env::var(HUB_PREFIX_VAR).ok()
}

pub fn preview_frame(options: &PreviewOptions, hub_prefix: Option<&str>) -> PreviewFrame {
    let (url, pathname_prefix) = match hub_prefix {
        Some(hub) => {
            let base = format!("{}proxy/{}/", hub, options.port);
            (format!("{}{}", BINDER_HOST, base), Some(base))
        }
        None => (format!("http://localhost:{}", options.port), None),
    };
    let html = format!(
        r#"<a href="{url}" target="_new">Open in new window</a><hr><iframe src="{url}" width={width} height={height}></iframe>"#,
        url = url,
        width = options.width,
        height = options.height,
    );
    PreviewFrame {
        url,
        pathname_prefix,
        html,
    }
}
