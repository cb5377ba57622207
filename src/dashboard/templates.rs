use askama::Template;

use crate::config::AppConfig;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub title: &'a str,
    /// Browser-side prefix for every request the page makes.
    pub prefix: &'a str,
    pub stylesheets: &'a [String],
}

pub fn render_index(config: &AppConfig) -> axum::response::Html<String> {
    let prefix = config.pathname_prefix();
    let stylesheets: &[String] = if config.serve_locally {
        &[]
    } else {
        &config.external_stylesheets
    };
    let template = IndexTemplate {
        title: &config.title,
        prefix: &prefix,
        stylesheets,
    };
    axum::response::Html(template.render().unwrap_or_else(|e| {
        let msg = e
            .to_string()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        format!("<h1>Template error: {}</h1>", msg)
    }))
}
