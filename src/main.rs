use anyhow::Result;
use dotenvy::dotenv;
use serde_json::Value;

use easy_dash::{auto_callback, html, widgets, AppConfig, EasyDash, HandlerDescriptor, ImageArray, PreviewOptions};

/// Demo app: a text input echoed into two outputs, and a size input that
/// drives a caption and a rendered pattern.
fn build_app(config: AppConfig) -> Result<EasyDash> {
    let mut app = EasyDash::with_config("easy-dash demo", config).with_session_log()?;
    app.set_layout(html::div(vec![
        Value::from(html::h1("easy-dash")),
        Value::from(widgets::input("input", "initial value")),
        Value::from(html::div(Value::Null).id("output1")),
        Value::from(html::div(Value::Null).id("output2")),
        Value::from(widgets::input("plot_size", "5")),
        Value::from(html::div(Value::Null).id("output_mpl")),
        Value::from(widgets::graph("plot")),
    ]));

    auto_callback!(app, fn update_output1(input) { input })?;

    auto_callback!(app, fn update_children_of_output2(value_of_input) {
        value_of_input
    })?;

    auto_callback!(app, fn update_output_mpl(value_of_plot_size) {
        format!("New Size: {}", value_of_plot_size.as_str().unwrap_or_default())
    })?;

    app.image_callback(
        HandlerDescriptor::new("update_children_of_plot", ["value_of_plot_size"]),
        |args| {
            let size: f32 = args[0].as_str().unwrap_or("5").trim().parse()?;
            let n = (size.clamp(1.0, 200.0) * 4.0) as usize;
            let rows = (0..n)
                .map(|r| (0..n).map(|c| (r as f32 / size).sin() * (c as f32 / size).cos()).collect())
                .collect();
            Ok(ImageArray::from_rows(rows)?.into())
        },
    )?;

    Ok(app)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (JUPYTERHUB_SERVICE_PREFIX, EASYDASH_*)
    dotenv().ok();

    let config = AppConfig::load();
    let app = build_app(config)?;

    if std::env::args().any(|a| a == "--preview") {
        app.show_app(PreviewOptions::default()).await
    } else {
        app.run().await
    }
}
