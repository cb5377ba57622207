//! Web front end for an `EasyDash` app.
//!
//! Serves the layout and callback dependencies as JSON, runs callbacks on
//! `/_dash-update-component`, and streams invocation events over a websocket.

pub mod routes;
pub mod server;
pub mod state;
pub mod templates;
pub mod websocket;

pub use server::{router, start_dashboard};
pub use state::{CallbackEvent, DashboardState};
