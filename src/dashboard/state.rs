use serde::Serialize;
use tokio::sync::{broadcast, RwLock};

use crate::app::EasyDash;
use crate::logger::CallbackMetrics;

/// Pushed to websocket subscribers after every callback invocation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackEvent {
    Invoked {
        output: String,
        success: bool,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Shared across handlers. The app is frozen once serving starts.
pub struct DashboardState {
    pub app: EasyDash,
    pub metrics: RwLock<CallbackMetrics>,
    pub event_tx: broadcast::Sender<CallbackEvent>,
}

impl DashboardState {
    pub fn new(app: EasyDash) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            app,
            metrics: RwLock::new(CallbackMetrics::new()),
            event_tx,
        }
    }

    /// Send to all subscribers; having none is fine.
    pub fn broadcast(&self, event: CallbackEvent) {
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_subscriber() {
        let state = DashboardState::new(EasyDash::new("events"));
        let mut rx = state.event_tx.subscribe();
        state.broadcast(CallbackEvent::Invoked {
            output: "output1.children".to_string(),
            success: true,
            duration_ms: 2,
            error: None,
        });
        let event = rx.recv().await.unwrap();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "invoked");
        assert_eq!(json["output"], "output1.children");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        let state = DashboardState::new(EasyDash::new("events"));
        state.broadcast(CallbackEvent::Invoked {
            output: "x.children".to_string(),
            success: false,
            duration_ms: 0,
            error: Some("boom".to_string()),
        });
    }
}
