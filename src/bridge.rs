//! Cross-context messages carrying uploaded images.
//!
//! A message of type `glowsnap_image` switches the session to image mode and,
//! after a settling delay, runs whatever export handler is bound at that time.

use crate::session::SessionCore;
use crate::settings::{ContentMode, SettingsDelta};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const IMAGE_MESSAGE: &str = "glowsnap_image";

/// Build an image message the way external senders do
pub fn image_message(image_data: &str) -> Value {
    json!({ "type": IMAGE_MESSAGE, "imageData": image_data })
}

/// Image payload of a message, if it is an image message with data
pub fn image_payload(message: &Value) -> Option<&str> {
    if message.get("type").and_then(Value::as_str) != Some(IMAGE_MESSAGE) {
        return None;
    }
    message
        .get("imageData")
        .and_then(Value::as_str)
        .filter(|data| !data.is_empty())
}

/// Listen for messages until every sender is dropped
pub fn spawn_listener(mut messages: mpsc::UnboundedReceiver<Value>, core: SessionCore) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            let Some(image) = image_payload(&message) else {
                tracing::debug!("Ignoring message: {}", message);
                continue;
            };

            tracing::info!("Received image message ({} bytes)", image.len());
            core.update(SettingsDelta {
                image_data: Some(image.to_string()),
                mode: Some(ContentMode::Image),
                ..Default::default()
            });

            // Counted from now so batch runs wait for the delayed export too
            let pending = core.tracker().begin();
            let slot = core.export_slot();
            let settle = core.timing().message_settle;
            tokio::spawn(async move {
                tokio::time::sleep(settle).await;
                match slot.current() {
                    Some(handler) => handler().await,
                    None => tracing::warn!("No export handler bound"),
                }
                drop(pending);
            });
        }
        tracing::debug!("Message channel closed");
    })
}
