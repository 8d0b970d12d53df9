//! Mouse and keyboard input.

use serde_json::json;
use tracing::debug;

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{KeyEventType, MouseButton, MouseEventType};

use super::core::PageSession;

impl PageSession {
    /// Click at viewport coordinates.
    pub async fn click(&self, x: f64, y: f64) -> Result<(), CdpError> {
        self.call(
            "Input.dispatchMouseEvent",
            Some(json!({
                "type": MouseEventType::MouseMoved,
                "x": x,
                "y": y,
                "button": MouseButton::None,
            })),
        )
        .await?;

        for event in [MouseEventType::MousePressed, MouseEventType::MouseReleased] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": event,
                    "x": x,
                    "y": y,
                    "button": MouseButton::Left,
                    "clickCount": 1,
                })),
            )
            .await?;
        }

        debug!("Clicked at ({}, {})", x, y);
        Ok(())
    }

    /// Press and release a named key.
    pub async fn press_key(&self, key: &str) -> Result<(), CdpError> {
        let key_code = Self::virtual_key_code(key);

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::RawKeyDown,
                "key": key,
                "code": key,
                "windowsVirtualKeyCode": key_code,
            })),
        )
        .await?;

        self.call(
            "Input.dispatchKeyEvent",
            Some(json!({
                "type": KeyEventType::KeyUp,
                "key": key,
                "code": key,
                "windowsVirtualKeyCode": key_code,
            })),
        )
        .await?;

        Ok(())
    }

    /// Windows virtual key code for the non-printable keys the engine uses.
    pub(super) fn virtual_key_code(key: &str) -> i32 {
        match key {
            "Escape" => 27,
            "Enter" => 13,
            "Tab" => 9,
            "Backspace" => 8,
            "ArrowDown" => 40,
            "ArrowUp" => 38,
            _ => 0,
        }
    }
}
