//! Element snapshots addressed by a `data-adascal-ref` attribute.
//!
//! Queries run in the page and tag each returned element, so a later click
//! or screenshot finds the same node again without holding remote object
//! handles.

use adascal_protocols::{ElementHandle, Rect};
use serde::Deserialize;
use serde_json::Value;

use crate::cdp::error::CdpError;

use super::core::PageSession;

/// Snapshot function spliced into the scripts below at `__DESCRIBE__`.
const DESCRIBE: &str = r#"
const describe = (el, text) => {
  let ref = el.getAttribute('data-adascal-ref');
  if (!ref) {
    window.__adascalNextRef = (window.__adascalNextRef || 0) + 1;
    ref = String(window.__adascalNextRef);
    el.setAttribute('data-adascal-ref', ref);
  }
  const r = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  const displayed = el.isConnected
    && style.display !== 'none'
    && style.visibility !== 'hidden'
    && el.getClientRects().length > 0;
  const attributes = {};
  for (const name of ['src', 'placeholder', 'class', 'href', 'alt']) {
    const v = el.getAttribute(name);
    if (v !== null) attributes[name] = v;
  }
  if (el.tagName === 'IMG') {
    attributes.naturalWidth = String(el.naturalWidth);
    attributes.naturalHeight = String(el.naturalHeight);
  }
  return {
    id: ref,
    tag: el.tagName.toLowerCase(),
    text: (text !== undefined ? text : (el.innerText || el.textContent || '')).trim(),
    attributes,
    bounds: { x: r.left, y: r.top, width: r.width, height: r.height },
    displayed,
  };
};
"#;

const QUERY_ALL: &str = r#"(() => {
__DESCRIBE__
  return Array.from(document.querySelectorAll(__SELECTOR__)).map((el) => describe(el));
})()"#;

const TEXT_NODE_PARENTS: &str = r#"(() => {
__DESCRIBE__
  const out = [];
  if (!document.body) return out;
  const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
  let node;
  while ((node = walker.nextNode())) {
    const text = node.textContent.trim();
    const parent = node.parentElement;
    if (!text || !parent) continue;
    const tag = parent.tagName;
    if (tag === 'SCRIPT' || tag === 'STYLE' || tag === 'NOSCRIPT') continue;
    out.push(describe(parent, text));
  }
  return out;
})()"#;

const LOCATE: &str = r#"(() => {
  const el = document.querySelector('[data-adascal-ref="' + __REF__ + '"]');
  if (!el) return null;
  if (__SCROLL__) el.scrollIntoView({ block: 'center', inline: 'center' });
  const r = el.getBoundingClientRect();
  return {
    x: r.left, y: r.top, width: r.width, height: r.height,
    scrollX: window.scrollX, scrollY: window.scrollY,
  };
})()"#;

const DOM_CLICK: &str = r#"(() => {
  const el = document.querySelector('[data-adascal-ref="' + __REF__ + '"]');
  if (!el) return false;
  el.click();
  return true;
})()"#;

/// Location of a tagged element.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Located {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Located {
    /// Rectangle in viewport coordinates.
    pub fn viewport_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Rectangle in document coordinates.
    pub fn document_rect(&self) -> Rect {
        Rect::new(self.x + self.scroll_x, self.y + self.scroll_y, self.width, self.height)
    }
}

/// Quote a value as a JavaScript string literal.
pub(super) fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

impl PageSession {
    /// Snapshot every element matching a CSS selector.
    pub async fn query_elements(&self, selector: &str) -> Result<Vec<ElementHandle>, CdpError> {
        let script = QUERY_ALL
            .replace("__DESCRIBE__", DESCRIBE)
            .replace("__SELECTOR__", &js_string(selector));
        let value = self.evaluate(&script).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Snapshot the parent of every non-empty text node, carrying the text
    /// node's own text.
    pub async fn text_node_parents(&self) -> Result<Vec<ElementHandle>, CdpError> {
        let script = TEXT_NODE_PARENTS.replace("__DESCRIBE__", DESCRIBE);
        let value = self.evaluate(&script).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Current position of a tagged element, optionally scrolling it into view.
    pub(crate) async fn locate(&self, element_ref: &str, scroll: bool) -> Result<Located, CdpError> {
        let script = LOCATE
            .replace("__REF__", &js_string(element_ref))
            .replace("__SCROLL__", if scroll { "true" } else { "false" });
        let value = self.evaluate(&script).await?;
        if value.is_null() {
            return Err(CdpError::ElementNotFound(element_ref.to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Click through the DOM instead of mouse events.
    pub(crate) async fn dom_click(&self, element_ref: &str) -> Result<(), CdpError> {
        let script = DOM_CLICK.replace("__REF__", &js_string(element_ref));
        match self.evaluate(&script).await?.as_bool() {
            Some(true) => Ok(()),
            _ => Err(CdpError::ElementNotFound(element_ref.to_string())),
        }
    }
}
