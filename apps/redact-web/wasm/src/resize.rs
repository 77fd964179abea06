//! Window resize subscription
//!
//! Holding a [`ResizeListener`] keeps the listener registered; dropping it
//! removes the listener, on every path out of the owning scope.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

pub struct ResizeListener {
    window: Window,
    closure: Closure<dyn FnMut()>,
}

impl ResizeListener {
    pub fn attach(callback: impl FnMut() + 'static) -> Result<Self, JsValue> {
        let window =
            web_sys::window().ok_or_else(|| JsValue::from_str("No window object available"))?;
        let closure = Closure::wrap(Box::new(callback) as Box<dyn FnMut()>);
        window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref())?;
        tracing::debug!("resize listener attached");
        Ok(Self { window, closure })
    }
}

impl Drop for ResizeListener {
    fn drop(&mut self) {
        if self
            .window
            .remove_event_listener_with_callback("resize", self.closure.as_ref().unchecked_ref())
            .is_err()
        {
            tracing::warn!("failed to remove resize listener");
        } else {
            tracing::debug!("resize listener removed");
        }
    }
}
