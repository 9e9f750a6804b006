//! Downloads and clipboard writes. These only do something inside a browser.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, Document, HtmlAnchorElement, Url};

pub(crate) fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("document is unavailable"))
}

/// Clicks a temporary `<a download>` pointing at `href`.
fn click_download(href: &str, file_name: &str) -> Result<(), JsValue> {
    let document = document()?;
    let link: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    link.set_href(href);
    link.set_download(file_name);
    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no body"))?;
    body.append_child(&link)?;
    link.click();
    link.remove();
    Ok(())
}

/// Saves `body` as a file through an object URL.
pub(crate) fn download_text(file_name: &str, mime: &str, body: &str) -> Result<(), JsValue> {
    let parts = js_sys::Array::of1(&JsValue::from_str(body));
    let options = BlobPropertyBag::new();
    options.set_type(mime);
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options)?;
    let url = Url::create_object_url_with_blob(&blob)?;
    let clicked = click_download(&url, file_name);
    Url::revoke_object_url(&url)?;
    clicked
}

pub(crate) fn download_data_url(file_name: &str, data_url: &str) -> Result<(), JsValue> {
    click_download(data_url, file_name)
}

/// Starts an asynchronous clipboard write. A rejected write is not reported.
pub(crate) fn copy_text(text: &str) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window is unavailable"))?;
    let _pending = window.navigator().clipboard().write_text(text);
    Ok(())
}

/// Blocking alert; nothing to do outside a browser.
pub(crate) fn alert(message: &str) {
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(message);
    }
}
