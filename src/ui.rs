//! Browser UI pages.
//!
//! Plain HTML with a little inline JavaScript that calls the JSON endpoints.

use axum::extract::State;
use axum::response::Html;

use crate::server::AppState;

const STYLE: &str = r#"
* { box-sizing: border-box; }
body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, sans-serif; background: #f5f5f5; color: #111; }
nav { background: #111; padding: 12px 20px; }
nav a { color: #bbb; margin-right: 16px; text-decoration: none; }
nav a.active { color: #fff; font-weight: bold; }
main { max-width: 720px; margin: 24px auto; background: #fff; padding: 24px; border: 1px solid #ddd; }
label { display: block; margin-top: 12px; font-size: 14px; }
input, textarea, select { width: 100%; padding: 6px; margin-top: 4px; font: inherit; }
button { margin-top: 16px; padding: 8px 16px; }
pre { background: #f0f0f0; padding: 12px; overflow-x: auto; }
"#;

const SCRIPT: &str = r#"
async function show(response) {
  const out = document.getElementById('result');
  let body;
  try { body = await response.json(); } catch (e) { body = { success: false, message: response.statusText }; }
  out.textContent = JSON.stringify(body, null, 2);
  return body;
}
function formJson(form) {
  const data = {};
  for (const [k, v] of new FormData(form).entries()) {
    if (v === '') continue;
    data[k] = k === 'refresh_now' ? v === 'true' : (k === 'border' ? Number(v) : v);
  }
  return data;
}
"#;

fn page(title: &str, active: &str, body: &str) -> Html<String> {
    let link = |href: &str, name: &str, key: &str| {
        let class = if key == active { " class=\"active\"" } else { "" };
        format!("<a href=\"{href}\"{class}>{name}</a>")
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<title>{title} - Quote/0</title>
<style>{STYLE}</style>
<script>{SCRIPT}</script>
</head>
<body>
<nav>{dashboard}{text}{image}{settings}</nav>
<main>
<h1>{title}</h1>
{body}
<pre id="result"></pre>
</main>
</body>
</html>"#,
        dashboard = link("/", "Dashboard", "dashboard"),
        text = link("/ui/text", "Text", "text"),
        image = link("/ui/image", "Image", "image"),
        settings = link("/ui/settings", "Settings", "settings"),
    ))
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const DITHER_OPTIONS: &str = r#"
<option>DIFFUSION</option><option>ORDERED</option><option>NONE</option>"#;

pub(crate) async fn dashboard() -> Html<String> {
    page(
        "Dashboard",
        "dashboard",
        r#"
<button onclick="fetch('/devices').then(show)">List devices</button>
<label>Device ID <input id="device"></label>
<button onclick="fetch('/devices/' + encodeURIComponent(device.value) + '/status').then(show)">Status</button>
<button onclick="fetch('/devices/' + encodeURIComponent(device.value) + '/tasks').then(show)">Tasks</button>
<button onclick="fetch('/devices/' + encodeURIComponent(device.value) + '/next', {method: 'POST'}).then(show)">Next content</button>
"#,
    )
}

pub(crate) async fn text_page() -> Html<String> {
    page(
        "Text",
        "text",
        r#"
<form id="text-form" onsubmit="event.preventDefault(); fetch('/text', {method: 'POST', headers: {'Content-Type': 'application/json'}, body: JSON.stringify(formJson(this))}).then(show)">
<label>Device ID (optional) <input name="device_id"></label>
<label>Title <input name="title"></label>
<label>Message <textarea name="message" rows="4"></textarea></label>
<label>Signature <input name="signature"></label>
<label>Link <input name="link"></label>
<label>Task key <input name="task_key"></label>
<label>Refresh now <select name="refresh_now"><option>true</option><option>false</option></select></label>
<button type="submit">Send text</button>
</form>
"#,
    )
}

pub(crate) async fn image_page() -> Html<String> {
    let body = format!(
        r#"
<h2>Upload</h2>
<form onsubmit="event.preventDefault(); fetch('/image/upload', {{method: 'POST', body: new FormData(this)}}).then(show)">
<label>Image file <input type="file" name="file" accept="image/*" required></label>
<label>Device ID (optional) <input name="device_id"></label>
<label>Border <select name="border"><option value="0">White</option><option value="1">Black</option></select></label>
<label>Dither type <select name="dither_type">{DITHER_OPTIONS}</select></label>
<button type="submit">Upload and send</button>
</form>
<h2>Render text as image</h2>
<form onsubmit="event.preventDefault(); fetch('/text-to-image?' + new URLSearchParams(formJson(this)), {{method: 'POST'}}).then(show)">
<label>Device ID (optional) <input name="device_id"></label>
<label>Title <input name="title"></label>
<label>Message <textarea name="message" rows="4"></textarea></label>
<label>Signature <input name="signature"></label>
<button type="submit">Render and send</button>
</form>
"#
    );
    page("Image", "image", &body)
}

pub(crate) async fn settings_page(State(state): State<AppState>) -> Html<String> {
    let saved = state.store.load().await;
    let settings = &state.settings;

    let api_key = saved.as_ref().map_or(settings.dot_api_key.as_str(), |s| s.api_key.as_str());
    let device_id = saved
        .as_ref()
        .map_or(settings.dot_default_device_id.as_str(), |s| s.device_id.as_str());
    let base_url = saved
        .as_ref()
        .map_or(settings.dot_api_base_url.as_str(), |s| s.base_url.as_str());

    let body = format!(
        r#"
<form onsubmit="event.preventDefault(); fetch('/ui/api/settings', {{method: 'POST', headers: {{'Content-Type': 'application/json'}}, body: JSON.stringify(Object.fromEntries(new FormData(this)))}}).then(show)">
<label>API key <input name="api_key" value="{api_key}"></label>
<label>Default device ID <input name="device_id" value="{device_id}"></label>
<label>API base URL <input name="base_url" value="{base_url}"></label>
<button type="submit">Save</button>
</form>
"#,
        api_key = escape(api_key),
        device_id = escape(device_id),
        base_url = escape(base_url),
    );
    page("Settings", "settings", &body)
}
