use std::{borrow::Cow, sync::OnceLock};

use rust_embed::RustEmbed;

/// Embed the entire `assets/` directory into the binary.
#[derive(RustEmbed)]
#[folder = "assets"]
struct EmbeddedAssets;

const BACKEND_PLACEHOLDER: &str = "{{BACKEND_API}}";

static INDEX_TEMPLATE: OnceLock<String> = OnceLock::new();

/// The web page served at `/`, pointed at `backend_api`.
pub fn index_html(backend_api: &str) -> String {
    INDEX_TEMPLATE
        .get_or_init(|| load_text("/assets/index.html"))
        .replace(BACKEND_PLACEHOLDER, backend_api.trim_end_matches('/'))
}

fn load_text(path: &str) -> String {
    match load_asset(path) {
        Some(asset) => String::from_utf8_lossy(&asset).into_owned(),
        None => {
            tracing::error!(path, "embedded asset missing");
            String::new()
        }
    }
}

fn load_asset(path: &str) -> Option<Cow<'static, [u8]>> {
    EmbeddedAssets::get(&canonical_asset_path(path)).map(|file| file.data)
}

fn canonical_asset_path(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if let Some(rest) = trimmed.strip_prefix("assets/") {
        rest.to_string()
    } else {
        trimmed.to_string()
    }
}
