// SPDX-License-Identifier: Apache-2.0
//! Single-file static HTML serving. No other path is served;
//! the page is built once at startup with `shared.js` inlined in place of
//! a sentinel tag, rather than exposing a second route for it.

const INDEX_HTML: &str = include_str!("../assets/index.html");
const SHARED_JS: &str = include_str!("../assets/shared.js");
const SENTINEL: &str = r#"<script src="shared.js"></script>"#;

/// Build the single served page, computed once at startup.
pub fn render_page() -> String {
    let inlined = format!("<script>\n{SHARED_JS}\n</script>");
    INDEX_HTML.replacen(SENTINEL, &inlined, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_replaced_with_inlined_script() {
        let page = render_page();
        assert!(!page.contains(SENTINEL));
        assert!(page.contains("WebSocket"));
    }
}
