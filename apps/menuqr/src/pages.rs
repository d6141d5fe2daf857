//! Island page shells.
//!
//! Every page is a bare HTML document whose `#root` element names the
//! frontend island to mount and carries its props as escaped JSON.

use axum::response::Html;
use serde_json::Value;

/// Escape text for an HTML attribute or text node.
#[must_use]
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

/// Render the shell for island `name`.
#[must_use]
pub fn render(title: &str, name: &str, props: &Value) -> String {
    let title = escape(title);
    let name = escape(name);
    let props = escape(&props.to_string());
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"fr\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         </head>\n\
         <body>\n\
         <div id=\"root\" data-island=\"{name}\" data-props=\"{props}\"></div>\n\
         <script type=\"module\" src=\"/build/{name}.js\"></script>\n\
         </body>\n\
         </html>\n"
    )
}

pub fn island(title: &str, name: &str, props: &Value) -> Html<String> {
    Html(render(title, name, props))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn props_are_escaped_into_attribute() {
        let html = render(
            "Menu",
            "Menu/Index",
            &json!({ "name": "<b>Chez \"Awa\"</b>" }),
        );
        assert!(html.contains("data-island=\"Menu/Index\""));
        assert!(html.contains("&lt;b&gt;Chez \\&quot;Awa\\&quot;&lt;/b&gt;"));
        assert!(!html.contains("<b>"));
        assert!(html.contains("src=\"/build/Menu/Index.js\""));
    }

    #[test]
    fn escape_handles_ampersand_first() {
        assert_eq!(escape("a&<"), "a&amp;&lt;");
        assert_eq!(escape("it's"), "it&#39;s");
    }
}
