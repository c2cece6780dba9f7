//! Render shell served at `/`.
//!
//! The shell is an empty page that loads the presentation assets; the
//! bundle then connects to `/events` and renders whatever content arrives.

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build the render shell document with an HTML-escaped title.
pub fn render_shell(title: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"UTF-8\">",
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">",
            "<title>{title}</title>",
            "<link rel=\"stylesheet\" href=\"/styles.css\">",
            "<script src=\"/mermaid.min.js\"></script>",
            "<script>mermaid.initialize({{startOnLoad:false,fontSize:12,",
            "flowchart:{{nodeSpacing:30,rankSpacing:30,padding:8}}}});</script>",
            "</head><body class=\"bg-gray-50 min-h-screen p-4 flex flex-col\">",
            "<div id=\"root\" class=\"flex flex-col flex-1\"></div>",
            "<script src=\"/bundle.js\"></script></body></html>"
        ),
        title = escape_html(title)
    )
}
