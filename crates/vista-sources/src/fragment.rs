use vista_types::name_to_id;

/// Wrap `body` in the collapsible section every source fragment starts
/// with. The header id is the anchor the summary links to.
pub fn section(name: &str, body: &str) -> String {
    format!(
        "<h2 class=\"collapsible\" id=\"{}\">{}</h2>\n<div>\n{}\n</div>\n",
        escape(&name_to_id(name)),
        escape(name),
        body.trim_end()
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
