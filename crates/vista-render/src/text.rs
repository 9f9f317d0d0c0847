use html2text::render::text_renderer::TrivialDecorator;

/// Line width of the plain-text rendition.
const TEXT_WIDTH: usize = 100;

/// Convert an HTML document to plain text.
///
/// Links are reduced to their text, tables are drawn with box characters.
pub fn to_plain_text(html: &[u8]) -> String {
    html2text::from_read_with_decorator(html, TEXT_WIDTH, TrivialDecorator::new())
}
