//! Rendering user-written Markdown to HTML.

use pulldown_cmark::{html, Options, Parser};

/// Render Markdown to sanitized HTML.
///
/// Links get `rel="noopener noreferrer"` and any scripts, styles or event
/// handlers in the source are stripped.
pub fn render_content<S>(source: S) -> String
where
    S: AsRef<str>,
{
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(source.as_ref(), options);

    let mut unsafe_html = String::new();
    html::push_html(&mut unsafe_html, parser);

    ammonia::clean(&unsafe_html)
}

#[cfg(test)]
mod tests {
    use super::render_content;

    #[test]
    fn strong() {
        assert_eq!(
            render_content("**supercomputer**"),
            "<p><strong>supercomputer</strong></p>\n"
        );
    }

    #[test]
    fn emphasis() {
        assert_eq!(render_content("*harm*"), "<p><em>harm</em></p>\n");
    }

    #[test]
    fn header() {
        assert_eq!(
            render_content("# The hardships of artistry"),
            "<h1>The hardships of artistry</h1>\n"
        );
    }

    #[test]
    fn scripts_are_removed() {
        let html = render_content("hi <script>alert('pwned')</script>");

        assert!(!html.contains("<script"));
        assert!(!html.contains("alert"));
    }

    #[test]
    fn links_are_safe() {
        let html = render_content("[site](https://example.com)");

        assert!(html.contains("href=\"https://example.com\""));
        assert!(html.contains("rel=\"noopener noreferrer\""));

        let html = render_content("[bad](javascript:alert(1))");
        assert!(!html.contains("javascript:"));
    }

    #[test]
    fn empty() {
        assert_eq!(render_content(""), "");
    }
}
