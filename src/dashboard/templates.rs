//! HTML templates for the web dashboard.
//!
//! Templates are embedded at compile time using `include_str!`.

/// The base HTML template with navigation and layout.
///
/// Placeholders: `{{title}}`, `{{nav}}`, `{{content}}`.
pub const BASE_TEMPLATE: &str = include_str!("templates/base.html");

/// Fill the base template. Callers pass already-escaped HTML.
pub fn render(title: &str, nav: &str, content: &str) -> String {
    BASE_TEMPLATE
        .replace("{{title}}", title)
        .replace("{{nav}}", nav)
        .replace("{{content}}", content)
}
