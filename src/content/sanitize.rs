//! Article HTML sanitizing using lol_html for streaming processing
//!
//! Strips elements whose text must never become part of a quote (scripts,
//! styles) and inline event handlers before the content is parsed into
//! block units.

use lol_html::{element, rewrite_str, RewriteStrSettings};

use crate::error::{ReaderError, Result};

/// Sanitize article HTML, preserving the content structure
pub fn sanitize_html(html: &str) -> Result<String> {
    let result = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!("script, style, noscript, template", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("*", |el| {
                    let handlers: Vec<String> = el
                        .attributes()
                        .iter()
                        .map(|attr| attr.name())
                        .filter(|name| name.starts_with("on"))
                        .collect();
                    for name in handlers {
                        el.remove_attribute(&name);
                    }
                    for attr in ["href", "src"] {
                        if let Some(value) = el.get_attribute(attr) {
                            if value.trim().to_lowercase().starts_with("javascript:") {
                                el.remove_attribute(attr);
                            }
                        }
                    }
                    Ok(())
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| ReaderError::Content(format!("HTML rewrite failed: {}", e)))?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_and_style_removed() {
        let html = "<p>Hello</p><script>alert('x')</script><style>p{}</style><p>World</p>";
        let result = sanitize_html(html).unwrap();

        assert!(!result.contains("script"));
        assert!(!result.contains("style"));
        assert!(result.contains("Hello"));
        assert!(result.contains("World"));
    }

    #[test]
    fn test_event_handlers_removed() {
        let html = r#"<p onclick="steal()" ondblclick="x()" class="lead">Hello</p>"#;
        let result = sanitize_html(html).unwrap();

        assert!(!result.contains("onclick"));
        assert!(!result.contains("ondblclick"));
        assert!(result.contains("class=\"lead\""));
    }

    #[test]
    fn test_javascript_urls_removed() {
        let html = r#"<a href="javascript:alert(1)">link</a><a href="https://example.com">ok</a>"#;
        let result = sanitize_html(html).unwrap();

        assert!(!result.contains("javascript:"));
        assert!(result.contains("https://example.com"));
    }
}
