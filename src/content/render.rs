use std::fmt::Write;

use super::block::{Block, PageContent};

/// Renders a parsed content tree to an HTML fragment. Pure: the output is a
/// function of the tree alone. Unknown kinds never reach this point; parsing
/// already dropped them.
#[must_use]
pub fn render_content(content: &PageContent) -> String {
    let mut html = String::new();
    for block in &content.blocks {
        html.push_str(&render_block(block));
    }
    html
}

/// Renders one block. The match is exhaustive; adding a `Block` variant
/// without a renderer arm is a compile error.
#[must_use]
pub fn render_block(block: &Block) -> String {
    match block {
        Block::Heading { level, text } => {
            let level = (*level).clamp(1, 6);
            format!("<h{level}>{}</h{level}>\n", escape_html(text))
        }
        Block::Paragraph { text } => {
            format!("<p>{}</p>\n", escape_html(text))
        }
        Block::Image { src, alt, caption } => {
            let mut html = String::from("<figure>");
            let _ = write!(
                html,
                "<img src=\"{}\" alt=\"{}\">",
                escape_html(src),
                escape_html(alt)
            );
            if let Some(caption) = caption {
                let _ = write!(html, "<figcaption>{}</figcaption>", escape_html(caption));
            }
            html.push_str("</figure>\n");
            html
        }
        Block::Quote { text, attribution } => {
            let mut html = format!("<blockquote><p>{}</p>", escape_html(text));
            if let Some(attribution) = attribution {
                let _ = write!(html, "<cite>{}</cite>", escape_html(attribution));
            }
            html.push_str("</blockquote>\n");
            html
        }
        Block::Gallery { images } => {
            let mut html = String::from("<div class=\"gallery\">");
            for image in images {
                let _ = write!(
                    html,
                    "<img src=\"{}\" alt=\"{}\">",
                    escape_html(&image.src),
                    escape_html(&image.alt)
                );
            }
            html.push_str("</div>\n");
            html
        }
        Block::Timeline { entries } => {
            let mut html = String::from("<ol class=\"timeline\">");
            for entry in entries {
                let _ = write!(
                    html,
                    "<li><time>{}</time><strong>{}</strong><p>{}</p></li>",
                    escape_html(&entry.date),
                    escape_html(&entry.heading),
                    escape_html(&entry.body)
                );
            }
            html.push_str("</ol>\n");
            html
        }
        Block::Columns { children } => {
            let mut html = String::from("<div class=\"columns\">");
            for child in children {
                let _ = write!(html, "<div class=\"column\">{}</div>", render_block(child));
            }
            html.push_str("</div>\n");
            html
        }
    }
}

/// Wraps rendered content in the site's document shell.
#[must_use]
pub fn render_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n<main>\n{}</main>\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}

/// Escapes text for interpolation into HTML content or attribute values.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::block::{GalleryImage, TimelineEntry};
    use serde_json::json;

    #[test]
    fn test_render_is_total_over_registered_kinds() {
        let blocks = vec![
            Block::Heading { level: 1, text: "A".to_string() },
            Block::Paragraph { text: "B".to_string() },
            Block::Image { src: "x.jpg".to_string(), alt: "x".to_string(), caption: None },
            Block::Quote { text: "C".to_string(), attribution: Some("D".to_string()) },
            Block::Gallery { images: vec![GalleryImage { src: "g.jpg".to_string(), alt: String::new() }] },
            Block::Timeline { entries: vec![TimelineEntry { date: "1900".to_string(), heading: "E".to_string(), body: "F".to_string() }] },
            Block::Columns { children: vec![Block::Paragraph { text: "G".to_string() }] },
        ];

        for block in &blocks {
            assert!(!render_block(block).is_empty());
        }
    }

    #[test]
    fn test_heading_level_clamped() {
        let html = render_block(&Block::Heading { level: 9, text: "x".to_string() });
        assert!(html.starts_with("<h6>"));
        let html = render_block(&Block::Heading { level: 0, text: "x".to_string() });
        assert!(html.starts_with("<h1>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render_block(&Block::Paragraph {
            text: "<script>alert('x')</script> & more".to_string(),
        });
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp; more"));
    }

    #[test]
    fn test_unknown_kind_omitted_not_fatal() {
        let value = json!({
            "blocks": [
                {"kind": "paragraph", "text": "kept"},
                {"kind": "map_embed", "lat": 51.5}
            ]
        });

        let html = render_content(&PageContent::from_value(&value));
        assert!(html.contains("kept"));
        assert!(!html.contains("map_embed"));
    }

    #[test]
    fn test_empty_tree_renders_empty() {
        assert_eq!(render_content(&PageContent::default()), "");
    }

    #[test]
    fn test_columns_render_children() {
        let html = render_block(&Block::Columns {
            children: vec![
                Block::Paragraph { text: "left".to_string() },
                Block::Paragraph { text: "right".to_string() },
            ],
        });
        assert_eq!(html.matches("<div class=\"column\">").count(), 2);
        assert!(html.contains("left") && html.contains("right"));
    }

    #[test]
    fn test_document_shell_escapes_title() {
        let html = render_document("Tom & Jerry", "<p>x</p>");
        assert!(html.contains("<title>Tom &amp; Jerry</title>"));
        assert!(html.contains("<p>x</p>"));
    }
}
