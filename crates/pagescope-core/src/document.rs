// Pagescope
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Parsed HTML document with the query helpers the checks rely on

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

/// A parsed page
///
/// Parsing never fails; malformed markup is repaired the way browsers do.
pub struct PageDocument {
    html: Html,
}

impl PageDocument {
    pub fn parse(markup: &str) -> Self {
        Self {
            html: Html::parse_document(markup),
        }
    }

    /// All elements matching a CSS selector, in document order
    pub fn select(&self, css: &str) -> Vec<ElementRef<'_>> {
        match Selector::parse(css) {
            Ok(selector) => self.html.select(&selector).collect(),
            Err(e) => {
                warn!("Invalid selector '{}': {:?}", css, e);
                Vec::new()
            }
        }
    }

    pub fn count(&self, css: &str) -> usize {
        self.select(css).len()
    }

    pub fn exists(&self, css: &str) -> bool {
        self.count(css) > 0
    }

    /// Attribute of the first matching element
    pub fn first_attr(&self, css: &str, attr: &str) -> Option<String> {
        self.select(css).first().and_then(|el| el.value().attr(attr)).map(str::to_string)
    }

    /// Concatenated text of every matching element, trimmed
    pub fn text(&self, css: &str) -> String {
        let text: String = self.select(css).iter().flat_map(|el| el.text()).collect();
        text.trim().to_string()
    }

    /// Heading levels (1-6) in document order
    pub fn heading_levels(&self) -> Vec<u8> {
        self.select("h1, h2, h3, h4, h5, h6")
            .iter()
            .filter_map(|el| el.value().name().strip_prefix('h').and_then(|n| n.parse().ok()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queries() {
        let doc = PageDocument::parse(
            r#"<html lang="en"><head><title> Hello </title><meta name="description" content="A page"></head>
            <body><h2>b</h2><h1>a</h1><img src="x.png"><img src="y.png" alt="y"></body></html>"#,
        );

        assert_eq!(doc.text("head title"), "Hello");
        assert_eq!(doc.first_attr("head meta[name=\"description\"]", "content").as_deref(), Some("A page"));
        assert_eq!(doc.first_attr("html", "lang").as_deref(), Some("en"));
        assert_eq!(doc.count("img"), 2);
        assert_eq!(doc.heading_levels(), vec![2, 1]);
        assert!(!doc.exists("main"));
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = PageDocument::parse("<p>text</p>");
        assert!(doc.select("p[").is_empty());
    }

    #[test]
    fn test_malformed_markup_still_parses() {
        let doc = PageDocument::parse("<div><p>unclosed <b>bold</div>");
        assert_eq!(doc.text("b"), "bold");
    }
}
