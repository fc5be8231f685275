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

//! Structural / head section checks

use super::{Check, Evaluation, StaticAnalyzer, char_len};
use crate::document::PageDocument;
use crate::models::AnalyzerName;
use std::ops::RangeInclusive;

const HEAD_SEO: &str = "Head Section SEO";
const SOCIAL_SEO: &str = "Social Media SEO";
const STRUCTURED_DATA: &str = "Structured Data";
const ON_PAGE_BASICS: &str = "On-Page SEO Basics";

pub const TITLE_LENGTH: RangeInclusive<usize> = 10..=60;
pub const META_DESCRIPTION_LENGTH: RangeInclusive<usize> = 50..=160;

const REQUIRED_OG_TAGS: [&str; 5] = ["og:title", "og:description", "og:image", "og:url", "og:type"];
const REQUIRED_TWITTER_TAGS: [&str; 4] = ["twitter:card", "twitter:title", "twitter:description", "twitter:image"];

static CHECKS: &[Check] = &[
    Check {
        title: "Title Tag",
        category: HEAD_SEO,
        evaluate: title_tag,
    },
    Check {
        title: "Meta Description",
        category: HEAD_SEO,
        evaluate: meta_description,
    },
    Check {
        title: "Meta Keywords Tag",
        category: HEAD_SEO,
        evaluate: meta_keywords,
    },
    Check {
        title: "Viewport Meta Tag",
        category: HEAD_SEO,
        evaluate: viewport,
    },
    Check {
        title: "Canonical Tag",
        category: HEAD_SEO,
        evaluate: canonical,
    },
    Check {
        title: "Character Set (UTF-8)",
        category: HEAD_SEO,
        evaluate: charset,
    },
    Check {
        title: "Robots Meta Tag",
        category: HEAD_SEO,
        evaluate: robots,
    },
    Check {
        title: "Favicon",
        category: HEAD_SEO,
        evaluate: favicon,
    },
    Check {
        title: "Open Graph (OG) Metatags",
        category: SOCIAL_SEO,
        evaluate: open_graph,
    },
    Check {
        title: "Twitter Card Metatags",
        category: SOCIAL_SEO,
        evaluate: twitter_card,
    },
    Check {
        title: "JSON-LD Structured Data",
        category: STRUCTURED_DATA,
        evaluate: json_ld,
    },
    Check {
        title: "HTML Lang Attribute",
        category: HEAD_SEO,
        evaluate: html_lang,
    },
    Check {
        title: "H1",
        category: ON_PAGE_BASICS,
        evaluate: single_h1,
    },
];

/// Checks on the document head and overall page structure
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadAnalyzer;

impl StaticAnalyzer for HeadAnalyzer {
    fn name(&self) -> AnalyzerName {
        AnalyzerName::Head
    }

    fn checks(&self) -> &'static [Check] {
        CHECKS
    }
}

fn meta_content(doc: &PageDocument, css: &str) -> String {
    doc.first_attr(css, "content").map(|c| c.trim().to_string()).unwrap_or_default()
}

fn title_tag(doc: &PageDocument) -> Evaluation {
    let title = doc.text("head title");
    let len = char_len(&title);

    if title.is_empty() {
        Evaluation::fail("Title tag is missing.")
    } else if TITLE_LENGTH.contains(&len) {
        Evaluation::pass(format!("Title tag found and is optimal length ({} chars): \"{}\"", len, title))
    } else {
        Evaluation::fail(format!(
            "Title tag found but length is not optimal ({} chars). Recommended: {}-{} chars.",
            len,
            TITLE_LENGTH.start(),
            TITLE_LENGTH.end()
        ))
    }
}

fn meta_description(doc: &PageDocument) -> Evaluation {
    let description = meta_content(doc, r#"head meta[name="description"]"#);
    let len = char_len(&description);

    if description.is_empty() {
        Evaluation::fail("Meta description is missing.")
    } else if META_DESCRIPTION_LENGTH.contains(&len) {
        let preview: String = description.chars().take(100).collect();
        Evaluation::pass(format!("Meta description found and is optimal length ({} chars): \"{}...\"", len, preview))
    } else {
        Evaluation::fail(format!(
            "Meta description found but length is not optimal ({} chars). Recommended: {}-{} chars.",
            len,
            META_DESCRIPTION_LENGTH.start(),
            META_DESCRIPTION_LENGTH.end()
        ))
    }
}

// Informational only: keywords carry no ranking weight any more.
fn meta_keywords(doc: &PageDocument) -> Evaluation {
    let keywords = meta_content(doc, r#"head meta[name="keywords"]"#);
    if keywords.is_empty() {
        Evaluation::pass("Meta keywords tag is missing.")
    } else {
        Evaluation::pass(format!("Meta keywords tag found: \"{}\" (Note: Less important for modern SEO).", keywords))
    }
}

fn viewport(doc: &PageDocument) -> Evaluation {
    let content = meta_content(doc, r#"head meta[name="viewport"]"#);
    if content.contains("width=device-width") {
        Evaluation::pass("Viewport meta tag found and correctly configured for responsive design.")
    } else {
        Evaluation::fail("Viewport meta tag is missing or not configured for responsive design (e.g., missing \"width=device-width\").")
    }
}

fn canonical(doc: &PageDocument) -> Evaluation {
    let selector = r#"head link[rel="canonical"]"#;
    if !doc.exists(selector) {
        return Evaluation::fail("Canonical tag is missing.");
    }

    match doc.first_attr(selector, "href") {
        Some(href) if href.starts_with("http://") || href.starts_with("https://") => Evaluation::pass(format!("Canonical tag found: \"{}\"", href)),
        _ => Evaluation::fail("Canonical tag found but 'href' is missing or invalid."),
    }
}

fn charset(doc: &PageDocument) -> Evaluation {
    let charset = doc.first_attr("head meta[charset]", "charset").map(|c| c.trim().to_lowercase()).unwrap_or_default();
    if charset == "utf-8" {
        Evaluation::pass("Character set declared as UTF-8.")
    } else {
        let found = if charset.is_empty() { "none" } else { charset.as_str() };
        Evaluation::fail(format!("Character set is missing or not UTF-8 (found: \"{}\").", found))
    }
}

// The tag's content decides crawler behaviour, so presence is never a failure.
fn robots(doc: &PageDocument) -> Evaluation {
    let selector = r#"head meta[name="robots"]"#;
    if !doc.exists(selector) {
        return Evaluation::pass("Robots meta tag is missing (defaults to index, follow).");
    }

    let content = meta_content(doc, selector).to_lowercase();
    let indexing = if content.contains("noindex") { "Disallowed" } else { "Allowed" };
    let following = if content.contains("nofollow") { "Disallowed" } else { "Allowed" };
    Evaluation::pass(format!("Robots meta tag found: \"{}\". Indexing: {}. Following: {}.", content, indexing, following))
}

fn favicon(doc: &PageDocument) -> Evaluation {
    if doc.exists(r#"head link[rel="icon"], head link[rel="shortcut icon"]"#) {
        Evaluation::pass("Favicon found.")
    } else {
        Evaluation::fail("Favicon is missing (recommended for branding and user experience).")
    }
}

fn missing_tags(doc: &PageDocument, attr: &str, required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|tag| !doc.exists(&format!(r#"head meta[{}="{}"]"#, attr, tag)))
        .map(|tag| tag.to_string())
        .collect()
}

fn open_graph(doc: &PageDocument) -> Evaluation {
    if !doc.exists(r#"head meta[property^="og:"]"#) {
        return Evaluation::fail("No Open Graph tags found.");
    }

    let missing = missing_tags(doc, "property", &REQUIRED_OG_TAGS);
    if missing.is_empty() {
        Evaluation::pass("All essential Open Graph tags found.")
    } else {
        Evaluation::fail(format!("Missing essential Open Graph tags: {}.", missing.join(", ")))
    }
}

fn twitter_card(doc: &PageDocument) -> Evaluation {
    if !doc.exists(r#"head meta[name^="twitter:"]"#) {
        return Evaluation::fail("No Twitter Card tags found.");
    }

    let missing = missing_tags(doc, "name", &REQUIRED_TWITTER_TAGS);
    if missing.is_empty() {
        Evaluation::pass("All essential Twitter Card tags found.")
    } else {
        Evaluation::fail(format!("Missing essential Twitter Card tags: {}.", missing.join(", ")))
    }
}

fn json_ld(doc: &PageDocument) -> Evaluation {
    match doc.count(r#"head script[type="application/ld+json"]"#) {
        0 => Evaluation::fail("JSON-LD structured data is missing."),
        blocks => Evaluation::pass(format!("JSON-LD structured data found ({} block(s)).", blocks)),
    }
}

fn html_lang(doc: &PageDocument) -> Evaluation {
    match doc.first_attr("html", "lang").map(|l| l.trim().to_string()) {
        Some(lang) if !lang.is_empty() => Evaluation::pass(format!("HTML lang attribute is set to \"{}\".", lang)),
        _ => Evaluation::fail("HTML lang attribute is missing."),
    }
}

fn single_h1(doc: &PageDocument) -> Evaluation {
    match doc.count("h1") {
        0 => Evaluation::fail("No <h1> tag found. Found 0."),
        1 => Evaluation::pass("Page has exactly one <h1> tag. Found 1."),
        n => Evaluation::fail(format!("Page has multiple <h1> tags. Found {}; exactly one is recommended.", n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckResult;

    fn result<'a>(results: &'a [CheckResult], title: &str) -> &'a CheckResult {
        results.iter().find(|r| r.title == title).unwrap_or_else(|| panic!("missing check {}", title))
    }

    const WELL_FORMED: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Pagescope test page for head checks</title>
  <meta name="description" content="A deliberately well formed page used to exercise every head check in the analyzer suite.">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta name="robots" content="noindex, follow">
  <link rel="canonical" href="https://example.com/page">
  <link rel="icon" href="/favicon.ico">
  <meta property="og:title" content="t"><meta property="og:description" content="d">
  <meta property="og:image" content="i"><meta property="og:url" content="u"><meta property="og:type" content="website">
  <meta name="twitter:card" content="summary"><meta name="twitter:title" content="t">
  <meta name="twitter:description" content="d"><meta name="twitter:image" content="i">
  <script type="application/ld+json">{"@type": "WebPage"}</script>
</head>
<body><h1>Only heading</h1></body>
</html>"#;

    #[test]
    fn test_well_formed_page_passes_everything() {
        let results = HeadAnalyzer.analyze_markup(WELL_FORMED);
        for r in &results {
            assert!(r.pass, "{} failed: {}", r.title, r.description);
        }
        assert!(result(&results, "Robots Meta Tag").description.contains("Indexing: Disallowed. Following: Allowed."));
        assert!(result(&results, "JSON-LD Structured Data").description.contains("(1 block(s))"));
    }

    #[test]
    fn test_missing_h1_fails() {
        let results = HeadAnalyzer.analyze_markup("<html><head><title>x</title></head><body><p>no headings</p></body></html>");
        let h1 = result(&results, "H1");
        assert!(!h1.pass);
        assert!(h1.description.contains("Found 0"));
    }

    #[test]
    fn test_multiple_h1_fails() {
        let results = HeadAnalyzer.analyze_markup("<h1>a</h1><h1>b</h1>");
        assert!(!result(&results, "H1").pass);
        assert!(result(&results, "H1").description.contains("Found 2"));
    }

    #[test]
    fn test_title_length_bounds() {
        let short = HeadAnalyzer.analyze_markup("<title>Too short</title>");
        let title = result(&short, "Title Tag");
        assert!(!title.pass);
        assert!(title.description.contains("(9 chars)"));

        let long = format!("<title>{}</title>", "x".repeat(61));
        assert!(!result(&HeadAnalyzer.analyze_markup(&long), "Title Tag").pass);

        let exact = format!("<title>{}</title>", "x".repeat(60));
        assert!(result(&HeadAnalyzer.analyze_markup(&exact), "Title Tag").pass);
    }

    #[test]
    fn test_meta_description_bounds() {
        let markup = |len: usize| format!(r#"<head><meta name="description" content="{}"></head>"#, "d".repeat(len));

        assert!(!result(&HeadAnalyzer.analyze_markup(&markup(49)), "Meta Description").pass);
        assert!(result(&HeadAnalyzer.analyze_markup(&markup(50)), "Meta Description").pass);
        assert!(result(&HeadAnalyzer.analyze_markup(&markup(160)), "Meta Description").pass);
        assert!(!result(&HeadAnalyzer.analyze_markup(&markup(161)), "Meta Description").pass);
    }

    #[test]
    fn test_partial_social_tags_are_listed() {
        let results = HeadAnalyzer.analyze_markup(r#"<head><meta property="og:title" content="t"><meta name="twitter:card" content="summary"></head>"#);

        let og = result(&results, "Open Graph (OG) Metatags");
        assert!(!og.pass);
        assert_eq!(og.description, "Missing essential Open Graph tags: og:description, og:image, og:url, og:type.");

        let twitter = result(&results, "Twitter Card Metatags");
        assert!(twitter.description.contains("twitter:title, twitter:description, twitter:image"));
    }

    #[test]
    fn test_relative_canonical_is_invalid() {
        let results = HeadAnalyzer.analyze_markup(r#"<head><link rel="canonical" href="/page"></head>"#);
        let canonical = result(&results, "Canonical Tag");
        assert!(!canonical.pass);
        assert!(canonical.description.contains("missing or invalid"));
    }

    #[test]
    fn test_informational_checks_always_pass() {
        let results = HeadAnalyzer.analyze_markup("");
        assert!(result(&results, "Meta Keywords Tag").pass);
        assert!(result(&results, "Robots Meta Tag").pass);
        assert!(!result(&results, "Character Set (UTF-8)").pass);
        assert!(result(&results, "Character Set (UTF-8)").description.contains("found: \"none\""));
    }
}
