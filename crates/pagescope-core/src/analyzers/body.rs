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

//! Content / body checks

use super::{Check, Evaluation, StaticAnalyzer, char_len};
use crate::document::PageDocument;
use crate::models::AnalyzerName;
use std::collections::BTreeSet;

const CONTENT_ACCESSIBILITY: &str = "On-Page Content / Accessibility";
const CONTENT: &str = "On-Page Content";
const ACCESSIBILITY: &str = "Accessibility";
const PERFORMANCE: &str = "Performance";

/// Body text must be strictly longer than this many characters
pub const MIN_BODY_TEXT: usize = 100;

const SEMANTIC_TAGS: [&str; 7] = ["main", "nav", "header", "footer", "article", "section", "aside"];

static CHECKS: &[Check] = &[
    Check {
        title: "Images with Alt Attributes",
        category: CONTENT_ACCESSIBILITY,
        evaluate: image_alt,
    },
    Check {
        title: "Sufficient Body Content",
        category: CONTENT,
        evaluate: body_content,
    },
    Check {
        title: "Heading Structure (H1-H6)",
        category: CONTENT_ACCESSIBILITY,
        evaluate: heading_structure,
    },
    Check {
        title: "Semantic HTML5 Structure",
        category: CONTENT_ACCESSIBILITY,
        evaluate: semantic_tags,
    },
    Check {
        title: "Basic ARIA & Keyboard Navigation Checks",
        category: ACCESSIBILITY,
        evaluate: aria_and_keyboard,
    },
    Check {
        title: "Script Loading",
        category: PERFORMANCE,
        evaluate: script_loading,
    },
    Check {
        title: "Internal Linking",
        category: CONTENT,
        evaluate: internal_links,
    },
];

/// Checks on the visible page content
#[derive(Debug, Default, Clone, Copy)]
pub struct BodyAnalyzer;

impl StaticAnalyzer for BodyAnalyzer {
    fn name(&self) -> AnalyzerName {
        AnalyzerName::Body
    }

    fn checks(&self) -> &'static [Check] {
        CHECKS
    }
}

fn image_alt(doc: &PageDocument) -> Evaluation {
    let missing = doc.select("img").iter().filter(|img| img.value().attr("alt").map(|alt| alt.trim().is_empty()).unwrap_or(true)).count();

    if missing == 0 {
        Evaluation::pass("All images have descriptive alt attributes.")
    } else {
        Evaluation::fail(format!("{} image(s) are missing alt attributes or have empty ones.", missing))
    }
}

fn body_content(doc: &PageDocument) -> Evaluation {
    let len = char_len(&doc.text("body"));
    if len > MIN_BODY_TEXT {
        Evaluation::pass(format!("Body contains substantial content ({} characters).", len))
    } else {
        Evaluation::fail(format!(
            "Body content appears to be minimal or missing ({} characters, at least {} expected).",
            len,
            MIN_BODY_TEXT + 1
        ))
    }
}

/// Single `<h1>`, and no level missing between two heading levels the page
/// uses. Gaps are reported in ascending level order; document order does not
/// matter.
fn heading_structure(doc: &PageDocument) -> Evaluation {
    let levels = doc.heading_levels();
    let mut issues = Vec::new();

    match levels.iter().filter(|&&level| level == 1).count() {
        0 => issues.push("Page is missing an <h1> tag.".to_string()),
        1 => {}
        n => issues.push(format!(
            "Page has multiple <h1> tags ({} found). A single <h1> is generally recommended for primary page title.",
            n
        )),
    }

    let present: BTreeSet<u8> = levels.into_iter().collect();
    let mut previous: Option<u8> = None;
    for &level in &present {
        if let Some(prev) = previous.filter(|&prev| level > prev + 1) {
            issues.push(format!(
                "Skipped heading level from h{} to h{}. Headings should follow a sequential, logical order.",
                prev, level
            ));
        }
        previous = Some(level);
    }

    if issues.is_empty() {
        Evaluation::pass("Heading tags follow a logical and sequential structure, with a single <h1>.")
    } else {
        Evaluation::fail(issues.join(" "))
    }
}

fn semantic_tags(doc: &PageDocument) -> Evaluation {
    let missing: Vec<String> = SEMANTIC_TAGS.iter().filter(|tag| !doc.exists(tag)).map(|tag| format!("<{}>", tag)).collect();

    if missing.is_empty() {
        Evaluation::pass("Common semantic HTML5 tags (main, nav, header, footer, article, section, aside) are present.")
    } else {
        Evaluation::fail(format!(
            "Potentially missing semantic HTML5 tags: {}. Consider using them to improve document outline and accessibility.",
            missing.join(", ")
        ))
    }
}

fn aria_and_keyboard(doc: &PageDocument) -> Evaluation {
    let mut issues = Vec::new();

    // Only the first positive tabindex is reported.
    let positive_tabindex = doc
        .select("body [tabindex]")
        .iter()
        .filter_map(|el| el.value().attr("tabindex").and_then(|t| t.trim().parse::<i32>().ok()))
        .find(|&t| t > 0);
    if let Some(tabindex) = positive_tabindex {
        issues.push(format!(
            "Element with tabindex=\"{}\" found. Custom tab order (tabindex > 0) can be problematic. Ensure logical keyboard navigation.",
            tabindex
        ));
    }

    if !doc.exists("[aria-label]") && !doc.exists("[aria-describedby]") {
        issues.push("Consider using `aria-label` or `aria-describedby` for interactive elements to provide accessible names/descriptions.".to_string());
    }
    if !doc.exists("main") && !doc.exists(r#"[role="main"]"#) {
        issues.push("Consider using `<main>` tag or `role=\"main\"` to identify the primary content area for assistive technologies.".to_string());
    }
    if !doc.exists("[aria-live]") {
        issues.push("Consider `aria-live` regions for dynamic content updates that screen readers should announce.".to_string());
    }

    if issues.is_empty() {
        Evaluation::pass("Basic ARIA attributes and tabindex usage appear reasonable.")
    } else {
        Evaluation::fail(issues.join(" "))
    }
}

fn script_loading(doc: &PageDocument) -> Evaluation {
    let scripts = doc.select("script[src]");
    if scripts.is_empty() {
        return Evaluation::pass("No external scripts found.");
    }

    let blocking = scripts.iter().filter(|s| s.value().attr("async").is_none() && s.value().attr("defer").is_none()).count();
    if blocking == 0 {
        Evaluation::pass(format!("All {} external script(s) use async or defer.", scripts.len()))
    } else {
        Evaluation::fail(format!("{} of {} external script(s) block rendering (no async or defer).", blocking, scripts.len()))
    }
}

fn internal_links(doc: &PageDocument) -> Evaluation {
    match doc.count("a[href]") {
        0 => Evaluation::fail("No anchor tags with href found."),
        n => Evaluation::pass(format!("Found {} anchor tag(s) with href.", n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckResult;

    fn result<'a>(results: &'a [CheckResult], title: &str) -> &'a CheckResult {
        results.iter().find(|r| r.title == title).unwrap_or_else(|| panic!("missing check {}", title))
    }

    fn headings(markup: &str) -> CheckResult {
        result(&BodyAnalyzer.analyze_markup(markup), "Heading Structure (H1-H6)").clone()
    }

    #[test]
    fn test_image_without_alt_is_counted() {
        let results = BodyAnalyzer.analyze_markup(r#"<body><img src="a.png"><img src="b.png" alt="  "><img src="c.png" alt="logo"></body>"#);
        let images = result(&results, "Images with Alt Attributes");
        assert!(!images.pass);
        assert_eq!(images.description, "2 image(s) are missing alt attributes or have empty ones.");
    }

    #[test]
    fn test_no_images_passes() {
        let results = BodyAnalyzer.analyze_markup("<p>text</p>");
        assert!(result(&results, "Images with Alt Attributes").pass);
    }

    #[test]
    fn test_sequential_headings_pass() {
        let check = headings("<h1>Title</h1><h2>Section</h2><h3>Sub</h3><h2>Next</h2>");
        assert!(check.pass, "{}", check.description);
    }

    #[test]
    fn test_levels_are_compared_by_presence_not_order() {
        let check = headings("<h1>a</h1><h2>b</h2><h3>c</h3><h2>d</h2><h4>e</h4>");
        assert!(check.pass, "{}", check.description);

        let check = headings("<h1>a</h1><h3>b</h3><h2>c</h2>");
        assert!(check.pass, "{}", check.description);
    }

    #[test]
    fn test_gap_is_reported_even_when_deeper_heading_comes_first() {
        let check = headings("<h3>a</h3><h1>b</h1>");
        assert!(!check.pass);
        assert_eq!(
            check.description,
            "Skipped heading level from h1 to h3. Headings should follow a sequential, logical order."
        );
    }

    #[test]
    fn test_gaps_are_reported_in_level_order() {
        let check = headings("<h1>a</h1><h5>b</h5><h1>c</h1><h3>d</h3><h5>e</h5>");
        assert!(!check.pass);

        let first = check.description.find("from h1 to h3").unwrap();
        let second = check.description.find("from h3 to h5").unwrap();
        assert!(first < second);
        assert_eq!(check.description.matches("Skipped heading level").count(), 2);
        assert!(check.description.contains("multiple <h1> tags (2 found)"));
    }

    #[test]
    fn test_missing_h1_reported() {
        let check = headings("<h2>a</h2><h3>b</h3>");
        assert!(!check.pass);
        assert_eq!(check.description, "Page is missing an <h1> tag.");
    }

    #[test]
    fn test_body_content_threshold() {
        let short = format!("<body><p>{}</p></body>", "a".repeat(100));
        assert!(!result(&BodyAnalyzer.analyze_markup(&short), "Sufficient Body Content").pass);

        let long = format!("<body><p>{}</p></body>", "a".repeat(101));
        assert!(result(&BodyAnalyzer.analyze_markup(&long), "Sufficient Body Content").pass);
    }

    #[test]
    fn test_semantic_tags_listed() {
        let results = BodyAnalyzer.analyze_markup("<header></header><main></main><footer></footer>");
        let semantic = result(&results, "Semantic HTML5 Structure");
        assert!(!semantic.pass);
        assert!(semantic.description.contains("<nav>, <article>, <section>, <aside>"));
    }

    #[test]
    fn test_aria_checks() {
        let good = r#"<body><main aria-label="content"><div aria-live="polite"></div><button tabindex="0">ok</button></main></body>"#;
        assert!(result(&BodyAnalyzer.analyze_markup(good), "Basic ARIA & Keyboard Navigation Checks").pass);

        let bad = r#"<body><div role="main" aria-describedby="x" aria-live="off"><a tabindex="3" href="/">x</a><a tabindex="5">y</a></div></body>"#;
        let check = result(&BodyAnalyzer.analyze_markup(bad), "Basic ARIA & Keyboard Navigation Checks").clone();
        assert!(!check.pass);
        assert!(check.description.contains("tabindex=\"3\""));
        assert!(!check.description.contains("tabindex=\"5\""));
    }

    #[test]
    fn test_script_loading() {
        let results = BodyAnalyzer.analyze_markup(r#"<script src="a.js" defer></script><script src="b.js"></script><script>inline()</script>"#);
        let scripts = result(&results, "Script Loading");
        assert!(!scripts.pass);
        assert_eq!(scripts.description, "1 of 2 external script(s) block rendering (no async or defer).");
    }
}
