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

use pagescope_core::default_analyzers;
use proptest::prelude::*;

fn build_markup(title: &str, description: Option<&str>, images: &[bool], headings: &[u8], body_text: &str) -> String {
    let mut head = format!("<title>{}</title>", title);
    if let Some(description) = description {
        head.push_str(&format!(r#"<meta name="description" content="{}">"#, description));
    }

    let mut body = String::new();
    for level in headings {
        body.push_str(&format!("<h{0}>Heading</h{0}>", level));
    }
    for (i, has_alt) in images.iter().enumerate() {
        if *has_alt {
            body.push_str(&format!(r#"<img src="{}.png" alt="image {}">"#, i, i));
        } else {
            body.push_str(&format!(r#"<img src="{}.png">"#, i));
        }
    }
    body.push_str(&format!("<p>{}</p>", body_text));

    format!("<html><head>{}</head><body>{}</body></html>", head, body)
}

proptest! {
    #[test]
    fn static_analyzers_are_idempotent(
        title in "[a-zA-Z0-9 ]{0,80}",
        description in proptest::option::of("[a-zA-Z ]{0,200}"),
        images in proptest::collection::vec(any::<bool>(), 0..6),
        headings in proptest::collection::vec(1u8..=6, 0..10),
        body_text in "[a-z ]{0,300}",
    ) {
        let markup = build_markup(&title, description.as_deref(), &images, &headings, &body_text);

        for analyzer in default_analyzers() {
            let first = analyzer.analyze_markup(&markup);
            let second = analyzer.analyze_markup(&markup);
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), analyzer.checks().len());
        }
    }

    #[test]
    fn missing_alt_count_is_exact(images in proptest::collection::vec(any::<bool>(), 1..8)) {
        let markup = build_markup("Title of page", None, &images, &[1], "text");
        let missing = images.iter().filter(|has_alt| !**has_alt).count();

        let results = default_analyzers()[1].analyze_markup(&markup);
        let check = results.iter().find(|r| r.title == "Images with Alt Attributes").unwrap();

        prop_assert_eq!(check.pass, missing == 0);
        if missing > 0 {
            let expected = format!("{} image(s)", missing);
            prop_assert!(check.description.starts_with(&expected));
        }
    }
}
