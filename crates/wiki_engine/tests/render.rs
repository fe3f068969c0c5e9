use pretty_assertions::assert_eq;
use wiki_engine::{
    render_document, sources_to_html, to_html, Activation, Block, GroundingSource, Inline,
    LinkTarget,
};

#[test]
fn eiffel_tower_article_has_one_navigation_control() {
    let doc = render_document("# Eiffel Tower\nA tower in [[Paris]].");

    assert_eq!(
        doc.blocks,
        vec![
            Block::Heading {
                level: 1,
                content: vec![Inline::Text("Eiffel Tower".to_string())],
            },
            Block::Paragraph(vec![
                Inline::Text("A tower in ".to_string()),
                Inline::Link {
                    target: LinkTarget::Wiki {
                        topic: "Paris".to_string()
                    },
                    content: vec![Inline::Text("Paris".to_string())],
                },
                Inline::Text(".".to_string()),
            ]),
        ]
    );

    let links = doc.links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].label, "Paris");
}

#[test]
fn activating_wiki_link_calls_navigate_with_decoded_label() {
    let doc = render_document("Visit [[Champ de Mars]] or [the site](https://toureiffel.paris).");
    let mut visited = Vec::new();

    let activation = doc.activate(0, |topic| visited.push(topic.to_string()));

    assert_eq!(activation, Activation::Navigated("Champ de Mars".to_string()));
    assert_eq!(visited, vec!["Champ de Mars".to_string()]);
}

#[test]
fn activating_external_link_does_not_navigate() {
    let doc = render_document("Visit [[Champ de Mars]] or [the site](https://toureiffel.paris).");
    let mut called = false;

    let activation = doc.activate(1, |_| called = true);

    assert_eq!(
        activation,
        Activation::OpenExternal("https://toureiffel.paris".to_string())
    );
    assert!(!called);
    assert_eq!(doc.activate(7, |_| called = true), Activation::Missing);
    assert!(!called);
}

#[test]
fn structure_covers_lists_quotes_and_emphasis() {
    let doc = render_document(
        "## History\n\n- Built for the [[1889 World's Fair]]\n- *Tallest* until 1930\n\n> A **famous** quote\n\n3. third\n4. fourth\n",
    );

    assert_eq!(doc.blocks.len(), 4);
    assert!(matches!(&doc.blocks[0], Block::Heading { level: 2, .. }));
    match &doc.blocks[1] {
        Block::List { start: None, items } => {
            assert_eq!(items.len(), 2);
            assert!(matches!(
                items[1].as_slice(),
                [Block::Paragraph(content)] if matches!(content[0], Inline::Emphasis(_))
            ));
        }
        other => panic!("expected bullet list, got {other:?}"),
    }
    assert!(matches!(&doc.blocks[2], Block::Quote(inner) if inner.len() == 1));
    assert!(matches!(&doc.blocks[3], Block::List { start: Some(3), .. }));
    assert_eq!(doc.links()[0].label, "1889 World's Fair");
}

#[test]
fn html_escapes_raw_markup() {
    let doc = render_document("<script>alert(1)</script>\n\nText with <b>tags</b> & [[A<b>]].");
    let html = to_html(&doc);

    assert!(!html.contains("<script"));
    assert!(!html.contains("<b>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(html.contains("data-topic=\"A&lt;b&gt;\""));
}

#[test]
fn html_wiki_link_is_a_button_and_external_link_opens_new_tab() {
    let doc = render_document("[[Paris]] and [docs](https://example.com/?a=1&b=2)");
    let html = to_html(&doc);

    assert!(html.contains(
        "<button type=\"button\" class=\"wiki-link\" data-topic=\"Paris\" title=\"Go to Paris\">Paris</button>"
    ));
    assert!(html.contains(
        "<a href=\"https://example.com/?a=1&amp;b=2\" target=\"_blank\" rel=\"noopener noreferrer\" class=\"external-link\">docs<span class=\"external-marker\" aria-hidden=\"true\">↗</span></a>"
    ));
    assert!(!html.contains("href=\"#wiki/"));
}

#[test]
fn script_scheme_links_render_as_text() {
    let doc = render_document("[click](javascript:alert(1)) me");

    assert!(doc.links().is_empty());
    assert_eq!(
        doc.blocks,
        vec![Block::Paragraph(vec![Inline::Text("click me".to_string())])]
    );
}

#[test]
fn obfuscated_script_schemes_render_as_text() {
    for markdown in [
        "[x](<java\tscript:alert(1)>)",
        "[x](<\u{1}javascript:alert(2)>)",
        "[x](JaVaScRiPt:alert(3))",
        "[x](data:text/html;base64,PHNjcmlwdD4=)",
        "[x](file:///etc/passwd)",
    ] {
        let doc = render_document(markdown);
        let html = to_html(&doc);

        assert!(doc.links().is_empty(), "{markdown:?} produced a link");
        assert!(!html.contains("<a "), "{markdown:?} rendered {html}");
        assert_eq!(html, "<p>x</p>", "{markdown:?}");
    }
}

#[test]
fn allowed_and_relative_destinations_stay_links() {
    assert_eq!(
        LinkTarget::classify("mailto:editor@example.com"),
        Some(LinkTarget::External {
            href: "mailto:editor@example.com".to_string()
        })
    );
    assert_eq!(
        LinkTarget::classify("/wiki/Special:Random"),
        Some(LinkTarget::External {
            href: "/wiki/Special:Random".to_string()
        })
    );
    assert_eq!(
        LinkTarget::classify(" ht\ttps://example.com/a\n"),
        Some(LinkTarget::External {
            href: "https://example.com/a".to_string()
        })
    );
    assert_eq!(
        LinkTarget::classify("\u{1}#wiki/Paris"),
        Some(LinkTarget::Wiki {
            topic: "Paris".to_string()
        })
    );
    assert_eq!(LinkTarget::classify("vbscript:msgbox(1)"), None);
}

#[test]
fn sources_footer_numbers_entries() {
    let html = sources_to_html(&[
        GroundingSource {
            title: "Wiki".to_string(),
            uri: "http://x".to_string(),
        },
        GroundingSource {
            title: "Bad".to_string(),
            uri: "javascript:void(0)".to_string(),
        },
    ]);

    assert!(html.contains("References &amp; Sources"));
    assert!(html.contains(">[1] Wiki</a>"));
    assert!(html.contains("<li>[2] Bad</li>"));
    assert_eq!(sources_to_html(&[]), "");
}

#[test]
fn partial_stream_text_still_renders() {
    // Mid-stream content may stop inside a link or emphasis.
    let doc = render_document("# Title\nSome *unfinished [[Par");
    assert_eq!(doc.blocks.len(), 2);
    assert!(doc.links().is_empty());
}
