//! PDF output tests: documents go in as JSON, PDF bytes come out.

use std::io::Cursor;

use base64::Engine;
use quire::{render_json, Document, QuireError};

// ─── Helpers ────────────────────────────────────────────────────

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(contains(bytes, b"%%EOF"), "Missing %%EOF marker");
    assert!(contains(bytes, b"xref"), "Missing xref table");
    assert!(contains(bytes, b"trailer"), "Missing trailer");
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Inflate every compressed stream and join the results.
fn inflated_streams(bytes: &[u8]) -> String {
    let mut out = String::new();
    let mut rest = bytes;
    while let Some(start) = find(rest, b"stream\n") {
        let body = &rest[start + 7..];
        let Some(end) = find(body, b"\nendstream") else {
            break;
        };
        if let Ok(raw) = miniz_oxide::inflate::decompress_to_vec_zlib(&body[..end]) {
            out.push_str(&String::from_utf8_lossy(&raw));
        }
        rest = &body[end + b"\nendstream".len()..];
    }
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn document_json(elements: &str) -> String {
    format!(
        r##"{{
            "title": "Test",
            "pageSize": "A5",
            "pagePadding": {{ "top": 10, "right": 10, "bottom": 10, "left": 10 }},
            "areas": [
                {{ "id": "Body", "availability": "Global",
                   "position": {{ "x": 0, "y": 15 }}, "size": {{ "width": 128, "height": 160 }} }},
                {{ "id": "Header", "availability": "Global",
                   "position": {{ "x": 0, "y": 0 }}, "size": {{ "width": 128, "height": 10 }} }}
            ],
            "styles": [
                {{ "id": "Heading", "fontSize": 16, "decoration": "Bold", "blockPadding": 3 }},
                {{ "id": "Quote", "fontFamily": "Courier", "color": "#336699", "alignment": "Right" }}
            ],
            "elements": [{elements}]
        }}"##
    )
}

fn png_base64(width: u32, height: u32) -> String {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([200, 40, 40]),
    ));
    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .unwrap();
    base64::engine::general_purpose::STANDARD.encode(png.into_inner())
}

// ─── Output ─────────────────────────────────────────────────────

#[test]
fn single_paragraph_renders_one_page() {
    let json = document_json(
        r#"{ "area": "Body", "type": "TextBlock", "text": "Hello, World!" }"#,
    );
    let pdf = render_json(&json).unwrap();
    assert_valid_pdf(&pdf);
    assert!(contains(&pdf, b"/Count 1"));
    assert!(contains(&pdf, b"/Title (Test)"));
    assert!(inflated_streams(&pdf).contains("(Hello, World!) Tj"));
}

#[test]
fn long_document_spans_several_pages() {
    let paragraph = "The quick brown fox jumps over the lazy dog. ".repeat(12);
    let elements: Vec<String> = (0..30)
        .map(|_| format!(r#"{{ "area": "Body", "type": "TextBlock", "text": "{paragraph}" }}"#))
        .collect();
    let pdf = render_json(&document_json(&elements.join(","))).unwrap();
    assert_valid_pdf(&pdf);
    assert!(!contains(&pdf, b"/Count 1 "));
    assert!(!contains(&pdf, b"/Count 0"));
}

#[test]
fn empty_document_is_still_a_valid_file() {
    let pdf = render_json(&document_json("")).unwrap();
    assert_valid_pdf(&pdf);
    assert!(contains(&pdf, b"/Count 0"));
}

#[test]
fn styles_select_fonts_and_colours() {
    let json = document_json(
        r#"
        { "area": "Body", "style": "Heading", "type": "ChapterHeading", "text": "Overview" },
        { "area": "Body", "style": "Quote", "type": "TextBlock", "text": "quoted" }
        "#,
    );
    let pdf = render_json(&json).unwrap();
    assert_valid_pdf(&pdf);
    assert!(contains(&pdf, b"/BaseFont /Helvetica-Bold"));
    assert!(contains(&pdf, b"/BaseFont /Courier"));
    let content = inflated_streams(&pdf);
    assert!(content.contains("(1 Overview) Tj"));
    assert!(content.contains("(quoted) Tj"));
    assert!(content.contains("0.200 0.400 0.600 rg"));
}

#[test]
fn page_numbers_and_repeating_header() {
    let paragraph = "Lorem ipsum dolor sit amet. ".repeat(20);
    let mut elements = vec![
        r#"{ "area": "Header", "repeating": true, "type": "PageNumberPlaceholder",
             "format": "Page {page} of {pages}" }"#
            .to_string(),
    ];
    elements.extend(
        (0..25).map(|_| format!(r#"{{ "area": "Body", "type": "TextBlock", "text": "{paragraph}" }}"#)),
    );
    let pdf = render_json(&document_json(&elements.join(","))).unwrap();
    assert_valid_pdf(&pdf);

    let content = inflated_streams(&pdf);
    let pages = content.matches("(Page ").count();
    assert!(pages > 1);
    assert!(content.contains(&format!("(Page 1 of {pages}) Tj")));
    assert!(content.contains(&format!("(Page {pages} of {pages}) Tj")));
}

#[test]
fn images_tables_and_shapes_render() {
    let json = format!(
        r#"{{
            "title": "Shapes",
            "areas": [{{ "id": "Body", "availability": "Global",
                         "position": {{ "x": 20, "y": 20 }}, "size": {{ "width": 170, "height": 250 }} }}],
            "resources": [{{ "id": "dot", "data": "{}" }}],
            "elements": [
                {{ "area": "Body", "type": "Image", "resource": "dot" }},
                {{ "area": "Body", "type": "Line", "from": {{ "x": 0, "y": 0 }}, "to": {{ "x": 170, "y": 0 }} }},
                {{ "area": "Body", "type": "Rectangle", "size": {{ "width": 40, "height": 20 }} }},
                {{ "area": "Body", "type": "Table", "borders": true, "rows": [
                    {{ "cells": [
                        {{ "elements": [{{ "area": "", "type": "TextBlock", "text": "Name" }}] }},
                        {{ "elements": [{{ "area": "", "type": "TextBlock", "text": "Value" }}] }}
                    ] }}
                ] }},
                {{ "area": "Body", "type": "BulletList", "items": ["first", "second"] }}
            ]
        }}"#,
        png_base64(8, 4)
    );
    let pdf = render_json(&json).unwrap();
    assert_valid_pdf(&pdf);
    assert!(contains(&pdf, b"/Subtype /Image"));

    let content = inflated_streams(&pdf);
    assert!(content.contains(" Do"));
    assert!(content.contains(" re\nS"));
    assert!(content.contains("(Name) Tj"));
    assert!(content.contains("(Value) Tj"));
    assert!(content.contains("(first) Tj"));
}

// ─── Input errors ───────────────────────────────────────────────

#[test]
fn duplicate_area_ids_are_rejected() {
    let json = r#"{
        "areas": [
            { "id": "Body", "availability": "Global",
              "position": { "x": 0, "y": 0 }, "size": { "width": 10, "height": 10 } },
            { "id": "Body", "availability": "Global",
              "position": { "x": 0, "y": 20 }, "size": { "width": 10, "height": 10 } }
        ]
    }"#;
    assert!(matches!(
        Document::from_json(json),
        Err(QuireError::DuplicateIdentifier { kind: "area", .. })
    ));
}

#[test]
fn malformed_json_is_an_error() {
    assert!(render_json("{ not json").is_err());
}
