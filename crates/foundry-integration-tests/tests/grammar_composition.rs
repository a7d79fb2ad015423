//! Integration test: grammars written against the public engine API.
//!
//! A downstream grammar composes with the catalog's scratch values the same
//! way the built-in tables do: it reads the text store from the scratch
//! while it walks a document of its own.

use std::cell::RefCell;
use std::sync::Arc;

use foundry_data::scratch::{self, CatalogScratch, ScratchValue};
use foundry_data::texts::{TextId, TextStore, parse_escape};
use foundry_data::test_utils;
use foundry_data::LoaderConfig;
use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use proptest::prelude::*;

/// Collects the resolved `name` of every `<item>`.
enum ItemContext<'a> {
    Root(&'a RefCell<Vec<String>>),
    Items(&'a RefCell<Vec<String>>),
    Skip,
}

impl Context for ItemContext<'_> {
    type Value = ScratchValue;

    fn skip() -> Self {
        ItemContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        let next = match self {
            ItemContext::Root(out) if name == "items" => ItemContext::Items(*out),
            ItemContext::Items(out) if name == "item" => {
                let id = TextId::from_attr(Some(attrs.require(name, "name")?));
                out.borrow_mut().push(resolve(cursor.scratch(), id));
                ItemContext::Skip
            }
            _ => ItemContext::Skip,
        };
        cursor.push(next);
        Ok(())
    }
}

fn resolve(scratch: &CatalogScratch, id: TextId) -> String {
    scratch::texts(scratch).map(|t| t.text(id)).unwrap_or_default()
}

fn fixture_texts() -> Arc<TextStore> {
    let vfs = test_utils::fixture_game();
    Arc::new(TextStore::load(&vfs, &LoaderConfig::default(), &|_| {}).unwrap())
}

#[test]
fn custom_grammar_reads_texts_from_scratch() {
    let out = RefCell::new(Vec::new());
    let mut loader = XmlLoader::new();
    scratch::set_texts(loader.scratch_mut(), fixture_texts());
    loader
        .parse_bytes(
            br#"<items><item name="{20201,101}"/><other/><item name="{20104,3}"/></items>"#,
            ItemContext::Root(&out),
        )
        .unwrap();
    assert_eq!(loader.depth(), 0);
    drop(loader);
    assert_eq!(out.into_inner(), vec!["Energy Cells", "Teladi"]);
}

#[test]
fn handler_rejection_aborts_only_that_document() {
    let out = RefCell::new(Vec::new());
    let mut loader = XmlLoader::new();
    scratch::set_texts(loader.scratch_mut(), fixture_texts());

    let err = loader
        .parse_bytes(
            br#"<items><item name="{20201,101}"/><item/><item name="{20201,201}"/></items>"#,
            ItemContext::Root(&out),
        )
        .unwrap_err();
    assert!(matches!(err, ParseError::Rejected { .. }));
    assert_eq!(loader.depth(), 0);

    // The same loader and scratch serve the next document.
    loader
        .parse_bytes(br#"<items><item name="{20201,201}"/></items>"#, ItemContext::Root(&out))
        .unwrap();
    drop(loader);
    assert_eq!(out.into_inner(), vec!["Energy Cells", "Hull Parts"]);
}

#[test]
fn malformed_documents_fail_without_panicking() {
    let out = RefCell::new(Vec::new());
    let mut loader = XmlLoader::new();
    for doc in [&b"<items><item></items>"[..], b"</items>", b"<items><item>"] {
        assert!(loader.parse_bytes(doc, ItemContext::Root(&out)).is_err());
        assert_eq!(loader.depth(), 0);
    }
}

#[test]
fn escape_examples() {
    assert_eq!(parse_escape("a\\nb"), "a\nb");
    assert_eq!(parse_escape("\\x41"), "A");
    assert_eq!(parse_escape("\\q"), "q");
}

proptest! {
    #[test]
    fn escape_leaves_plain_text_alone(s in "[^\\\\]*") {
        prop_assert_eq!(parse_escape(&s), s);
    }

    #[test]
    fn escaped_punctuation_passes_through(c in "[!-/:-@\\[\\]-`{-~]") {
        let input = format!("\\{c}");
        prop_assert_eq!(parse_escape(&input), c);
    }

    #[test]
    fn escape_never_grows_the_text(s in ".*") {
        prop_assert!(parse_escape(&s).chars().count() <= s.chars().count());
    }
}
