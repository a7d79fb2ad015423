#![no_main]
use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use libfuzzer_sys::fuzz_target;

enum Walk {
    Open,
    Skip,
}

impl Context for Walk {
    type Value = ();

    fn skip() -> Self {
        Walk::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        _name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        match self {
            Walk::Open if attrs.contains("skip") => cursor.skip(),
            _ => cursor.push(Walk::Open),
        }
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must never panic; Err is fine. The stack must be
    // empty again afterwards.
    let mut loader = XmlLoader::new();
    let _ = loader.parse_bytes(data, Walk::Open);
    assert_eq!(loader.depth(), 0);
});
