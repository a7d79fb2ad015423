//! Macro and component indices: asset id to document path.

use std::cell::RefCell;
use std::collections::HashMap;

use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::loader::{DataLoadError, parse_document, parse_optional_document};
use crate::scratch::ScratchValue;
use crate::vfs::{self, Vfs, normalize_path};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Macros,
    Components,
}

impl IndexKind {
    /// Path of the index document, relative to the game or extension root.
    pub fn relative_path(self) -> &'static str {
        match self {
            IndexKind::Macros => "index/macros.xml",
            IndexKind::Components => "index/components.xml",
        }
    }
}

/// Maps asset ids to absolute VFS paths (without the `.xml` suffix).
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    kind: Option<IndexKind>,
    entries: HashMap<String, String>,
}

impl AssetIndex {
    /// Load the base index (fatal when missing or malformed) and then every
    /// enabled extension's index, whose entries override the base ones.
    pub fn load(
        vfs: &dyn Vfs,
        kind: IndexKind,
        config: &LoaderConfig,
    ) -> Result<Self, DataLoadError> {
        let entries = RefCell::new(HashMap::new());
        let mut loader = XmlLoader::new();
        let base = normalize_path(kind.relative_path());
        parse_document(vfs, &base, &mut loader, IndexContext::Root(&entries))?;

        for ext in vfs::extension_names(vfs, config) {
            let path = vfs::extension_path(&ext, kind.relative_path());
            parse_optional_document(vfs, &path, &mut loader, IndexContext::Root(&entries));
        }
        drop(loader);

        let entries = entries.into_inner();
        info!("{kind:?} index: {} entries", entries.len());
        Ok(AssetIndex {
            kind: Some(kind),
            entries,
        })
    }

    pub fn kind(&self) -> Option<IndexKind> {
        self.kind
    }

    /// Path of the asset, without the document suffix.
    pub fn path(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    /// Path of the asset's XML document.
    pub fn document(&self, id: &str) -> Option<String> {
        self.path(id).map(|p| format!("{p}.xml"))
    }

    pub fn insert(&mut self, id: impl Into<String>, value: &str) {
        self.entries.insert(id.into(), normalize_path(value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

enum IndexContext<'a> {
    Root(&'a RefCell<HashMap<String, String>>),
    Index(&'a RefCell<HashMap<String, String>>),
    Skip,
}

impl Context for IndexContext<'_> {
    type Value = ScratchValue;

    fn skip() -> Self {
        IndexContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        match self {
            IndexContext::Root(entries) if name == "index" => {
                cursor.push(IndexContext::Index(*entries));
                return Ok(());
            }
            IndexContext::Index(entries) if name == "entry" => {
                if let (Some(id), Some(value)) = (attrs.get("name"), attrs.get("value")) {
                    let path = normalize_path(value);
                    debug!("index entry {id} = {path}");
                    entries.borrow_mut().insert(id.to_string(), path);
                }
            }
            _ => {}
        }
        cursor.skip();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryVfs;

    #[test]
    fn load_normalises_values() {
        let vfs = MemoryVfs::new().with_file(
            "/index/macros.xml",
            r#"<index>
                 <entry name="ship_arg_s_fighter_01_a_macro" value="assets\units\size_s\macros\ship_arg_s_fighter_01_a_macro"/>
                 <entry name="incomplete"/>
               </index>"#,
        );
        let index = AssetIndex::load(&vfs, IndexKind::Macros, &LoaderConfig::default()).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.path("ship_arg_s_fighter_01_a_macro"),
            Some("/assets/units/size_s/macros/ship_arg_s_fighter_01_a_macro")
        );
        assert_eq!(
            index.document("ship_arg_s_fighter_01_a_macro").as_deref(),
            Some("/assets/units/size_s/macros/ship_arg_s_fighter_01_a_macro.xml")
        );
        assert_eq!(index.path("incomplete"), None);
        assert_eq!(index.kind(), Some(IndexKind::Macros));
    }

    #[test]
    fn extensions_override_base_entries() {
        let vfs = MemoryVfs::new()
            .with_file(
                "/index/components.xml",
                r#"<index><entry name="a" value="base\a"/><entry name="b" value="base\b"/></index>"#,
            )
            .with_file(
                "/extensions/mod/index/components.xml",
                r#"<index><entry name="b" value="extensions\mod\b"/><entry name="c" value="extensions\mod\c"/></index>"#,
            )
            .with_file("/extensions/broken/index/components.xml", "<index><entry>");
        let index = AssetIndex::load(&vfs, IndexKind::Components, &LoaderConfig::default()).unwrap();
        assert_eq!(index.path("a"), Some("/base/a"));
        assert_eq!(index.path("b"), Some("/extensions/mod/b"));
        assert_eq!(index.path("c"), Some("/extensions/mod/c"));
    }

    #[test]
    fn missing_or_malformed_base_is_fatal() {
        let result = AssetIndex::load(&MemoryVfs::new(), IndexKind::Macros, &LoaderConfig::default());
        assert!(matches!(result, Err(DataLoadError::MissingFile { .. })));

        let vfs = MemoryVfs::new().with_file("/index/macros.xml", "<index><entry></index>");
        let result = AssetIndex::load(&vfs, IndexKind::Macros, &LoaderConfig::default());
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));
    }

    #[test]
    fn elements_outside_index_are_ignored() {
        let vfs = MemoryVfs::new().with_file(
            "/index/macros.xml",
            r#"<other><entry name="x" value="y"/></other>"#,
        );
        let index = AssetIndex::load(&vfs, IndexKind::Macros, &LoaderConfig::default()).unwrap();
        assert!(index.is_empty());
    }
}
