//! Values shared with every context of a parse through the loader's scratch
//! store.

use std::sync::Arc;

use foundry_xml::Scratch;

use crate::texts::TextStore;
use crate::wares::WareGraph;

pub const TEXTS_KEY: &str = "texts";
pub const WARES_KEY: &str = "wares";

/// Tagged value kept in a [`Scratch`] during catalog loading.
#[derive(Clone)]
pub enum ScratchValue {
    Texts(Arc<TextStore>),
    Wares(Arc<WareGraph>),
}

impl std::fmt::Debug for ScratchValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScratchValue::Texts(_) => f.write_str("Texts(..)"),
            ScratchValue::Wares(_) => f.write_str("Wares(..)"),
        }
    }
}

pub type CatalogScratch = Scratch<ScratchValue>;

/// Store the text table under [`TEXTS_KEY`].
pub fn set_texts(scratch: &mut CatalogScratch, texts: Arc<TextStore>) {
    scratch.insert(TEXTS_KEY, ScratchValue::Texts(texts));
}

/// Store the ware graph under [`WARES_KEY`].
pub fn set_wares(scratch: &mut CatalogScratch, wares: Arc<WareGraph>) {
    scratch.insert(WARES_KEY, ScratchValue::Wares(wares));
}

pub fn texts(scratch: &CatalogScratch) -> Option<&Arc<TextStore>> {
    match scratch.get(TEXTS_KEY) {
        Some(ScratchValue::Texts(texts)) => Some(texts),
        _ => None,
    }
}

pub fn wares(scratch: &CatalogScratch) -> Option<&Arc<WareGraph>> {
    match scratch.get(WARES_KEY) {
        Some(ScratchValue::Wares(wares)) => Some(wares),
        _ => None,
    }
}
