//! Wares, ware groups and their production methods.
//!
//! The graph is built from `/libraries/waregroups.xml`, then
//! `/libraries/wares.xml`, then each extension's `libraries/wares.xml` diff.
//! While loading, every ware is an `Rc<RefCell<Ware>>` so that the same
//! element handlers can fill a fresh record or patch an existing one. Once
//! loading is done the records are frozen into `Arc<Ware>`.
//!
//! Lookups never fail: an id that was never loaded gets a placeholder record
//! with a synthesized display name, cached so later lookups return the same
//! instance.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use indexmap::IndexMap;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::loader::{DataLoadError, parse_document, parse_optional_document};
use crate::scratch::{self, CatalogScratch, ScratchValue};
use crate::texts::{TextId, TextStore};
use crate::vfs::{self, Vfs};

pub const WARE_GROUPS_PATH: &str = "/libraries/waregroups.xml";
pub const WARES_PATH: &str = "/libraries/wares.xml";
const EXTENSION_WARES: &str = "libraries/wares.xml";

/// Ware exempt from attribute validation; its production methods are keyed
/// by race and describe workforce upkeep.
pub const WORKUNIT_BUSY: &str = "workunit_busy";

/// Production method used when a recipe or queue names none.
pub const DEFAULT_METHOD: &str = "default";

const REQUIRED_WARE_ATTRS: [&str; 6] = ["name", "description", "group", "transport", "volume", "tags"];

static WARE_SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)^/wares/ware\[@id=['"](\w+)['"]\]$"#).unwrap());

// ===========================================================================
// Records
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    Container,
    Liquid,
    Solid,
    Unknown,
}

impl TransportType {
    /// Parse a `transport` or cargo `tags` word.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "container" => Some(TransportType::Container),
            "liquid" => Some(TransportType::Liquid),
            "solid" => Some(TransportType::Solid),
            _ => None,
        }
    }
}

/// One input of a production method.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub ware: String,
    pub amount: u32,
}

/// A recipe producing `amount` of a ware every `time` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionInfo {
    pub ware: String,
    pub method: String,
    pub time: f64,
    pub amount: u32,
    pub work_effect: f64,
    pub resources: IndexMap<String, Resource>,
}

impl ProductionInfo {
    pub fn new(ware: &str, method: &str) -> Self {
        Self {
            ware: ware.to_string(),
            method: method.to_string(),
            time: 0.0,
            amount: 0,
            work_effect: 1.0,
            resources: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ware {
    pub id: String,
    pub name: TextId,
    pub description: TextId,
    pub group: String,
    pub transport: TransportType,
    pub volume: u32,
    pub tags: Vec<String>,
    pub min_price: u64,
    pub average_price: u64,
    pub max_price: u64,
    /// Production methods keyed by method name.
    pub productions: IndexMap<String, ProductionInfo>,
}

impl Ware {
    /// Minimal record: unknown transport, no group, prices of 1.
    pub fn minimal(id: &str, name: TextId) -> Self {
        Self {
            id: id.to_string(),
            name,
            description: TextId::EMPTY,
            group: String::new(),
            transport: TransportType::Unknown,
            volume: 0,
            tags: Vec::new(),
            min_price: 1,
            average_price: 1,
            max_price: 1,
            productions: IndexMap::new(),
        }
    }

    /// Production method `method`, or the default method when absent.
    pub fn production(&self, method: &str) -> Option<&ProductionInfo> {
        self.productions
            .get(method)
            .or_else(|| self.productions.get(DEFAULT_METHOD))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WareGroup {
    pub id: String,
    pub name: TextId,
    pub tags: Vec<String>,
}

// ===========================================================================
// Graph
// ===========================================================================

/// Every ware and ware group, in load order.
#[derive(Debug, Default)]
pub struct WareGraph {
    wares: RwLock<IndexMap<String, Arc<Ware>>>,
    groups: RwLock<IndexMap<String, Arc<WareGroup>>>,
    unknown_wares: AtomicUsize,
    unknown_groups: AtomicUsize,
}

impl WareGraph {
    /// Load ware groups, wares and extension diffs.
    ///
    /// The base group and ware files are mandatory. Extension files are
    /// best effort; a broken one is logged and skipped.
    pub fn load(
        vfs: &dyn Vfs,
        texts: Arc<TextStore>,
        config: &LoaderConfig,
        progress: &dyn Fn(&str),
    ) -> Result<Self, DataLoadError> {
        progress("Loading wares");
        let builder = RefCell::new(WareBuilder::default());
        let mut loader = XmlLoader::new();
        scratch::set_texts(loader.scratch_mut(), texts);

        parse_document(vfs, WARE_GROUPS_PATH, &mut loader, WareContext::GroupsRoot(&builder))?;
        parse_document(vfs, WARES_PATH, &mut loader, WareContext::WaresRoot(&builder))?;

        for ext in vfs::extension_names(vfs, config) {
            let path = vfs::extension_path(&ext, EXTENSION_WARES);
            if parse_optional_document(vfs, &path, &mut loader, WareContext::DiffRoot(&builder)) {
                debug!("applied ware diff {path}");
            }
        }
        drop(loader);

        let graph = builder.into_inner().finish();
        info!(
            "loaded {} wares in {} groups",
            graph.wares.read().len(),
            graph.groups.read().len()
        );
        Ok(graph)
    }

    /// Ware `id`, synthesizing a cached placeholder when it was never loaded.
    ///
    /// The placeholder's name is registered in `texts` when given. With
    /// `None` the placeholder is unnamed: its name is [`TextId::EMPTY`].
    pub fn ware(&self, id: &str, texts: Option<&TextStore>) -> Arc<Ware> {
        if let Some(ware) = self.wares.read().get(id) {
            return Arc::clone(ware);
        }
        let mut wares = self.wares.write();
        if let Some(ware) = wares.get(id) {
            return Arc::clone(ware);
        }
        let n = self.unknown_wares.fetch_add(1, Ordering::AcqRel);
        let name = texts
            .map(|t| t.add_text(&format!("UNKNOWN_WARE_{n}")))
            .unwrap_or(TextId::EMPTY);
        warn!("unknown ware '{id}', using placeholder");
        let ware = Arc::new(Ware::minimal(id, name));
        wares.insert(id.to_string(), Arc::clone(&ware));
        ware
    }

    /// Ware group `id`, synthesizing a cached placeholder when it was never
    /// loaded.
    ///
    /// As with [`WareGraph::ware`], passing `None` for `texts` leaves the
    /// placeholder unnamed ([`TextId::EMPTY`]).
    pub fn ware_group(&self, id: &str, texts: Option<&TextStore>) -> Arc<WareGroup> {
        if let Some(group) = self.groups.read().get(id) {
            return Arc::clone(group);
        }
        let mut groups = self.groups.write();
        if let Some(group) = groups.get(id) {
            return Arc::clone(group);
        }
        let n = self.unknown_groups.fetch_add(1, Ordering::AcqRel);
        let name = texts
            .map(|t| t.add_text(&format!("UNKNOWN_WARE_GROUP_{n}")))
            .unwrap_or(TextId::EMPTY);
        warn!("unknown ware group '{id}', using placeholder");
        let group = Arc::new(WareGroup {
            id: id.to_string(),
            name,
            tags: Vec::new(),
        });
        groups.insert(id.to_string(), Arc::clone(&group));
        group
    }

    /// Loaded ware `id`, without placeholder synthesis.
    pub fn get(&self, id: &str) -> Option<Arc<Ware>> {
        self.wares.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.wares.read().contains_key(id)
    }

    /// Snapshot of every ware, placeholders included.
    pub fn wares(&self) -> Vec<Arc<Ware>> {
        self.wares.read().values().cloned().collect()
    }

    pub fn ware_groups(&self) -> Vec<Arc<WareGroup>> {
        self.groups.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.wares.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.wares.read().is_empty()
    }
}

// ===========================================================================
// Builder
// ===========================================================================

#[derive(Default)]
pub struct WareBuilder {
    groups: IndexMap<String, WareGroup>,
    wares: IndexMap<String, Rc<RefCell<Ware>>>,
}

impl WareBuilder {
    fn finish(self) -> WareGraph {
        let groups = self
            .groups
            .into_iter()
            .map(|(id, group)| (id, Arc::new(group)))
            .collect();
        let wares = self
            .wares
            .into_iter()
            .map(|(id, ware)| {
                let ware = Rc::try_unwrap(ware)
                    .map(RefCell::into_inner)
                    .unwrap_or_else(|shared| shared.borrow().clone());
                (id, Arc::new(ware))
            })
            .collect();
        WareGraph {
            wares: RwLock::new(wares),
            groups: RwLock::new(groups),
            unknown_wares: AtomicUsize::new(0),
            unknown_groups: AtomicUsize::new(0),
        }
    }
}

// ===========================================================================
// Grammar
// ===========================================================================

/// Contexts of the ware group file, the ware file and extension diffs.
pub enum WareContext<'a> {
    GroupsRoot(&'a RefCell<WareBuilder>),
    Groups(&'a RefCell<WareBuilder>),
    WaresRoot(&'a RefCell<WareBuilder>),
    Wares(&'a RefCell<WareBuilder>),
    /// `ware` is shared with the builder; `patch` marks a diff target.
    Ware {
        ware: Rc<RefCell<Ware>>,
        patch: bool,
    },
    Production {
        ware: Rc<RefCell<Ware>>,
        method: String,
    },
    Primary {
        ware: Rc<RefCell<Ware>>,
        method: String,
    },
    Effects {
        ware: Rc<RefCell<Ware>>,
        method: String,
    },
    DiffRoot(&'a RefCell<WareBuilder>),
    Diff(&'a RefCell<WareBuilder>),
    Skip,
}

impl Context for WareContext<'_> {
    type Value = ScratchValue;

    fn skip() -> Self {
        WareContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        let next = match self {
            WareContext::GroupsRoot(b) if name == "groups" => WareContext::Groups(*b),
            WareContext::Groups(b) if name == "group" => {
                let group = WareGroup {
                    id: attrs.require(name, "id")?.to_string(),
                    name: TextId::from_attr(Some(attrs.require(name, "name")?)),
                    tags: attrs.words("tags").map(str::to_string).collect(),
                };
                debug!(id = %group.id, tags = ?group.tags, "ware group");
                b.borrow_mut().groups.insert(group.id.clone(), group);
                WareContext::Skip
            }
            WareContext::WaresRoot(b) if name == "wares" => WareContext::Wares(*b),
            WareContext::Wares(b) if name == "ware" => match new_ware(cursor.scratch(), attrs) {
                Some(ware) => {
                    let id = ware.id.clone();
                    let ware = Rc::new(RefCell::new(ware));
                    b.borrow_mut().wares.insert(id, Rc::clone(&ware));
                    WareContext::Ware { ware, patch: false }
                }
                None => WareContext::Skip,
            },
            WareContext::Ware { ware, .. } => match name {
                "price" => {
                    let mut w = ware.borrow_mut();
                    if let Some(v) = attrs.parse("min") {
                        w.min_price = v;
                    }
                    if let Some(v) = attrs.parse("average") {
                        w.average_price = v;
                    }
                    if let Some(v) = attrs.parse("max") {
                        w.max_price = v;
                    }
                    WareContext::Skip
                }
                "production" => {
                    let method = attrs.get("method").unwrap_or(DEFAULT_METHOD).to_string();
                    let mut w = ware.borrow_mut();
                    let mut info = ProductionInfo::new(&w.id, &method);
                    info.time = attrs.parse("time").unwrap_or(0.0);
                    info.amount = attrs.parse("amount").unwrap_or(0);
                    w.productions.insert(method.clone(), info);
                    WareContext::Production {
                        ware: Rc::clone(ware),
                        method,
                    }
                }
                _ => WareContext::Skip,
            },
            WareContext::Production { ware, method } => match name {
                "primary" => WareContext::Primary {
                    ware: Rc::clone(ware),
                    method: method.clone(),
                },
                "effects" => WareContext::Effects {
                    ware: Rc::clone(ware),
                    method: method.clone(),
                },
                _ => WareContext::Skip,
            },
            WareContext::Primary { ware, method } if name == "ware" => {
                if let Some(id) = attrs.get("ware") {
                    let resource = Resource {
                        ware: id.to_string(),
                        amount: attrs.parse("amount").unwrap_or(0),
                    };
                    if let Some(info) = ware.borrow_mut().productions.get_mut(method.as_str()) {
                        info.resources.insert(resource.ware.clone(), resource);
                    }
                }
                WareContext::Skip
            }
            WareContext::Effects { ware, method } if name == "effect" => {
                if attrs.get("type") == Some("work") {
                    if let Some(info) = ware.borrow_mut().productions.get_mut(method.as_str()) {
                        info.work_effect = attrs.parse("product").unwrap_or(info.work_effect);
                    }
                }
                WareContext::Skip
            }
            WareContext::DiffRoot(b) if name == "diff" => WareContext::Diff(*b),
            WareContext::Diff(b) => diff_target(*b, name, attrs),
            _ => WareContext::Skip,
        };
        cursor.push(next);
        Ok(())
    }

    fn on_end_element(&mut self, scratch: &CatalogScratch, name: &str) -> Result<(), ParseError> {
        if let WareContext::Ware { ware, patch } = self {
            let w = ware.borrow();
            let display_name = scratch::texts(scratch).map(|t| t.text(w.name)).unwrap_or_default();
            debug!(
                id = %w.id,
                name = %display_name,
                group = %w.group,
                transport = ?w.transport,
                volume = w.volume,
                prices = ?(w.min_price, w.average_price, w.max_price),
                productions = ?w.productions.keys().collect::<Vec<_>>(),
                patched = *patch,
                "</{name}>"
            );
        }
        Ok(())
    }
}

/// Build a ware from a `<ware>` element, or `None` when it must be skipped.
fn new_ware(scratch: &CatalogScratch, attrs: &Attributes) -> Option<Ware> {
    let id = attrs.get("id")?;

    if id == WORKUNIT_BUSY {
        let name = match attrs.get("name").and_then(TextId::parse) {
            Some(name) => name,
            None => scratch::texts(scratch)
                .map(|t| t.add_text(WORKUNIT_BUSY))
                .unwrap_or(TextId::EMPTY),
        };
        let mut ware = Ware::minimal(id, name);
        ware.volume = attrs.parse("volume").unwrap_or(0);
        ware.tags = attrs.words("tags").map(str::to_string).collect();
        return Some(ware);
    }

    if !attrs.contains_all(&REQUIRED_WARE_ATTRS) {
        warn!("ware '{id}' lacks required attributes, skipped");
        return None;
    }
    let transport_tag = attrs.get("transport").unwrap_or_default();
    let Some(transport) = TransportType::from_tag(transport_tag) else {
        warn!("ware '{id}' has unknown transport '{transport_tag}', skipped");
        return None;
    };

    Some(Ware {
        id: id.to_string(),
        name: TextId::from_attr(attrs.get("name")),
        description: TextId::from_attr(attrs.get("description")),
        group: attrs.get("group").unwrap_or_default().to_string(),
        transport,
        volume: attrs.parse("volume").unwrap_or(0),
        tags: attrs.words("tags").map(str::to_string).collect(),
        ..Ware::minimal(id, TextId::EMPTY)
    })
}

/// Context for the children of a diff operation.
fn diff_target<'a>(builder: &'a RefCell<WareBuilder>, op: &str, attrs: &Attributes) -> WareContext<'a> {
    let sel = attrs.get("sel").unwrap_or_default();
    if op != "add" {
        warn!("unsupported ware diff <{op} sel=\"{sel}\">, skipped");
        return WareContext::Skip;
    }
    if sel == "/wares" {
        return WareContext::Wares(builder);
    }
    let Some(id) = WARE_SELECTOR.captures(sel).map(|c| c[1].to_string()) else {
        warn!("unrecognized ware diff selector '{sel}', skipped");
        return WareContext::Skip;
    };
    match builder.borrow().wares.get(&id) {
        Some(ware) => WareContext::Ware {
            ware: Rc::clone(ware),
            patch: true,
        },
        None => {
            warn!("ware diff targets unknown ware '{id}', skipped");
            WareContext::Skip
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
