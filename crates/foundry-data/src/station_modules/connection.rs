//! Connection macros: docking bays and launch tubes of a module.

use std::cell::RefCell;

use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use tracing::{debug, warn};

use super::{ModuleSources, Property};
use crate::loader::parse_document;
use crate::scratch::ScratchValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DockSize {
    S,
    M,
    L,
    XL,
    /// A pier taking both L and XL ships.
    LXL,
    LaunchTubeS,
    LaunchTubeM,
}

impl DockSize {
    /// Size class of a `<docksize tags>` value.
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let tags: Vec<&str> = tags.into_iter().collect();
        let has = |tag: &str| tags.contains(&tag);
        let size = if has("docks_l") && has("docks_xl") {
            DockSize::LXL
        } else if has("docks_s") {
            DockSize::S
        } else if has("docks_m") {
            DockSize::M
        } else if has("docks_l") {
            DockSize::L
        } else if has("docks_xl") {
            DockSize::XL
        } else if has("launchtube_s") {
            DockSize::LaunchTubeS
        } else if has("launchtube_m") {
            DockSize::LaunchTubeM
        } else {
            return None;
        };
        Some(size)
    }
}

/// Bays of one size class seen on a module so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TmpDockingBayInfo {
    pub size: DockSize,
    pub count: u64,
    pub capacity: u64,
}

impl TmpDockingBayInfo {
    pub fn new(size: DockSize) -> Self {
        Self {
            size,
            count: 0,
            capacity: 0,
        }
    }

    pub fn add(&mut self, capacity: u64) {
        self.count += 1;
        self.capacity += capacity;
    }

    /// The properties this accumulator finalizes into.
    pub fn properties(&self) -> Vec<Property> {
        let count = self.count;
        if count == 0 {
            return Vec::new();
        }
        let mut properties = vec![match self.size {
            DockSize::S => Property::HasSDock { count },
            DockSize::M => Property::HasMDock { count },
            DockSize::L => Property::HasLDock { count },
            DockSize::XL => Property::HasXLDock { count },
            DockSize::LXL => Property::HasLXLDock { count },
            DockSize::LaunchTubeS => Property::HasSLaunchTube { count },
            DockSize::LaunchTubeM => Property::HasMLaunchTube { count },
        }];
        if self.capacity > 0 {
            match self.size {
                DockSize::S => properties.push(Property::HasSShipCargo {
                    capacity: self.capacity,
                }),
                DockSize::M => properties.push(Property::HasMShipCargo {
                    capacity: self.capacity,
                }),
                _ => {}
            }
        }
        properties
    }
}

/// One bay read from a connection macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Bay {
    pub size: DockSize,
    pub capacity: u64,
}

#[derive(Debug, Default)]
struct BayDraft {
    macro_id: String,
    size: Option<DockSize>,
    capacity: u64,
}

/// Read the bay declared by connection macro `macro_id`, or `None` (after
/// logging) when it can't be resolved or declares no dock size.
pub(super) fn load_connection_macro(sources: &ModuleSources<'_>, macro_id: &str) -> Option<Bay> {
    let Some(path) = sources.macros.document(macro_id) else {
        warn!("connection macro '{macro_id}' is not in the macro index");
        return None;
    };
    let draft = RefCell::new(BayDraft {
        macro_id: macro_id.to_string(),
        ..BayDraft::default()
    });
    let mut loader = XmlLoader::new();
    if let Err(e) = parse_document(sources.vfs, &path, &mut loader, BayContext::Root(&draft)) {
        warn!("connection macro '{macro_id}' skipped: {e}");
        return None;
    }
    drop(loader);

    let draft = draft.into_inner();
    match draft.size {
        Some(size) => Some(Bay {
            size,
            capacity: draft.capacity,
        }),
        None => {
            debug!("connection macro '{macro_id}' has no dock size");
            None
        }
    }
}

enum BayContext<'a> {
    Root(&'a RefCell<BayDraft>),
    Macros(&'a RefCell<BayDraft>),
    Macro(&'a RefCell<BayDraft>),
    Properties(&'a RefCell<BayDraft>),
    Skip,
}

impl Context for BayContext<'_> {
    type Value = ScratchValue;

    fn skip() -> Self {
        BayContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        let next = match self {
            BayContext::Root(d) if name == "macros" => BayContext::Macros(*d),
            BayContext::Macros(d) if name == "macro" => {
                if attrs.get("name") == Some(d.borrow().macro_id.as_str()) {
                    BayContext::Macro(*d)
                } else {
                    BayContext::Skip
                }
            }
            BayContext::Macro(d) if name == "properties" => BayContext::Properties(*d),
            BayContext::Properties(d) => {
                match name {
                    "docksize" => d.borrow_mut().size = DockSize::from_tags(attrs.words("tags")),
                    "dock" => {
                        if let Some(capacity) = attrs.parse("capacity") {
                            d.borrow_mut().capacity = capacity;
                        }
                    }
                    _ => {}
                }
                BayContext::Skip
            }
            _ => BayContext::Skip,
        };
        cursor.push(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::index::AssetIndex;
    use crate::test_utils::{DOCKING_BAY_M, DOCKING_BAY_S, MemoryVfs, PIER_L};
    use crate::texts::TextStore;
    use crate::wares::WareGraph;

    fn load(document: &str, macro_id: &str) -> Option<Bay> {
        let vfs = MemoryVfs::new().with_file("/bays/bay.xml", document);
        let mut macros = AssetIndex::default();
        macros.insert(macro_id, "bays/bay");
        let sources = ModuleSources {
            vfs: &vfs,
            macros: &macros,
            components: &AssetIndex::default(),
            texts: Arc::new(TextStore::default()),
            wares: Arc::new(WareGraph::default()),
        };
        load_connection_macro(&sources, macro_id)
    }

    #[test]
    fn size_from_tags() {
        assert_eq!(DockSize::from_tags(["docks_s"]), Some(DockSize::S));
        assert_eq!(DockSize::from_tags(["docks_xl", "docks_l"]), Some(DockSize::LXL));
        assert_eq!(DockSize::from_tags(["docks_xl"]), Some(DockSize::XL));
        assert_eq!(DockSize::from_tags(["launchtube_m"]), Some(DockSize::LaunchTubeM));
        assert_eq!(DockSize::from_tags(["standard"]), None);
        assert_eq!(DockSize::from_tags(std::iter::empty()), None);
    }

    #[test]
    fn fixture_bays() {
        assert_eq!(
            load(DOCKING_BAY_S, "dockingbay_arg_s_01_macro"),
            Some(Bay {
                size: DockSize::S,
                capacity: 4
            })
        );
        assert_eq!(
            load(DOCKING_BAY_M, "dockingbay_arg_m_01_macro").map(|b| b.size),
            Some(DockSize::M)
        );
        assert_eq!(
            load(PIER_L, "pier_arg_l_01_macro"),
            Some(Bay {
                size: DockSize::LXL,
                capacity: 0
            })
        );
    }

    #[test]
    fn non_bay_connections_are_ignored() {
        let doc = r#"<macros><macro name="light_macro" class="spotlight"><properties/></macro></macros>"#;
        assert_eq!(load(doc, "light_macro"), None);
        assert_eq!(load(DOCKING_BAY_S, "some_other_macro"), None);
        assert_eq!(load("<macros><macro", "light_macro"), None);
    }

    #[test]
    fn accumulator_finalizes_by_size() {
        let mut s = TmpDockingBayInfo::new(DockSize::S);
        s.add(4);
        s.add(4);
        assert_eq!(
            s.properties(),
            vec![
                Property::HasSDock { count: 2 },
                Property::HasSShipCargo { capacity: 8 }
            ]
        );

        let mut m = TmpDockingBayInfo::new(DockSize::M);
        m.add(0);
        assert_eq!(m.properties(), vec![Property::HasMDock { count: 1 }]);

        let mut l = TmpDockingBayInfo::new(DockSize::L);
        l.add(10);
        assert_eq!(l.properties(), vec![Property::HasLDock { count: 1 }]);

        assert!(TmpDockingBayInfo::new(DockSize::XL).properties().is_empty());
    }
}
