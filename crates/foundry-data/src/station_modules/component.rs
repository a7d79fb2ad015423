//! Component documents: cargo bays and weapon mounts of a module.

use std::cell::RefCell;

use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use tracing::{debug, warn};

use super::macro_file::cargo_property;
use super::{ModuleSources, Mounts, Property, StationModule};
use crate::loader::parse_document;
use crate::scratch::ScratchValue;

/// What a component document contributes to the modules built on it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentInfo {
    pub id: String,
    pub cargo: Option<Property>,
    pub mounts: Mounts,
}

impl ComponentInfo {
    pub fn apply(&self, module: &mut StationModule) {
        if let Some(cargo) = &self.cargo {
            module.set_property(cargo.clone());
        }
        self.mounts.apply(module);
    }
}

pub(super) fn load_component(sources: &ModuleSources<'_>, component_id: &str) -> Option<ComponentInfo> {
    let Some(path) = sources.components.document(component_id) else {
        warn!("component '{component_id}' is not in the component index");
        return None;
    };
    let info = RefCell::new(ComponentInfo {
        id: component_id.to_string(),
        ..ComponentInfo::default()
    });
    let mut loader = XmlLoader::new();
    if let Err(e) = parse_document(sources.vfs, &path, &mut loader, ComponentContext::Root(&info)) {
        warn!("component '{component_id}' skipped: {e}");
        return None;
    }
    drop(loader);

    let info = info.into_inner();
    debug!(id = %info.id, cargo = ?info.cargo, mounts = ?info.mounts, "component");
    Some(info)
}

enum ComponentContext<'a> {
    Root(&'a RefCell<ComponentInfo>),
    Components(&'a RefCell<ComponentInfo>),
    Component(&'a RefCell<ComponentInfo>),
    Properties(&'a RefCell<ComponentInfo>),
    Connections(&'a RefCell<ComponentInfo>),
    Skip,
}

impl Context for ComponentContext<'_> {
    type Value = ScratchValue;

    fn skip() -> Self {
        ComponentContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        let next = match self {
            ComponentContext::Root(c) if name == "components" => ComponentContext::Components(*c),
            ComponentContext::Components(c) if name == "component" => {
                if attrs.get("name") == Some(c.borrow().id.as_str()) {
                    ComponentContext::Component(*c)
                } else {
                    ComponentContext::Skip
                }
            }
            ComponentContext::Component(c) => match name {
                "properties" => ComponentContext::Properties(*c),
                "connections" => ComponentContext::Connections(*c),
                _ => ComponentContext::Skip,
            },
            ComponentContext::Properties(c) if name == "cargo" => {
                if let Some(cargo) = cargo_property(attrs) {
                    c.borrow_mut().cargo = Some(cargo);
                }
                ComponentContext::Skip
            }
            ComponentContext::Connections(c) if name == "connection" => {
                let tags: Vec<&str> = attrs.words("tags").collect();
                let turret = tags.contains(&"turret");
                if turret || tags.contains(&"shield") {
                    let size = tags
                        .iter()
                        .find(|t| matches!(**t, "medium" | "large"))
                        .copied()
                        .unwrap_or_default();
                    c.borrow_mut().mounts.add(turret, size);
                }
                ComponentContext::Skip
            }
            _ => ComponentContext::Skip,
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
    use crate::station_modules::{ModuleClass, PropertyType};
    use crate::test_utils::{DEFENCE_COMPONENT, MemoryVfs, PRODUCTION_COMPONENT, STORAGE_COMPONENT};
    use crate::texts::TextStore;
    use crate::wares::{TransportType, WareGraph};

    fn load(document: &str, id: &str) -> Option<ComponentInfo> {
        let vfs = MemoryVfs::new().with_file("/c/component.xml", document);
        let mut components = AssetIndex::default();
        components.insert(id, "c/component");
        let sources = ModuleSources {
            vfs: &vfs,
            macros: &AssetIndex::default(),
            components: &components,
            texts: Arc::new(TextStore::default()),
            wares: Arc::new(WareGraph::default()),
        };
        load_component(&sources, id)
    }

    #[test]
    fn storage_cargo() {
        let info = load(STORAGE_COMPONENT, "storage_arg_l_container_01").unwrap();
        assert_eq!(
            info.cargo,
            Some(Property::HasCargo {
                cargo_type: TransportType::Container,
                capacity: 1_000_000
            })
        );
        assert_eq!(info.mounts, Mounts::default());
    }

    #[test]
    fn mounts_from_connection_tags() {
        let info = load(PRODUCTION_COMPONENT, "prod_gen_energycells").unwrap();
        assert_eq!(info.mounts.m_turrets, 1);
        assert_eq!(info.mounts.m_shields, 1);

        let info = load(DEFENCE_COMPONENT, "defence_arg_disc_01").unwrap();
        assert_eq!(info.mounts.l_turrets, 2);
        assert_eq!(info.mounts.m_turrets, 0);
    }

    #[test]
    fn other_components_in_the_document_are_ignored() {
        let info = load(STORAGE_COMPONENT, "unrelated").unwrap();
        assert_eq!(info.cargo, None);
    }

    #[test]
    fn apply_never_adds_zero_counts() {
        let info = load(DEFENCE_COMPONENT, "defence_arg_disc_01").unwrap();
        let mut module = StationModule::new("m", ModuleClass::DefenceModule);
        module.set_property(Property::HasMTurret { count: 3 });
        info.apply(&mut module);
        assert_eq!(module.property(PropertyType::MTurret).and_then(Property::count), Some(3));
        assert_eq!(module.property(PropertyType::LTurret).and_then(Property::count), Some(2));
        assert!(!module.has(PropertyType::MShield));
        assert!(!module.has(PropertyType::Cargo));
    }

    #[test]
    fn unresolved_or_broken_component() {
        assert!(load("<components><component", "x").is_none());
        let vfs = MemoryVfs::new();
        let index = AssetIndex::default();
        let sources = ModuleSources {
            vfs: &vfs,
            macros: &index,
            components: &index,
            texts: Arc::new(TextStore::default()),
            wares: Arc::new(WareGraph::default()),
        };
        assert!(load_component(&sources, "nope").is_none());
    }
}
