//! Station modules assembled from module groups, macros, connection macros
//! and components.
//!
//! # Pipeline
//!
//! 1. **Groups** -- `/libraries/modulegroups.xml` plus extension diffs give
//!    the macro ids of every module, grouped by a name hinting at the class.
//! 2. **Macros** -- each module macro yields the base record and the
//!    properties declared inline. Its `<connections>` name connection macros
//!    (docking bays, launch tubes) that are parsed next, and their bays are
//!    accumulated per size class before becoming properties.
//! 3. **Components** -- a temporary component id -> macro ids index rejoins
//!    each component document with the modules built on it, adding cargo,
//!    turret and shield properties. The index is dropped afterwards.
//!
//! An unresolvable macro, component or connection id is logged and only the
//! affected part of the record is left out.

mod component;
mod connection;
mod groups;
mod macro_file;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::index::AssetIndex;
use crate::loader::DataLoadError;
use crate::texts::{TextId, TextStore};
use crate::vfs::Vfs;
use crate::wares::{ProductionInfo, TransportType, WareGraph};

pub use component::ComponentInfo;
pub use connection::{DockSize, TmpDockingBayInfo};
pub use groups::{MODULE_GROUPS_PATH, ModuleGroups};
pub use macro_file::MacroDraft;

// ===========================================================================
// Records
// ===========================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ModuleClass {
    #[default]
    Unknown,
    BuildModule,
    ConnectionModule,
    DefenceModule,
    Dockarea,
    Habitation,
    Production,
    Storage,
    Processing,
    Welfare,
    Radar,
}

impl ModuleClass {
    /// Class from a macro's `class` attribute.
    pub fn from_class_attr(class: &str) -> Option<Self> {
        Some(match class {
            "buildmodule" => ModuleClass::BuildModule,
            "connectionmodule" => ModuleClass::ConnectionModule,
            "defencemodule" => ModuleClass::DefenceModule,
            "dockarea" => ModuleClass::Dockarea,
            "habitation" => ModuleClass::Habitation,
            "production" => ModuleClass::Production,
            "storage" => ModuleClass::Storage,
            "processingmodule" => ModuleClass::Processing,
            "welfaremodule" => ModuleClass::Welfare,
            "radar" => ModuleClass::Radar,
            _ => return None,
        })
    }

    /// Class implied by a module group name prefix.
    pub fn from_group_name(group: &str) -> Self {
        const PREFIXES: [(&str, ModuleClass); 11] = [
            ("buildmodule_", ModuleClass::BuildModule),
            ("struct_", ModuleClass::ConnectionModule),
            ("conn_", ModuleClass::ConnectionModule),
            ("def_", ModuleClass::DefenceModule),
            ("dock_", ModuleClass::Dockarea),
            ("pier_", ModuleClass::Dockarea),
            ("hab_", ModuleClass::Habitation),
            ("prod_", ModuleClass::Production),
            ("stor_", ModuleClass::Storage),
            ("proc_", ModuleClass::Processing),
            ("welfare_", ModuleClass::Welfare),
        ];
        if group.starts_with("radar_") {
            return ModuleClass::Radar;
        }
        PREFIXES
            .iter()
            .find(|(prefix, _)| group.starts_with(prefix))
            .map(|(_, class)| *class)
            .unwrap_or_default()
    }
}

/// Key of [`StationModule::properties`]; one property per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyType {
    MTurret,
    MShield,
    LTurret,
    LShield,
    SDock,
    SShipCargo,
    MDock,
    MShipCargo,
    LDock,
    XLDock,
    LXLDock,
    SLaunchTube,
    MLaunchTube,
    SupplyWorkforce,
    RequireWorkforce,
    SupplyProduct,
    Cargo,
}

/// A capability of a station module.
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    HasMTurret { count: u64 },
    HasMShield { count: u64 },
    HasLTurret { count: u64 },
    HasLShield { count: u64 },
    HasSDock { count: u64 },
    HasSShipCargo { capacity: u64 },
    HasMDock { count: u64 },
    HasMShipCargo { capacity: u64 },
    HasLDock { count: u64 },
    HasXLDock { count: u64 },
    HasLXLDock { count: u64 },
    HasSLaunchTube { count: u64 },
    HasMLaunchTube { count: u64 },
    SupplyWorkforce {
        workforce: u64,
        supply_info: Option<ProductionInfo>,
    },
    RequireWorkforce { workforce: u64 },
    SupplyProduct {
        product: String,
        production: Option<ProductionInfo>,
    },
    HasCargo {
        cargo_type: TransportType,
        capacity: u64,
    },
}

impl Property {
    pub fn property_type(&self) -> PropertyType {
        match self {
            Property::HasMTurret { .. } => PropertyType::MTurret,
            Property::HasMShield { .. } => PropertyType::MShield,
            Property::HasLTurret { .. } => PropertyType::LTurret,
            Property::HasLShield { .. } => PropertyType::LShield,
            Property::HasSDock { .. } => PropertyType::SDock,
            Property::HasSShipCargo { .. } => PropertyType::SShipCargo,
            Property::HasMDock { .. } => PropertyType::MDock,
            Property::HasMShipCargo { .. } => PropertyType::MShipCargo,
            Property::HasLDock { .. } => PropertyType::LDock,
            Property::HasXLDock { .. } => PropertyType::XLDock,
            Property::HasLXLDock { .. } => PropertyType::LXLDock,
            Property::HasSLaunchTube { .. } => PropertyType::SLaunchTube,
            Property::HasMLaunchTube { .. } => PropertyType::MLaunchTube,
            Property::SupplyWorkforce { .. } => PropertyType::SupplyWorkforce,
            Property::RequireWorkforce { .. } => PropertyType::RequireWorkforce,
            Property::SupplyProduct { .. } => PropertyType::SupplyProduct,
            Property::HasCargo { .. } => PropertyType::Cargo,
        }
    }

    /// Count of turrets, shields, bays or tubes; `None` for other kinds.
    pub fn count(&self) -> Option<u64> {
        match self {
            Property::HasMTurret { count }
            | Property::HasMShield { count }
            | Property::HasLTurret { count }
            | Property::HasLShield { count }
            | Property::HasSDock { count }
            | Property::HasMDock { count }
            | Property::HasLDock { count }
            | Property::HasXLDock { count }
            | Property::HasLXLDock { count }
            | Property::HasSLaunchTube { count }
            | Property::HasMLaunchTube { count } => Some(*count),
            _ => None,
        }
    }
}

/// Turret and shield mounts, by size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mounts {
    pub m_turrets: u64,
    pub l_turrets: u64,
    pub m_shields: u64,
    pub l_shields: u64,
}

impl Mounts {
    /// Count one mount from its size word (`M`/`L` or `medium`/`large`).
    pub fn add(&mut self, turret: bool, size: &str) {
        let slot = match (turret, size) {
            (true, "M" | "m" | "medium") => &mut self.m_turrets,
            (true, "L" | "l" | "large") => &mut self.l_turrets,
            (false, "M" | "m" | "medium") => &mut self.m_shields,
            (false, "L" | "l" | "large") => &mut self.l_shields,
            _ => return,
        };
        *slot += 1;
    }

    /// Write the non-zero counts as properties, replacing earlier ones.
    pub fn apply(&self, module: &mut StationModule) {
        let counts = [
            (self.m_turrets, Property::HasMTurret { count: self.m_turrets }),
            (self.l_turrets, Property::HasLTurret { count: self.l_turrets }),
            (self.m_shields, Property::HasMShield { count: self.m_shields }),
            (self.l_shields, Property::HasLShield { count: self.l_shields }),
        ];
        for (count, property) in counts {
            if count > 0 {
                module.set_property(property);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationModule {
    pub macro_id: String,
    pub component: String,
    pub name: TextId,
    pub description: TextId,
    pub class: ModuleClass,
    pub player_buildable: bool,
    pub race_limited: bool,
    pub races: BTreeSet<String>,
    pub hull: u64,
    pub explosion_damage: u64,
    pub properties: BTreeMap<PropertyType, Property>,
}

impl StationModule {
    pub fn new(macro_id: &str, class: ModuleClass) -> Self {
        Self {
            macro_id: macro_id.to_string(),
            component: String::new(),
            name: TextId::EMPTY,
            description: TextId::EMPTY,
            class,
            player_buildable: false,
            race_limited: false,
            races: BTreeSet::new(),
            hull: 0,
            explosion_damage: 0,
            properties: BTreeMap::new(),
        }
    }

    /// Insert `property`, replacing any property of the same type.
    pub fn set_property(&mut self, property: Property) {
        self.properties.insert(property.property_type(), property);
    }

    pub fn property(&self, kind: PropertyType) -> Option<&Property> {
        self.properties.get(&kind)
    }

    pub fn has(&self, kind: PropertyType) -> bool {
        self.properties.contains_key(&kind)
    }
}

// ===========================================================================
// Table
// ===========================================================================

/// Collaborators the assembler resolves ids through.
pub struct ModuleSources<'a> {
    pub vfs: &'a dyn Vfs,
    pub macros: &'a AssetIndex,
    pub components: &'a AssetIndex,
    pub texts: Arc<TextStore>,
    pub wares: Arc<WareGraph>,
}

/// Every station module, in discovery order, keyed by macro id.
#[derive(Debug, Clone, Default)]
pub struct StationModuleTable {
    modules: IndexMap<String, Arc<StationModule>>,
}

impl StationModuleTable {
    pub fn load(
        sources: &ModuleSources<'_>,
        config: &LoaderConfig,
        progress: &dyn Fn(&str),
    ) -> Result<Self, DataLoadError> {
        progress("Loading station modules");
        let groups = ModuleGroups::load(sources.vfs, config)?;

        // Macro pass.
        let mut modules: IndexMap<String, StationModule> = IndexMap::new();
        for (group, macro_id) in groups.selections() {
            let class_hint = ModuleClass::from_group_name(group);
            let Some(draft) = macro_file::load_module_macro(sources, macro_id, class_hint) else {
                continue;
            };
            let module = finish_draft(sources, draft);
            debug!(
                macro_id = %module.macro_id,
                class = ?module.class,
                properties = ?module.properties.keys().collect::<Vec<_>>(),
                "station module"
            );
            modules.insert(module.macro_id.clone(), module);
        }

        // Component pass.
        let mut component_index: IndexMap<String, Vec<String>> = IndexMap::new();
        for module in modules.values().filter(|m| !m.component.is_empty()) {
            component_index
                .entry(module.component.clone())
                .or_default()
                .push(module.macro_id.clone());
        }
        for (component_id, macro_ids) in &component_index {
            let Some(info) = component::load_component(sources, component_id) else {
                continue;
            };
            for macro_id in macro_ids {
                if let Some(module) = modules.get_mut(macro_id) {
                    info.apply(module);
                }
            }
        }
        drop(component_index);

        info!("loaded {} station modules", modules.len());
        Ok(Self {
            modules: modules
                .into_iter()
                .map(|(id, module)| (id, Arc::new(module)))
                .collect(),
        })
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<StationModule>> {
        self.modules.values()
    }

    pub fn module(&self, macro_id: &str) -> Option<&Arc<StationModule>> {
        self.modules.get(macro_id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Resolve a draft's connection macros and fold everything into the module.
fn finish_draft(sources: &ModuleSources<'_>, draft: MacroDraft) -> StationModule {
    let MacroDraft {
        mut module,
        mounts,
        connection_macros,
        ..
    } = draft;
    mounts.apply(&mut module);

    let mut bays: BTreeMap<DockSize, TmpDockingBayInfo> = BTreeMap::new();
    for connection_macro in &connection_macros {
        if let Some(bay) = connection::load_connection_macro(sources, connection_macro) {
            bays.entry(bay.size)
                .or_insert_with(|| TmpDockingBayInfo::new(bay.size))
                .add(bay.capacity);
        }
    }
    for info in bays.values() {
        for property in info.properties() {
            module.set_property(property);
        }
    }
    module
}

// ===========================================================================
// Tests
// ===========================================================================
