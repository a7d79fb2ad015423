//! Module macro documents.

use std::cell::RefCell;
use std::sync::Arc;

use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use tracing::warn;

use super::{ModuleClass, ModuleSources, Mounts, Property, StationModule};
use crate::loader::parse_document;
use crate::scratch::{self, CatalogScratch, ScratchValue};
use crate::texts::TextId;
use crate::wares::{DEFAULT_METHOD, ProductionInfo, TransportType, WORKUNIT_BUSY};

/// Sets whose members the player may build.
const PLAYER_SETS: [&str; 2] = ["factory", "headquarters_player"];

/// A module record under construction, plus what the later passes need.
#[derive(Debug, Clone)]
pub struct MacroDraft {
    pub module: StationModule,
    pub mounts: Mounts,
    /// Connection macro ids, one per connection (duplicates kept).
    pub connection_macros: Vec<String>,
    /// Whether the document defined the requested macro at all.
    pub found: bool,
}

impl MacroDraft {
    pub fn new(macro_id: &str, class_hint: ModuleClass) -> Self {
        Self {
            module: StationModule::new(macro_id, class_hint),
            mounts: Mounts::default(),
            connection_macros: Vec::new(),
            found: false,
        }
    }
}

/// Parse the macro document of `macro_id`. Returns `None` (after logging)
/// when the macro can't be resolved, parsed or found in its document.
pub(super) fn load_module_macro(
    sources: &ModuleSources<'_>,
    macro_id: &str,
    class_hint: ModuleClass,
) -> Option<MacroDraft> {
    let Some(path) = sources.macros.document(macro_id) else {
        warn!("module macro '{macro_id}' is not in the macro index, skipped");
        return None;
    };

    let draft = RefCell::new(MacroDraft::new(macro_id, class_hint));
    let mut loader = XmlLoader::new();
    scratch::set_texts(loader.scratch_mut(), Arc::clone(&sources.texts));
    scratch::set_wares(loader.scratch_mut(), Arc::clone(&sources.wares));
    let result = parse_document(sources.vfs, &path, &mut loader, MacroContext::Root(&draft));
    drop(loader);

    if let Err(e) = result {
        warn!("module macro '{macro_id}' skipped: {e}");
        return None;
    }
    let draft = draft.into_inner();
    if !draft.found {
        warn!("{path} does not define macro '{macro_id}', skipped");
        return None;
    }
    Some(draft)
}

enum MacroContext<'a> {
    Root(&'a RefCell<MacroDraft>),
    Macros(&'a RefCell<MacroDraft>),
    Macro(&'a RefCell<MacroDraft>),
    Properties(&'a RefCell<MacroDraft>),
    Build(&'a RefCell<MacroDraft>),
    Sets(&'a RefCell<MacroDraft>),
    Production(&'a RefCell<MacroDraft>),
    Connections(&'a RefCell<MacroDraft>),
    Connection(&'a RefCell<MacroDraft>),
    Skip,
}

impl Context for MacroContext<'_> {
    type Value = ScratchValue;

    fn skip() -> Self {
        MacroContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        let next = match self {
            MacroContext::Root(d) if name == "macros" => MacroContext::Macros(*d),
            MacroContext::Macros(d) if name == "macro" => {
                let mut draft = d.borrow_mut();
                if attrs.get("name") != Some(draft.module.macro_id.as_str()) {
                    MacroContext::Skip
                } else {
                    draft.found = true;
                    if let Some(class) = attrs.get("class").and_then(ModuleClass::from_class_attr) {
                        draft.module.class = class;
                    }
                    MacroContext::Macro(*d)
                }
            }
            MacroContext::Macro(d) => match name {
                "component" => {
                    if let Some(component) = attrs.get("ref") {
                        d.borrow_mut().module.component = component.to_string();
                    }
                    MacroContext::Skip
                }
                "properties" => MacroContext::Properties(*d),
                "build" => MacroContext::Build(*d),
                "production" => {
                    if let Some(product) = attrs.words("wares").next() {
                        set_product(cursor.scratch(), &mut d.borrow_mut(), product, DEFAULT_METHOD);
                    }
                    MacroContext::Production(*d)
                }
                "connections" => MacroContext::Connections(*d),
                _ => MacroContext::Skip,
            },
            MacroContext::Properties(d) => {
                module_property(cursor.scratch(), &mut d.borrow_mut(), name, attrs);
                MacroContext::Skip
            }
            MacroContext::Build(d) if name == "sets" => MacroContext::Sets(*d),
            MacroContext::Sets(d) if name == "set" => {
                if attrs.get("ref").is_some_and(|set| PLAYER_SETS.contains(&set)) {
                    d.borrow_mut().module.player_buildable = true;
                }
                MacroContext::Skip
            }
            MacroContext::Production(d) if name == "queue" => {
                if let Some(product) = attrs.get("ware") {
                    let method = attrs.get("method").unwrap_or(DEFAULT_METHOD);
                    set_product(cursor.scratch(), &mut d.borrow_mut(), product, method);
                }
                MacroContext::Skip
            }
            MacroContext::Connections(d) if name == "connection" => MacroContext::Connection(*d),
            MacroContext::Connection(d) if name == "macro" => {
                if let Some(connection_macro) = attrs.get("ref") {
                    d.borrow_mut().connection_macros.push(connection_macro.to_string());
                }
                MacroContext::Skip
            }
            _ => MacroContext::Skip,
        };
        cursor.push(next);
        Ok(())
    }
}

/// Apply one child of a module macro's `<properties>`.
fn module_property(scratch: &CatalogScratch, draft: &mut MacroDraft, name: &str, attrs: &Attributes) {
    let module = &mut draft.module;
    match name {
        "identification" => {
            module.name = TextId::from_attr(attrs.get("name"));
            module.description = TextId::from_attr(attrs.get("description"));
            let races: Vec<_> = attrs.words("makerrace").map(str::to_string).collect();
            if !races.is_empty() {
                module.race_limited = true;
                module.races.extend(races);
            }
        }
        "hull" => module.hull = attrs.parse("max").unwrap_or(module.hull),
        "explosiondamage" => {
            module.explosion_damage = attrs.parse("value").unwrap_or(module.explosion_damage)
        }
        "workforce" => {
            if let Some(workforce) = attrs.parse("max") {
                module.set_property(Property::RequireWorkforce { workforce });
            }
            if let Some(workforce) = attrs.parse("capacity") {
                let race = attrs.get("race").unwrap_or(DEFAULT_METHOD);
                let supply_info = production_info(scratch, WORKUNIT_BUSY, race);
                module.set_property(Property::SupplyWorkforce {
                    workforce,
                    supply_info,
                });
            }
        }
        "turret" => {
            if let Some(size) = attrs.get("size") {
                draft.mounts.add(true, size);
            }
        }
        "shield" => {
            if let Some(size) = attrs.get("size") {
                draft.mounts.add(false, size);
            }
        }
        "cargo" => {
            if let Some(property) = cargo_property(attrs) {
                module.set_property(property);
            }
        }
        _ => {}
    }
}

fn set_product(scratch: &CatalogScratch, draft: &mut MacroDraft, product: &str, method: &str) {
    draft.module.set_property(Property::SupplyProduct {
        product: product.to_string(),
        production: production_info(scratch, product, method),
    });
}

/// Production `method` of `ware`, falling back to the default method.
fn production_info(scratch: &CatalogScratch, ware: &str, method: &str) -> Option<ProductionInfo> {
    let wares = scratch::wares(scratch)?;
    let texts = scratch::texts(scratch).map(Arc::as_ref);
    wares.ware(ware, texts).production(method).cloned()
}

/// `<cargo max tags>` as a cargo property; `None` without a usable capacity.
pub(super) fn cargo_property(attrs: &Attributes) -> Option<Property> {
    let capacity = attrs.parse::<u64>("max").filter(|c| *c > 0)?;
    let cargo_type = attrs
        .words("tags")
        .find_map(TransportType::from_tag)
        .unwrap_or(TransportType::Unknown);
    Some(Property::HasCargo {
        cargo_type,
        capacity,
    })
}
