//! Integration test: full catalog load without a UI.
//!
//! Loads the fixture game through `GameData` and checks the cross-table
//! behaviour: texts resolving through references, ware lookups that
//! synthesize placeholders, extension diffs merging into existing wares, and
//! station modules assembled from macros, connection macros and components.

use std::sync::Arc;

use foundry_data::station_modules::{ModuleClass, Property, PropertyType};
use foundry_data::test_utils::{self, MemoryVfs};
use foundry_data::wares::TransportType;
use foundry_data::{GameData, LoadStage, LoaderConfig};

fn load(vfs: MemoryVfs) -> GameData {
    GameData::load(Arc::new(vfs), &LoaderConfig::default(), &|_| {}).unwrap()
}

#[test]
fn texts_resolve_recursively_and_idempotently() {
    let data = load(test_utils::fixture_game());
    let description = data.text(20102, 2);
    assert_eq!(description, "Solar Power Plant produces Energy Cells.");
    for _ in 0..3 {
        assert_eq!(data.text(20102, 2), description);
    }
    assert_eq!(data.text(99999, 1), "");
}

#[test]
fn unknown_ware_is_stable_by_identity() {
    let data = load(test_utils::fixture_game());
    let first = data.ware("never_defined");
    let second = data.ware("never_defined");
    assert!(Arc::ptr_eq(&first, &second));
    assert!(data.wares().contains("never_defined"));

    let group = data.ware_group("never_defined_group");
    assert!(Arc::ptr_eq(&group, &data.ware_group("never_defined_group")));
    assert!(data.texts().text(group.name).starts_with("UNKNOWN_WARE_GROUP_"));
}

#[test]
fn extension_diff_merges_production_methods() {
    let mut vfs = test_utils::fixture_game();
    vfs.insert(
        "/extensions/ext_01/libraries/wares.xml",
        r#"<diff>
             <add sel="/wares/ware[@id='energycells']">
               <production time="30" amount="100" method="teladi">
                 <primary><ware ware="hullparts" amount="1"/></primary>
               </production>
             </add>
             <add sel="/wares">
               <ware id="modware" name="{20201,301}" description="{20201,301}" group="refined" transport="solid" volume="3" tags="solid"/>
             </add>
           </diff>"#,
    );
    let data = load(vfs);
    let cells = data.ware("energycells");
    assert!(cells.productions.contains_key("default"));
    assert_eq!(cells.productions["teladi"].resources["hullparts"].amount, 1);
    assert_eq!(cells.productions["default"].amount, 175);
    assert_eq!(data.ware("modware").transport, TransportType::Solid);
}

#[test]
fn minimal_ware_graph_end_to_end() {
    let vfs = test_utils::fixture_game()
        .with_file(
            "/libraries/waregroups.xml",
            r#"<groups><group id="g1" name="{1,1}"/></groups>"#,
        )
        .with_file(
            "/libraries/wares.xml",
            r#"<wares>
                 <ware id="w1" name="{1,2}" description="{1,3}" group="g1" transport="container" volume="10" tags="economy">
                   <production time="10" amount="1" method="m1">
                     <primary><ware ware="w2" amount="5"/></primary>
                   </production>
                 </ware>
               </wares>"#,
        );
    let data = load(vfs);
    assert_eq!(data.ware_group("g1").id, "g1");
    let w1 = data.ware("w1");
    assert_eq!(w1.transport, TransportType::Container);
    assert_eq!(w1.volume, 10);
    assert_eq!(w1.productions["m1"].resources["w2"].amount, 5);
}

#[test]
fn turret_declarations_become_counted_properties() {
    let data = load(test_utils::fixture_game());

    let defence = data.module("defence_arg_disc_01_macro").unwrap();
    assert_eq!(defence.class, ModuleClass::DefenceModule);
    assert_eq!(
        defence.property(PropertyType::MTurret),
        Some(&Property::HasMTurret { count: 2 })
    );

    let storage = data.module("storage_arg_l_container_01_macro").unwrap();
    assert!(storage.property(PropertyType::MTurret).is_none());
    assert!(storage.property(PropertyType::LTurret).is_none());
}

#[test]
fn modules_keep_partial_records() {
    let data = load(test_utils::fixture_game());
    let ids: Vec<_> = data.modules().map(|m| m.macro_id.clone()).collect();
    assert_eq!(ids.len(), 5);
    assert!(data.module("missing_module_macro").is_none());

    // Unknown component and one unknown bay: the rest is still there.
    let dock = data.module("dockarea_arg_m_station_01_macro").unwrap();
    assert!(dock.player_buildable);
    assert_eq!(dock.property(PropertyType::SDock).and_then(Property::count), Some(2));
    assert_eq!(dock.property(PropertyType::LXLDock).and_then(Property::count), Some(1));
    assert!(!dock.has(PropertyType::Cargo));
}

#[test]
fn module_products_link_into_the_ware_graph() {
    let data = load(test_utils::fixture_game());
    let plant = data.module("prod_gen_energycells_macro").unwrap();
    let Some(Property::SupplyProduct { product, production }) =
        plant.property(PropertyType::SupplyProduct)
    else {
        panic!("no product on the solar plant");
    };
    let ware = data.ware(product);
    assert_eq!(data.texts().text(ware.name), "Energy Cells");
    assert_eq!(production.as_ref(), ware.productions.get("default"));

    let habitat = data.module("hab_arg_s_01_macro").unwrap();
    let Some(Property::SupplyWorkforce { supply_info, .. }) =
        habitat.property(PropertyType::SupplyWorkforce)
    else {
        panic!("no workforce on the habitat");
    };
    let busy = data.ware("workunit_busy");
    assert_eq!(supply_info.as_ref(), busy.productions.get("argon"));
}

#[test]
fn module_group_extension_adds_modules() {
    let mut vfs = test_utils::fixture_game();
    vfs.insert(
        "/extensions/ext_01/libraries/modulegroups.xml",
        r#"<diff>
             <add sel="/groups/group[@name='stor_arg_l_container']">
               <select macro="stor_ext_macro"/>
             </add>
           </diff>"#,
    );
    vfs.insert(
        "/extensions/ext_01/index/macros.xml",
        r#"<index><entry name="stor_ext_macro" value="extensions\ext_01\assets\stor_ext_macro"/></index>"#,
    );
    vfs.insert(
        "/extensions/ext_01/assets/stor_ext_macro.xml",
        r#"<macros><macro name="stor_ext_macro">
             <properties><cargo max="500" tags="liquid"/></properties>
           </macro></macros>"#,
    );
    let data = load(vfs);
    let module = data.module("stor_ext_macro").unwrap();
    assert_eq!(module.class, ModuleClass::Storage);
    assert_eq!(
        module.property(PropertyType::Cargo),
        Some(&Property::HasCargo {
            cargo_type: TransportType::Liquid,
            capacity: 500
        })
    );
    assert_eq!(data.module_count(), 6);
}

#[test]
fn broken_extension_files_are_not_fatal() {
    let mut vfs = test_utils::fixture_game();
    vfs.insert("/extensions/ext_01/libraries/wares.xml", "<diff><add sel=");
    vfs.insert("/extensions/ext_01/index/macros.xml", "<index><entry");
    vfs.insert("/extensions/ext_01/t/0001-L044.xml", "<language id=\"44\"><page");
    let data = load(vfs);
    assert_eq!(data.module_count(), 5);
    assert_eq!(data.text(20201, 101), "Energy Cells");
}

#[test]
fn missing_mandatory_file_names_the_subsystem() {
    let cases = [
        ("/index/macros.xml", LoadStage::Macros, "macros"),
        ("/index/components.xml", LoadStage::Components, "components"),
        ("/libraries/waregroups.xml", LoadStage::Wares, "wares"),
        ("/libraries/modulegroups.xml", LoadStage::StationModules, "station modules"),
    ];
    for (path, stage, label) in cases {
        let mut vfs = test_utils::fixture_game();
        vfs.remove(path);
        let err = GameData::load(Arc::new(vfs), &LoaderConfig::default(), &|_| {}).unwrap_err();
        assert_eq!(err.stage, stage, "removing {path}");
        assert!(err.to_string().contains(label), "{err}");
    }
}

#[test]
fn configured_language_selects_texts() {
    let vfs = test_utils::fixture_game().with_file(
        "/t/0001-L049.xml",
        r#"<language id="49"><page id="20201"><t id="101">Energiezellen</t></page></language>"#,
    );
    let config = LoaderConfig {
        language: 49,
        worker_threads: Some(2),
        ..LoaderConfig::default()
    };
    let data = GameData::load(Arc::new(vfs), &config, &|_| {}).unwrap();
    assert_eq!(data.text(20201, 101), "Energiezellen");
    // No German entry: falls back to English.
    assert_eq!(data.text(20201, 201), "Hull Parts");
}
