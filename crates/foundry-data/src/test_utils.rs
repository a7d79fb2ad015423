//! Test fixtures: an in-memory VFS and a small but complete game tree.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use crate::vfs::{DirEntry, DirListing, EntryKind, Vfs, normalize_path};

// ===========================================================================
// MemoryVfs
// ===========================================================================

/// [`Vfs`] backed by a map of normalised paths to file contents.
/// Directories exist implicitly as prefixes of file paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryVfs {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryVfs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        self.files.insert(normalize_path(path), content.into());
    }

    pub fn remove(&mut self, path: &str) {
        self.files.remove(&normalize_path(path));
    }
}

impl Vfs for MemoryVfs {
    fn open(&self, path: &str) -> Option<Box<dyn Read + Send>> {
        let content = self.files.get(&normalize_path(path))?.clone();
        Some(Box::new(Cursor::new(content)))
    }

    fn open_dir(&self, path: &str) -> Option<DirListing> {
        let dir = normalize_path(path);
        let prefix = if dir == "/" { dir.clone() } else { format!("{dir}/") };

        let mut children: BTreeMap<String, EntryKind> = BTreeMap::new();
        for file in self.files.keys() {
            let Some(rest) = file.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => children.insert(child.to_string(), EntryKind::Directory),
                None => children.insert(rest.to_string(), EntryKind::File),
            };
        }
        if children.is_empty() {
            return None;
        }
        let entries = children
            .into_iter()
            .map(|(name, kind)| DirEntry { name, kind })
            .collect();
        Some(DirListing::new(&dir, entries))
    }
}

// ===========================================================================
// Fixture game
// ===========================================================================

pub const ENGLISH_TEXTS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<language id="44">
  <page id="20201">
    <t id="101">Energy Cells</t>
    <t id="102">Stored energy (internal note)</t>
    <t id="201">Hull Parts</t>
    <t id="301">Claytronics</t>
  </page>
  <page id="20104">
    <t id="1">Argon</t>
    <t id="2">Paranid</t>
    <t id="3">Teladi</t>
  </page>
  <page id="20215">
    <t id="1">Energy</t>
    <t id="2">Refined</t>
  </page>
  <page id="20102">
    <t id="1">Solar Power Plant</t>
    <t id="2">{20102,1} produces {20201,101}.</t>
    <t id="3">L Container Storage</t>
    <t id="4">Dock Area</t>
    <t id="5">Defence Platform</t>
    <t id="6">Habitat</t>
  </page>
</language>"#;

pub const MACRO_INDEX: &str = r#"<index>
  <entry name="prod_gen_energycells_macro" value="assets\structures\production\macros\prod_gen_energycells_macro"/>
  <entry name="storage_arg_l_container_01_macro" value="assets\structures\storage\macros\storage_arg_l_container_01_macro"/>
  <entry name="dockarea_arg_m_station_01_macro" value="assets\structures\dock\macros\dockarea_arg_m_station_01_macro"/>
  <entry name="defence_arg_disc_01_macro" value="assets\structures\defence\macros\defence_arg_disc_01_macro"/>
  <entry name="hab_arg_s_01_macro" value="assets\structures\habitat\macros\hab_arg_s_01_macro"/>
  <entry name="dockingbay_arg_s_01_macro" value="assets\props\dockingbays\macros\dockingbay_arg_s_01_macro"/>
  <entry name="dockingbay_arg_m_01_macro" value="assets\props\dockingbays\macros\dockingbay_arg_m_01_macro"/>
  <entry name="pier_arg_l_01_macro" value="assets\props\dockingbays\macros\pier_arg_l_01_macro"/>
</index>"#;

pub const COMPONENT_INDEX: &str = r#"<index>
  <entry name="prod_gen_energycells" value="assets\structures\production\prod_gen_energycells"/>
  <entry name="storage_arg_l_container_01" value="assets\structures\storage\storage_arg_l_container_01"/>
  <entry name="defence_arg_disc_01" value="assets\structures\defence\defence_arg_disc_01"/>
</index>"#;

pub const RACES: &str = r#"<races>
  <race id="argon" name="{20104,1}" description="{20104,1}"/>
  <race id="paranid" name="{20104,2}" description="{20104,2}"/>
  <race id="teladi" name="{20104,3}" description="{20104,3}"/>
  <race id="xenon" name="{20104,4}"/>
</races>"#;

pub const WARE_GROUPS: &str = r#"<groups>
  <group id="energy" name="{20215,1}" tags="tradable"/>
  <group id="refined" name="{20215,2}" tags="tradable"/>
</groups>"#;

pub const WARES: &str = r#"<wares>
  <ware id="energycells" name="{20201,101}" description="{20201,102}" group="energy" transport="container" volume="6" tags="container economy stationbuilding">
    <price min="10" average="16" max="22"/>
    <production time="60" amount="175" method="default" name="{20206,101}">
      <effects>
        <effect type="work" product="0.43"/>
      </effects>
    </production>
    <icon active="ware_energycells"/>
  </ware>
  <ware id="hullparts" name="{20201,201}" description="{20201,201}" group="refined" transport="container" volume="12" tags="container economy">
    <price min="180" average="250" max="310"/>
    <production time="300" amount="140" method="default">
      <primary>
        <ware ware="energycells" amount="80"/>
        <ware ware="graphene" amount="40"/>
      </primary>
      <effects>
        <effect type="sunlight" product="0.2"/>
        <effect type="work" product="0.34"/>
      </effects>
    </production>
  </ware>
  <ware id="liquidcargo" name="{20201,301}" description="{20201,301}" group="refined" transport="liquid" volume="1" tags="liquid"/>
  <ware id="brokenware" name="{20201,301}" description="{20201,301}" group="refined" transport="teleport" volume="1" tags="container"/>
  <ware id="workunit_busy" volume="1" tags="noplayerbuild workunit">
    <production time="600" amount="300" method="argon">
      <primary>
        <ware ware="energycells" amount="30"/>
      </primary>
    </production>
    <production time="600" amount="300" method="default">
      <primary>
        <ware ware="energycells" amount="25"/>
      </primary>
    </production>
  </ware>
</wares>"#;

pub const MODULE_GROUPS: &str = r#"<groups>
  <group name="prod_gen_energycells">
    <select macro="prod_gen_energycells_macro"/>
  </group>
  <group name="stor_arg_l_container">
    <select macro="storage_arg_l_container_01_macro"/>
  </group>
  <group name="dock_arg_m">
    <select macro="dockarea_arg_m_station_01_macro"/>
  </group>
  <group name="def_arg_disc">
    <select macro="defence_arg_disc_01_macro"/>
  </group>
  <group name="hab_arg_s">
    <select macro="hab_arg_s_01_macro"/>
    <select macro="missing_module_macro"/>
  </group>
</groups>"#;

pub const PRODUCTION_MACRO: &str = r#"<macros>
  <macro name="prod_gen_energycells_macro" class="production">
    <component ref="prod_gen_energycells"/>
    <properties>
      <identification name="{20102,1}" description="{20102,2}" makerrace="argon teladi"/>
      <hull max="173000"/>
      <explosiondamage value="1000"/>
      <workforce max="40"/>
    </properties>
    <build>
      <sets>
        <set ref="factory"/>
      </sets>
    </build>
    <production wares="energycells">
      <queue ware="energycells" method="default"/>
    </production>
  </macro>
</macros>"#;

pub const STORAGE_MACRO: &str = r#"<macros>
  <macro name="storage_arg_l_container_01_macro" class="storage">
    <component ref="storage_arg_l_container_01"/>
    <properties>
      <identification name="{20102,3}" description="{20102,3}"/>
      <hull max="330000"/>
    </properties>
  </macro>
</macros>"#;

pub const DOCK_MACRO: &str = r#"<macros>
  <macro name="dockarea_arg_m_station_01_macro" class="dockarea">
    <component ref="dockarea_arg_m_station_01"/>
    <properties>
      <identification name="{20102,4}" description="{20102,4}"/>
      <hull max="500000"/>
    </properties>
    <build>
      <sets>
        <set ref="headquarters_player"/>
      </sets>
    </build>
    <connections>
      <connection ref="con_dock_s_01"><macro ref="dockingbay_arg_s_01_macro" connection="dock"/></connection>
      <connection ref="con_dock_s_02"><macro ref="dockingbay_arg_s_01_macro" connection="dock"/></connection>
      <connection ref="con_dock_m_01"><macro ref="dockingbay_arg_m_01_macro" connection="dock"/></connection>
      <connection ref="con_pier_01"><macro ref="pier_arg_l_01_macro" connection="dock"/></connection>
      <connection ref="con_unknown"><macro ref="missing_bay_macro" connection="dock"/></connection>
    </connections>
  </macro>
</macros>"#;

pub const DEFENCE_MACRO: &str = r#"<macros>
  <macro name="defence_arg_disc_01_macro" class="defencemodule">
    <component ref="defence_arg_disc_01"/>
    <properties>
      <identification name="{20102,5}" description="{20102,5}"/>
      <hull max="540000"/>
      <turret size="M"/>
      <turret size="M"/>
      <shield size="L"/>
    </properties>
  </macro>
</macros>"#;

pub const HABITAT_MACRO: &str = r#"<macros>
  <macro name="hab_arg_s_01_macro">
    <component ref="hab_arg_s_01"/>
    <properties>
      <identification name="{20102,6}" description="{20102,6}" makerrace="argon"/>
      <hull max="94000"/>
      <workforce capacity="250" race="argon"/>
    </properties>
  </macro>
</macros>"#;

pub const DOCKING_BAY_S: &str = r#"<macros>
  <macro name="dockingbay_arg_s_01_macro" class="dockingbay">
    <properties>
      <docksize tags="docks_s"/>
      <dock capacity="4"/>
    </properties>
  </macro>
</macros>"#;

pub const DOCKING_BAY_M: &str = r#"<macros>
  <macro name="dockingbay_arg_m_01_macro" class="dockingbay">
    <properties>
      <docksize tags="docks_m"/>
      <dock capacity="2"/>
    </properties>
  </macro>
</macros>"#;

pub const PIER_L: &str = r#"<macros>
  <macro name="pier_arg_l_01_macro" class="dockingbay">
    <properties>
      <docksize tags="docks_l docks_xl"/>
    </properties>
  </macro>
</macros>"#;

pub const PRODUCTION_COMPONENT: &str = r#"<components>
  <component name="prod_gen_energycells" class="production">
    <connections>
      <connection name="con_turret_01" tags="turret medium standardturret"/>
      <connection name="con_shield_01" tags="shield medium"/>
    </connections>
  </component>
</components>"#;

pub const STORAGE_COMPONENT: &str = r#"<components>
  <component name="storage_arg_l_container_01" class="storage">
    <properties>
      <cargo max="1000000" tags="container"/>
    </properties>
  </component>
</components>"#;

pub const DEFENCE_COMPONENT: &str = r#"<components>
  <component name="defence_arg_disc_01" class="defencemodule">
    <connections>
      <connection name="con_turret_l_01" tags="turret large"/>
      <connection name="con_turret_l_02" tags="turret large"/>
      <connection name="con_part" tags="part"/>
    </connections>
  </component>
</components>"#;

/// Every document of the fixture game, keyed by VFS path.
pub const FIXTURE_FILES: [(&str, &str); 18] = [
    ("/t/0001-L044.xml", ENGLISH_TEXTS),
    ("/index/macros.xml", MACRO_INDEX),
    ("/index/components.xml", COMPONENT_INDEX),
    ("/libraries/races.xml", RACES),
    ("/libraries/waregroups.xml", WARE_GROUPS),
    ("/libraries/wares.xml", WARES),
    ("/libraries/modulegroups.xml", MODULE_GROUPS),
    (
        "/assets/structures/production/macros/prod_gen_energycells_macro.xml",
        PRODUCTION_MACRO,
    ),
    (
        "/assets/structures/storage/macros/storage_arg_l_container_01_macro.xml",
        STORAGE_MACRO,
    ),
    (
        "/assets/structures/dock/macros/dockarea_arg_m_station_01_macro.xml",
        DOCK_MACRO,
    ),
    (
        "/assets/structures/defence/macros/defence_arg_disc_01_macro.xml",
        DEFENCE_MACRO,
    ),
    (
        "/assets/structures/habitat/macros/hab_arg_s_01_macro.xml",
        HABITAT_MACRO,
    ),
    (
        "/assets/props/dockingbays/macros/dockingbay_arg_s_01_macro.xml",
        DOCKING_BAY_S,
    ),
    (
        "/assets/props/dockingbays/macros/dockingbay_arg_m_01_macro.xml",
        DOCKING_BAY_M,
    ),
    (
        "/assets/props/dockingbays/macros/pier_arg_l_01_macro.xml",
        PIER_L,
    ),
    (
        "/assets/structures/production/prod_gen_energycells.xml",
        PRODUCTION_COMPONENT,
    ),
    (
        "/assets/structures/storage/storage_arg_l_container_01.xml",
        STORAGE_COMPONENT,
    ),
    (
        "/assets/structures/defence/defence_arg_disc_01.xml",
        DEFENCE_COMPONENT,
    ),
];

/// A small base game touching every table.
///
/// The dock area's component is not in the component index and its last
/// connection names an unknown macro; the habitat group selects a macro
/// missing from the macro index.
pub fn fixture_game() -> MemoryVfs {
    let mut vfs = MemoryVfs::new();
    for (path, content) in FIXTURE_FILES {
        vfs.insert(path, content);
    }
    vfs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_vfs_lists_implicit_directories() {
        let vfs = MemoryVfs::new()
            .with_file("/t/0001-L044.xml", "a")
            .with_file("t\\0001-L049.xml", "b")
            .with_file("/extensions/mod/t/0001-L044.xml", "c");

        let root = vfs.open_dir("/").unwrap();
        assert_eq!(root.directories().collect::<Vec<_>>(), vec!["extensions", "t"]);
        let t = vfs.open_dir("t").unwrap();
        assert_eq!(t.files().collect::<Vec<_>>(), vec!["0001-L044.xml", "0001-L049.xml"]);
        assert!(vfs.open_dir("/missing").is_none());
        assert!(vfs.open("/t/0001-L044.xml").is_some());
        assert!(vfs.open("/t").is_none());
    }

    #[test]
    fn memory_vfs_remove() {
        let mut vfs = fixture_game();
        assert!(vfs.open("/libraries/wares.xml").is_some());
        vfs.remove("/libraries/wares.xml");
        assert!(vfs.open("/libraries/wares.xml").is_none());
    }
}
