//! Module groups: the macro ids of every station module.

use std::cell::RefCell;
use std::sync::LazyLock;

use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use indexmap::IndexMap;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::loader::{DataLoadError, parse_document, parse_optional_document};
use crate::scratch::ScratchValue;
use crate::vfs::{self, Vfs};

pub const MODULE_GROUPS_PATH: &str = "/libraries/modulegroups.xml";
const EXTENSION_MODULE_GROUPS: &str = "libraries/modulegroups.xml";

static GROUP_SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)^/groups/group\[@name=['"](\w+)['"]\]$"#).unwrap());

type GroupMap = IndexMap<String, Vec<String>>;

/// Group name -> selected macro ids, in document order.
#[derive(Debug, Clone, Default)]
pub struct ModuleGroups {
    groups: GroupMap,
}

impl ModuleGroups {
    /// Load the base group file (fatal when missing or malformed) and apply
    /// every enabled extension's diff.
    pub fn load(vfs: &dyn Vfs, config: &LoaderConfig) -> Result<Self, DataLoadError> {
        let groups = RefCell::new(GroupMap::new());
        let mut loader = XmlLoader::new();
        parse_document(vfs, MODULE_GROUPS_PATH, &mut loader, GroupContext::Root(&groups))?;

        for ext in vfs::extension_names(vfs, config) {
            let path = vfs::extension_path(&ext, EXTENSION_MODULE_GROUPS);
            if parse_optional_document(vfs, &path, &mut loader, GroupContext::DiffRoot(&groups)) {
                debug!("applied module group diff {path}");
            }
        }
        drop(loader);

        let groups = groups.into_inner();
        info!("loaded {} module groups", groups.len());
        Ok(Self { groups })
    }

    pub fn group(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    /// Every `(group, macro id)` pair.
    pub fn selections(&self) -> impl Iterator<Item = (&str, &str)> {
        self.groups
            .iter()
            .flat_map(|(group, macros)| macros.iter().map(move |m| (group.as_str(), m.as_str())))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

enum GroupContext<'a> {
    Root(&'a RefCell<GroupMap>),
    Groups(&'a RefCell<GroupMap>),
    Group {
        groups: &'a RefCell<GroupMap>,
        name: String,
    },
    DiffRoot(&'a RefCell<GroupMap>),
    Diff(&'a RefCell<GroupMap>),
    Skip,
}

impl Context for GroupContext<'_> {
    type Value = ScratchValue;

    fn skip() -> Self {
        GroupContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        let next = match self {
            GroupContext::Root(groups) if name == "groups" => GroupContext::Groups(*groups),
            GroupContext::Groups(groups) if name == "group" => match attrs.get("name") {
                Some(group) => {
                    groups.borrow_mut().entry(group.to_string()).or_default();
                    GroupContext::Group {
                        groups: *groups,
                        name: group.to_string(),
                    }
                }
                None => {
                    warn!("module group without a name, skipped");
                    GroupContext::Skip
                }
            },
            GroupContext::Group { groups, name: group } if name == "select" => {
                if let Some(macro_id) = attrs.get("macro") {
                    groups
                        .borrow_mut()
                        .entry(group.clone())
                        .or_default()
                        .push(macro_id.to_string());
                }
                GroupContext::Skip
            }
            GroupContext::DiffRoot(groups) if name == "diff" => GroupContext::Diff(*groups),
            GroupContext::Diff(groups) => diff_target(*groups, name, attrs),
            _ => GroupContext::Skip,
        };
        cursor.push(next);
        Ok(())
    }
}

fn diff_target<'a>(groups: &'a RefCell<GroupMap>, op: &str, attrs: &Attributes) -> GroupContext<'a> {
    let sel = attrs.get("sel").unwrap_or_default();
    if op != "add" {
        warn!("unsupported module group diff <{op} sel=\"{sel}\">, skipped");
        return GroupContext::Skip;
    }
    if sel == "/groups" {
        return GroupContext::Groups(groups);
    }
    match GROUP_SELECTOR.captures(sel) {
        Some(c) if groups.borrow().contains_key(&c[1]) => GroupContext::Group {
            groups,
            name: c[1].to_string(),
        },
        Some(c) => {
            warn!("module group diff targets unknown group '{}', skipped", &c[1]);
            GroupContext::Skip
        }
        None => {
            warn!("unrecognized module group diff selector '{sel}', skipped");
            GroupContext::Skip
        }
    }
}
