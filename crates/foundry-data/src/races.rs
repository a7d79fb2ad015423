//! Race table from `/libraries/races.xml`.

use std::cell::RefCell;
use std::sync::Arc;

use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use indexmap::IndexMap;
use tracing::{debug, info};

use crate::loader::{DataLoadError, parse_document};
use crate::scratch::{self, CatalogScratch, ScratchValue};
use crate::texts::{TextId, TextStore};
use crate::vfs::Vfs;

pub const RACES_PATH: &str = "/libraries/races.xml";

/// Races whose modules the player can build.
pub const PLAYER_RACES: [&str; 4] = ["argon", "paranid", "split", "teladi"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Race {
    pub id: String,
    pub name: TextId,
    pub description: TextId,
}

#[derive(Debug, Clone, Default)]
pub struct RaceTable {
    races: IndexMap<String, Race>,
}

impl RaceTable {
    pub fn load(vfs: &dyn Vfs, texts: Arc<TextStore>) -> Result<Self, DataLoadError> {
        let races = RefCell::new(IndexMap::new());
        let mut loader = XmlLoader::new();
        scratch::set_texts(loader.scratch_mut(), texts);
        parse_document(vfs, RACES_PATH, &mut loader, RaceContext::Root(&races))?;
        drop(loader);

        let races = races.into_inner();
        info!("loaded {} races", races.len());
        Ok(Self { races })
    }

    pub fn race(&self, id: &str) -> Option<&Race> {
        self.races.get(id)
    }

    pub fn races(&self) -> impl Iterator<Item = &Race> {
        self.races.values()
    }

    /// The fixed set of player races.
    pub fn player_races(&self) -> &'static [&'static str] {
        &PLAYER_RACES
    }

    pub fn is_player_race(id: &str) -> bool {
        PLAYER_RACES.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.races.len()
    }

    pub fn is_empty(&self) -> bool {
        self.races.is_empty()
    }
}

enum RaceContext<'a> {
    Root(&'a RefCell<IndexMap<String, Race>>),
    Races(&'a RefCell<IndexMap<String, Race>>),
    Skip,
}

impl Context for RaceContext<'_> {
    type Value = ScratchValue;

    fn skip() -> Self {
        RaceContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        match self {
            RaceContext::Root(races) if name == "races" => {
                cursor.push(RaceContext::Races(*races));
                return Ok(());
            }
            RaceContext::Races(races) if name == "race" => {
                if let (Some(id), Some(race_name), Some(description)) =
                    (attrs.get("id"), attrs.get("name"), attrs.get("description"))
                {
                    let race = Race {
                        id: id.to_string(),
                        name: TextId::from_attr(Some(race_name)),
                        description: TextId::from_attr(Some(description)),
                    };
                    log_race(cursor.scratch(), &race);
                    races.borrow_mut().insert(race.id.clone(), race);
                }
            }
            _ => {}
        }
        cursor.skip();
        Ok(())
    }
}

fn log_race(scratch: &CatalogScratch, race: &Race) {
    let name = scratch::texts(scratch)
        .map(|t| t.text(race.name))
        .unwrap_or_default();
    debug!(id = %race.id, name = %name, "race");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryVfs, fixture_game};

    #[test]
    fn load_fixture_races() {
        let vfs = fixture_game();
        let table = RaceTable::load(&vfs, Arc::new(TextStore::default())).unwrap();
        assert_eq!(table.len(), 3);
        let argon = table.race("argon").unwrap();
        assert_eq!(argon.name, TextId::new(20104, 1));
        // Missing description: skipped.
        assert!(table.race("xenon").is_none());
        let ids: Vec<_> = table.races().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["argon", "paranid", "teladi"]);
    }

    #[test]
    fn player_races_are_fixed() {
        let table = RaceTable::default();
        assert_eq!(table.player_races(), &["argon", "paranid", "split", "teladi"]);
        assert!(RaceTable::is_player_race("split"));
        assert!(!RaceTable::is_player_race("xenon"));
    }

    #[test]
    fn missing_file_is_fatal() {
        let result = RaceTable::load(&MemoryVfs::new(), Arc::new(TextStore::default()));
        assert!(matches!(result, Err(DataLoadError::MissingFile { .. })));
    }
}
