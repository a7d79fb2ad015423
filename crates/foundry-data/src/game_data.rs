//! The loaded game catalog: every table, built once and shared read-only.

use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::config::LoaderConfig;
use crate::index::{AssetIndex, IndexKind};
use crate::loader::DataLoadError;
use crate::races::{Race, RaceTable};
use crate::station_modules::{ModuleSources, StationModule, StationModuleTable};
use crate::texts::{TextId, TextStore};
use crate::vfs::Vfs;
use crate::wares::{Ware, WareGraph, WareGroup};

/// Pipeline stage, named in errors so the user knows which subsystem failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Texts,
    Macros,
    Components,
    Races,
    Wares,
    StationModules,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadStage::Texts => "texts",
            LoadStage::Macros => "macros",
            LoadStage::Components => "components",
            LoadStage::Races => "races",
            LoadStage::Wares => "wares",
            LoadStage::StationModules => "station modules",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to load {stage}: {source}")]
pub struct GameDataError {
    pub stage: LoadStage,
    #[source]
    pub source: DataLoadError,
}

trait StageExt<T> {
    fn stage(self, stage: LoadStage) -> Result<T, GameDataError>;
}

impl<T> StageExt<T> for Result<T, DataLoadError> {
    fn stage(self, stage: LoadStage) -> Result<T, GameDataError> {
        self.map_err(|source| GameDataError { stage, source })
    }
}

/// Every catalog table of one game installation.
pub struct GameData {
    vfs: Arc<dyn Vfs>,
    texts: Arc<TextStore>,
    macros: AssetIndex,
    components: AssetIndex,
    races: RaceTable,
    wares: Arc<WareGraph>,
    modules: StationModuleTable,
}

impl fmt::Debug for GameData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameData")
            .field("text_pages", &self.texts.page_count())
            .field("macros", &self.macros.len())
            .field("components", &self.components.len())
            .field("races", &self.races.len())
            .field("wares", &self.wares.len())
            .field("modules", &self.modules.len())
            .finish()
    }
}

impl GameData {
    /// Build every table in dependency order, stopping at the first fatal
    /// failure.
    pub fn load(
        vfs: Arc<dyn Vfs>,
        config: &LoaderConfig,
        progress: &(dyn Fn(&str) + Sync),
    ) -> Result<Self, GameDataError> {
        let texts = Arc::new(TextStore::load(vfs.as_ref(), config, progress).stage(LoadStage::Texts)?);

        progress("Loading macro index");
        let macros = AssetIndex::load(vfs.as_ref(), IndexKind::Macros, config).stage(LoadStage::Macros)?;
        progress("Loading component index");
        let components =
            AssetIndex::load(vfs.as_ref(), IndexKind::Components, config).stage(LoadStage::Components)?;

        progress("Loading races");
        let races = RaceTable::load(vfs.as_ref(), Arc::clone(&texts)).stage(LoadStage::Races)?;

        let wares = Arc::new(
            WareGraph::load(vfs.as_ref(), Arc::clone(&texts), config, progress).stage(LoadStage::Wares)?,
        );

        let sources = ModuleSources {
            vfs: vfs.as_ref(),
            macros: &macros,
            components: &components,
            texts: Arc::clone(&texts),
            wares: Arc::clone(&wares),
        };
        let modules = StationModuleTable::load(&sources, config, progress).stage(LoadStage::StationModules)?;
        drop(sources);

        progress("Game data loaded");
        let data = GameData {
            vfs,
            texts,
            macros,
            components,
            races,
            wares,
            modules,
        };
        info!("game data loaded: {data:?}");
        Ok(data)
    }

    pub fn vfs(&self) -> &Arc<dyn Vfs> {
        &self.vfs
    }

    pub fn texts(&self) -> &Arc<TextStore> {
        &self.texts
    }

    pub fn wares(&self) -> &Arc<WareGraph> {
        &self.wares
    }

    /// Document path of macro `id`, without the `.xml` suffix.
    pub fn macro_path(&self, id: &str) -> Option<&str> {
        self.macros.path(id)
    }

    /// Document path of component `id`, without the `.xml` suffix.
    pub fn component_path(&self, id: &str) -> Option<&str> {
        self.components.path(id)
    }

    pub fn race(&self, id: &str) -> Option<&Race> {
        self.races.race(id)
    }

    pub fn races(&self) -> impl Iterator<Item = &Race> {
        self.races.races()
    }

    pub fn player_races(&self) -> &'static [&'static str] {
        self.races.player_races()
    }

    /// Ware `id`; unknown ids yield a cached placeholder.
    pub fn ware(&self, id: &str) -> Arc<Ware> {
        self.wares.ware(id, Some(self.texts.as_ref()))
    }

    /// Ware group `id`; unknown ids yield a cached placeholder.
    pub fn ware_group(&self, id: &str) -> Arc<WareGroup> {
        self.wares.ware_group(id, Some(self.texts.as_ref()))
    }

    /// Resolved text in the configured language.
    pub fn text(&self, page: i32, text: i32) -> String {
        self.texts.text(TextId::new(page, text))
    }

    pub fn modules(&self) -> impl Iterator<Item = &Arc<StationModule>> {
        self.modules.modules()
    }

    pub fn module(&self, macro_id: &str) -> Option<&Arc<StationModule>> {
        self.modules.module(macro_id)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}
