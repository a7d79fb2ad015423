//! Foundry Data -- the game catalog built from unpacked X4-style XML trees.
//!
//! Each table is loaded from a [`vfs::Vfs`] by streaming its documents through
//! [`foundry_xml::XmlLoader`] with a grammar of its own. Tables depend on each
//! other only through ids, never through owning pointers, so a partial load
//! can never leave a dangling reference.
//!
//! # Load Order
//!
//! 1. [`texts::TextStore`] -- every language file, in parallel.
//! 2. [`index::AssetIndex`] -- macro and component path indices.
//! 3. [`races::RaceTable`]
//! 4. [`wares::WareGraph`] -- ware groups, wares, then extension diffs.
//! 5. [`station_modules::StationModuleTable`] -- module groups, macros,
//!    connection macros and components.
//!
//! [`game_data::GameData`] runs the whole pipeline and owns the results.

pub mod config;
pub mod game_data;
pub mod index;
pub mod loader;
pub mod races;
pub mod scratch;
pub mod station_modules;
pub mod texts;
pub mod vfs;
pub mod wares;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::LoaderConfig;
pub use game_data::{GameData, GameDataError, LoadStage};
pub use loader::DataLoadError;
pub use texts::{TextId, TextStore};
pub use vfs::{FsVfs, Vfs};
pub use wares::{Ware, WareGraph, WareGroup};
