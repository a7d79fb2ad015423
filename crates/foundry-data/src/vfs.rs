//! Virtual filesystem interface.
//!
//! Loaders only ever see the game through [`Vfs`]: byte streams by path and
//! directory listings. Paths use `/` separators and are rooted at the game
//! directory; [`normalize_path`] turns index values such as
//! `assets\structures\foo` into that form.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::LoaderConfig;
use crate::loader::DataLoadError;

/// Root under which every extension lives in its own directory.
pub const EXTENSIONS_DIR: &str = "/extensions";

/// Read-only access to the game's files.
pub trait Vfs: Send + Sync {
    /// Open a file for reading. `None` when it does not exist.
    fn open(&self, path: &str) -> Option<Box<dyn Read + Send>>;

    /// List a directory. `None` when it does not exist.
    fn open_dir(&self, path: &str) -> Option<DirListing>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

/// Entries of one directory, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirListing {
    path: String,
    entries: Vec<DirEntry>,
}

impl DirListing {
    pub fn new(path: &str, mut entries: Vec<DirEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            path: normalize_path(path),
            entries,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.of_kind(EntryKind::File)
    }

    pub fn directories(&self) -> impl Iterator<Item = &str> {
        self.of_kind(EntryKind::Directory)
    }

    /// Absolute VFS path of an entry of this directory.
    pub fn abs_path(&self, name: &str) -> String {
        if self.path == "/" {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.path)
        }
    }

    fn of_kind(&self, kind: EntryKind) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| e.name.as_str())
    }
}

/// Canonical form of a VFS path: `/` separators, a single leading `/`, no
/// empty segments and no trailing `/`.
pub fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Extension directory names in load order, minus the disabled ones.
pub fn extension_names(vfs: &dyn Vfs, config: &LoaderConfig) -> Vec<String> {
    let Some(listing) = vfs.open_dir(EXTENSIONS_DIR) else {
        return Vec::new();
    };
    listing
        .directories()
        .filter(|name| config.is_extension_enabled(name))
        .map(str::to_string)
        .collect()
}

/// Path of `relative` inside extension `name`.
pub fn extension_path(name: &str, relative: &str) -> String {
    normalize_path(&format!("{EXTENSIONS_DIR}/{name}/{relative}"))
}

// ===========================================================================
// Unpacked directory tree
// ===========================================================================

/// [`Vfs`] over an unpacked game directory on disk.
#[derive(Debug, Clone)]
pub struct FsVfs {
    root: PathBuf,
}

impl FsVfs {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, DataLoadError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DataLoadError::MissingDirectory {
                path: root.display().to_string(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut full = self.root.clone();
        for segment in normalize_path(path).split('/').filter(|s| !s.is_empty()) {
            if segment == ".." {
                continue;
            }
            full.push(segment);
        }
        full
    }
}

impl Vfs for FsVfs {
    fn open(&self, path: &str) -> Option<Box<dyn Read + Send>> {
        let file = File::open(self.resolve(path)).ok()?;
        Some(Box::new(file))
    }

    fn open_dir(&self, path: &str) -> Option<DirListing> {
        let read_dir = std::fs::read_dir(self.resolve(path)).ok()?;
        let entries = read_dir
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let kind = match entry.file_type().ok()? {
                    t if t.is_dir() => EntryKind::Directory,
                    t if t.is_file() => EntryKind::File,
                    _ => return None,
                };
                Some(DirEntry {
                    name: entry.file_name().to_str()?.to_string(),
                    kind,
                })
            })
            .collect();
        Some(DirListing::new(path, entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MemoryVfs;
    use std::fs;

    #[test]
    fn normalize_path_forms() {
        assert_eq!(normalize_path("assets\\structures\\dock"), "/assets/structures/dock");
        assert_eq!(normalize_path("/t/"), "/t");
        assert_eq!(normalize_path("t"), "/t");
        assert_eq!(normalize_path("//index//macros.xml"), "/index/macros.xml");
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("./a/./b"), "/a/b");
    }

    #[test]
    fn listing_is_sorted_and_split_by_kind() {
        let listing = DirListing::new(
            "/extensions/",
            vec![
                DirEntry { name: "b".into(), kind: EntryKind::Directory },
                DirEntry { name: "readme.txt".into(), kind: EntryKind::File },
                DirEntry { name: "a".into(), kind: EntryKind::Directory },
            ],
        );
        assert_eq!(listing.path(), "/extensions");
        assert_eq!(listing.directories().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(listing.files().collect::<Vec<_>>(), vec!["readme.txt"]);
        assert_eq!(listing.abs_path("a"), "/extensions/a");
        assert_eq!(DirListing::new("/", vec![]).abs_path("t"), "/t");
    }

    #[test]
    fn extension_names_skip_disabled() {
        let vfs = MemoryVfs::new()
            .with_file("/extensions/ego_dlc_split/content.xml", "<content/>")
            .with_file("/extensions/ego_dlc_boron/content.xml", "<content/>")
            .with_file("/extensions/notes.txt", "");
        let config = LoaderConfig {
            disabled_extensions: vec!["ego_dlc_split".into()],
            ..LoaderConfig::default()
        };
        assert_eq!(extension_names(&vfs, &config), vec!["ego_dlc_boron".to_string()]);
        assert_eq!(
            extension_names(&vfs, &LoaderConfig::default()),
            vec!["ego_dlc_boron".to_string(), "ego_dlc_split".to_string()]
        );
    }

    #[test]
    fn extension_names_without_extensions_dir() {
        assert!(extension_names(&MemoryVfs::new(), &LoaderConfig::default()).is_empty());
    }

    #[test]
    fn fs_vfs_reads_unpacked_tree() {
        let dir = std::env::temp_dir().join(format!("foundry_fsvfs_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("libraries")).unwrap();
        fs::write(dir.join("libraries").join("races.xml"), "<races/>").unwrap();

        let vfs = FsVfs::new(&dir).unwrap();
        let mut content = String::new();
        vfs.open("\\libraries\\races.xml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<races/>");
        assert!(vfs.open("/libraries/wares.xml").is_none());

        let root = vfs.open_dir("/").unwrap();
        assert_eq!(root.directories().collect::<Vec<_>>(), vec!["libraries"]);
        let libs = vfs.open_dir("libraries").unwrap();
        assert_eq!(libs.abs_path("races.xml"), "/libraries/races.xml");
        assert!(vfs.open_dir("/t").is_none());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn fs_vfs_requires_directory() {
        let result = FsVfs::new("/nonexistent/foundry/game");
        assert!(matches!(result, Err(DataLoadError::MissingDirectory { .. })));
    }
}
