//! In-game text: language files, lazy reference resolution and synthetic
//! entries.
//!
//! Texts are stored per page and per text id, with one link sequence per
//! language. A link is either literal content or a `{page,text}` reference
//! to another entry, resolved only when the text is read.
//!
//! Language files are loaded by a worker pool. Pages are shared between
//! files, so the page table sits behind an `RwLock` and every page and text
//! guards its own map with a `Mutex`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, LazyLock};

use foundry_xml::{Attributes, Context, Cursor, ParseError, XmlLoader};
use parking_lot::{Mutex, RwLock};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_LANGUAGE, LoaderConfig};
use crate::loader::{DataLoadError, parse_document};
use crate::scratch::{CatalogScratch, ScratchValue};
use crate::vfs::{self, Vfs};

/// Page id reserved for synthesized entries.
pub const UNKNOWN_PAGE: i32 = -1;

/// Deepest chain of `{page,text}` references followed while resolving.
pub const MAX_REFERENCE_DEPTH: usize = 32;

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*\)").unwrap());
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*(\d+)\s*,\s*(\d+)\s*\}").unwrap());
static TEXT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\{\s*(-?\d+)\s*,\s*(-?\d+)\s*\}\s*$").unwrap());
static TEXT_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+-L\d+\.xml$").unwrap());

// ===========================================================================
// Ids and links
// ===========================================================================

/// Address of one text entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextId {
    pub page: i32,
    pub text: i32,
}

impl TextId {
    /// Resolves to the empty string.
    pub const EMPTY: TextId = TextId { page: 0, text: 0 };

    pub const fn new(page: i32, text: i32) -> Self {
        Self { page, text }
    }

    /// Parse a `{page,text}` attribute value.
    pub fn parse(value: &str) -> Option<Self> {
        let caps = TEXT_ID.captures(value)?;
        Some(Self {
            page: caps[1].parse().ok()?,
            text: caps[2].parse().ok()?,
        })
    }

    /// Like [`TextId::parse`], with malformed values mapped to [`TextId::EMPTY`].
    pub fn from_attr(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or(Self::EMPTY)
    }
}

impl fmt::Display for TextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{},{}}}", self.page, self.text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextLink {
    Literal(String),
    Reference(TextId),
}

// ===========================================================================
// Pages
// ===========================================================================

/// One text entry with its per-language link sequences.
#[derive(Debug)]
pub struct Text {
    id: TextId,
    links: Mutex<HashMap<u32, Vec<TextLink>>>,
}

impl Text {
    fn new(id: TextId) -> Self {
        Self {
            id,
            links: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> TextId {
        self.id
    }

    pub fn set_links(&self, language: u32, links: Vec<TextLink>) {
        self.links.lock().insert(language, links);
    }

    pub fn links(&self, language: u32) -> Option<Vec<TextLink>> {
        self.links.lock().get(&language).cloned()
    }

    /// Links in `language`, or in the fallback language when absent.
    fn links_with_fallback(&self, language: u32) -> Option<Vec<TextLink>> {
        let links = self.links.lock();
        links
            .get(&language)
            .or_else(|| links.get(&DEFAULT_LANGUAGE))
            .cloned()
    }
}

/// All texts sharing one page id.
#[derive(Debug)]
pub struct TextPage {
    id: i32,
    texts: Mutex<HashMap<i32, Arc<Text>>>,
}

impl TextPage {
    fn new(id: i32) -> Self {
        Self {
            id,
            texts: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn text(&self, id: i32) -> Option<Arc<Text>> {
        self.texts.lock().get(&id).cloned()
    }

    pub fn text_or_insert(&self, id: i32) -> Arc<Text> {
        let page = self.id;
        Arc::clone(
            self.texts
                .lock()
                .entry(id)
                .or_insert_with(|| Arc::new(Text::new(TextId::new(page, id)))),
        )
    }

    pub fn len(&self) -> usize {
        self.texts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ===========================================================================
// Store
// ===========================================================================

/// Every in-game text, shared by all loading threads.
#[derive(Debug)]
pub struct TextStore {
    pages: RwLock<HashMap<i32, Arc<TextPage>>>,
    language: AtomicU32,
    next_unknown: AtomicI32,
}

impl Default for TextStore {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl TextStore {
    pub fn new(language: u32) -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
            language: AtomicU32::new(language),
            next_unknown: AtomicI32::new(0),
        }
    }

    /// Load every language file of the base game and of each enabled
    /// extension.
    ///
    /// A missing base `t` directory is fatal. A file that fails to parse is
    /// logged and skipped.
    pub fn load(
        vfs: &dyn Vfs,
        config: &LoaderConfig,
        progress: &(dyn Fn(&str) + Sync),
    ) -> Result<Self, DataLoadError> {
        let store = TextStore::new(config.language);
        let files = text_files(vfs, config)?;
        let total = files.len();
        info!("loading {total} text files");
        progress(&format!("Loading text files (0/{total})"));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads.unwrap_or(0))
            .thread_name(|i| format!("foundry-texts-{i}"))
            .build()?;

        let cursor = Mutex::new(0usize);
        let finished = AtomicUsize::new(0);
        let workers = pool.current_num_threads().min(total.max(1));

        pool.scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| {
                    let mut loader = XmlLoader::new();
                    loop {
                        let path = {
                            let mut next = cursor.lock();
                            let Some(path) = files.get(*next) else {
                                return;
                            };
                            *next += 1;
                            path
                        };
                        debug!("loading text file {path}");
                        if let Err(e) = store.load_file_with(vfs, path, &mut loader) {
                            warn!("skipping text file {path}: {e}");
                        }
                        let done = finished.fetch_add(1, Ordering::AcqRel) + 1;
                        progress(&format!("Loading text files ({done}/{total})"));
                    }
                });
            }
        });

        info!("loaded {} text pages", store.page_count());
        Ok(store)
    }

    /// Parse one language file into the store.
    pub fn load_file(&self, vfs: &dyn Vfs, path: &str) -> Result<(), DataLoadError> {
        self.load_file_with(vfs, path, &mut XmlLoader::new())
    }

    fn load_file_with<'s>(
        &'s self,
        vfs: &dyn Vfs,
        path: &str,
        loader: &mut XmlLoader<TextContext<'s>>,
    ) -> Result<(), DataLoadError> {
        parse_document(vfs, path, loader, TextContext::Root { store: self })
    }

    pub fn language(&self) -> u32 {
        self.language.load(Ordering::Acquire)
    }

    pub fn set_language(&self, language: u32) {
        self.language.store(language, Ordering::Release);
    }

    pub fn page(&self, id: i32) -> Option<Arc<TextPage>> {
        self.pages.read().get(&id).cloned()
    }

    pub fn page_or_insert(&self, id: i32) -> Arc<TextPage> {
        if let Some(page) = self.page(id) {
            return page;
        }
        Arc::clone(
            self.pages
                .write()
                .entry(id)
                .or_insert_with(|| Arc::new(TextPage::new(id))),
        )
    }

    pub fn page_count(&self) -> usize {
        self.pages.read().len()
    }

    /// Resolve a text in the current language.
    ///
    /// Missing entries resolve to the empty string; references are expanded
    /// recursively, at most [`MAX_REFERENCE_DEPTH`] levels deep.
    pub fn text(&self, id: TextId) -> String {
        let mut out = String::new();
        let mut truncated = false;
        self.resolve(id, self.language(), 0, &mut out, &mut truncated);
        if truncated {
            warn!("text {id} references nest deeper than {MAX_REFERENCE_DEPTH}, truncated");
        }
        out
    }

    fn resolve(&self, id: TextId, language: u32, depth: usize, out: &mut String, truncated: &mut bool) {
        if depth > MAX_REFERENCE_DEPTH {
            *truncated = true;
            return;
        }
        let Some(text) = self.page(id.page).and_then(|page| page.text(id.text)) else {
            return;
        };
        let Some(links) = text.links_with_fallback(language) else {
            return;
        };
        for link in links {
            match link {
                TextLink::Literal(s) => out.push_str(&s),
                TextLink::Reference(target) => self.resolve(target, language, depth + 1, out, truncated),
            }
        }
    }

    /// Register `content` as a new entry on [`UNKNOWN_PAGE`] and return its id.
    pub fn add_text(&self, content: &str) -> TextId {
        let page = self.page_or_insert(UNKNOWN_PAGE);
        let id = self.next_unknown.fetch_add(1, Ordering::AcqRel);
        page.text_or_insert(id)
            .set_links(DEFAULT_LANGUAGE, parse_text(content));
        TextId::new(UNKNOWN_PAGE, id)
    }
}

/// Language files of the base game followed by those of every extension.
pub fn text_files(vfs: &dyn Vfs, config: &LoaderConfig) -> Result<Vec<String>, DataLoadError> {
    let base = vfs.open_dir("/t").ok_or_else(|| DataLoadError::MissingDirectory {
        path: "/t".to_string(),
    })?;
    let mut files: Vec<String> = base
        .files()
        .filter(|name| TEXT_FILE.is_match(name))
        .map(|name| base.abs_path(name))
        .collect();

    for ext in vfs::extension_names(vfs, config) {
        let Some(dir) = vfs.open_dir(&vfs::extension_path(&ext, "t")) else {
            continue;
        };
        files.extend(
            dir.files()
                .filter(|name| TEXT_FILE.is_match(name))
                .map(|name| dir.abs_path(name)),
        );
    }
    Ok(files)
}

// ===========================================================================
// Text grammar
// ===========================================================================

/// Split raw text content into literal and reference links.
///
/// Parenthesized comments are removed first; literal spans are then
/// escape-decoded.
pub fn parse_text(content: &str) -> Vec<TextLink> {
    let stripped = COMMENT.replace_all(content, "");
    let mut links = Vec::new();
    let mut rest: &str = &stripped;

    while !rest.is_empty() {
        let Some(caps) = REFERENCE.captures(rest) else {
            links.push(TextLink::Literal(parse_escape(rest)));
            break;
        };
        let Some(whole) = caps.get(0) else { break };
        if whole.start() > 0 {
            links.push(TextLink::Literal(parse_escape(&rest[..whole.start()])));
        }
        match (caps[1].parse(), caps[2].parse()) {
            (Ok(page), Ok(text)) => links.push(TextLink::Reference(TextId::new(page, text))),
            _ => links.push(TextLink::Literal(whole.as_str().to_string())),
        }
        rest = &rest[whole.end()..];
    }
    links
}

/// Decode backslash escapes.
///
/// Supports `\n \r \t \v \a \b \f`, `\xHH` (one or two hex digits), octal
/// `\ddd` (one to three digits, `\0` alone is NUL). Any other escaped
/// character stands for itself; a trailing lone backslash is dropped.
pub fn parse_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'x' => {
                let mut value = 0u32;
                let mut digits = 0;
                while digits < 2 {
                    let Some(d) = chars.peek().and_then(|c| c.to_digit(16)) else {
                        break;
                    };
                    value = value * 16 + d;
                    chars.next();
                    digits += 1;
                }
                if digits == 0 {
                    out.push('x');
                } else {
                    out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
            }
            '0'..='7' => {
                let mut value = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    let Some(d) = chars.peek().and_then(|c| c.to_digit(8)) else {
                        break;
                    };
                    value = value * 8 + d;
                    chars.next();
                }
                out.push(char::from_u32(value).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            other => out.push(other),
        }
    }
    out
}

/// Contexts of a language file: `<language id><page id><t id>`.
pub enum TextContext<'s> {
    Root {
        store: &'s TextStore,
    },
    Language {
        store: &'s TextStore,
        language: u32,
    },
    Page {
        language: u32,
        page: Arc<TextPage>,
    },
    Entry {
        language: u32,
        text: Arc<Text>,
        buffer: String,
        seen: bool,
    },
    Skip,
}

impl<'s> Context for TextContext<'s> {
    type Value = ScratchValue;

    fn skip() -> Self {
        TextContext::Skip
    }

    fn on_start_element(
        &mut self,
        cursor: &mut Cursor<'_, Self>,
        name: &str,
        attrs: &Attributes,
    ) -> Result<(), ParseError> {
        match self {
            TextContext::Root { store } => {
                if name != "language" {
                    return Err(ParseError::rejected(name, "expected <language> document"));
                }
                let language = attrs
                    .require(name, "id")?
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::rejected(name, "invalid language id"))?;
                cursor.push(TextContext::Language {
                    store: *store,
                    language,
                });
            }
            TextContext::Language { store, language } if name == "page" => {
                match attrs.parse::<i32>("id") {
                    Some(id) => cursor.push(TextContext::Page {
                        language: *language,
                        page: store.page_or_insert(id),
                    }),
                    None => {
                        warn!("<page> without a valid id ignored");
                        cursor.skip();
                    }
                }
            }
            TextContext::Page { language, page } if name == "t" => match attrs.parse::<i32>("id") {
                Some(id) => cursor.push(TextContext::Entry {
                    language: *language,
                    text: page.text_or_insert(id),
                    buffer: String::new(),
                    seen: false,
                }),
                None => {
                    warn!("<t> without a valid id on page {} ignored", page.id());
                    cursor.skip();
                }
            },
            _ => cursor.skip(),
        }
        Ok(())
    }

    fn on_characters(&mut self, _scratch: &CatalogScratch, text: &str) -> Result<(), ParseError> {
        if let TextContext::Entry { buffer, seen, .. } = self {
            buffer.push_str(text);
            *seen = true;
        }
        Ok(())
    }

    fn on_end_element(&mut self, _scratch: &CatalogScratch, _name: &str) -> Result<(), ParseError> {
        if let TextContext::Entry {
            language,
            text,
            buffer,
            seen: true,
        } = self
        {
            text.set_links(*language, parse_text(buffer));
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
