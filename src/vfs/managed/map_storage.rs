//! In-memory [`ManagedStorage`] with a separate listing index.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use anyhow::anyhow;
use log::debug;

use super::{ManagedEntries, ManagedEntry, ManagedError, ManagedResult, ManagedStorage};
use crate::core::{EntryType, Permissions, utils};

/// A managed storage that keeps file and folder records in memory.
///
/// `MapStorage` models an embedding system with two layers: the physical records and a
/// metadata index built from them. Every API mutation updates both layers. Out-of-band changes
/// made with [`insert_external`](Self::insert_external) and
/// [`remove_external`](Self::remove_external) touch only the physical layer, so `list()`
/// keeps reporting the old state until the folder is rescanned with `scan()`.
///
/// ### Internal state
///
/// * `nodes` - physical records keyed by inner absolute normalized paths.
///   - Uses `BTreeMap` for ordered traversal and prefix-based subtree operations.
/// * `index` - what `list()` reports; path → kind.
/// * `forbidden` - subtrees on which every operation fails with `Forbidden`.
///
/// ### Invariants
///
/// 1. **Root existence**: `/` is always present in both layers and is a folder.
/// 2. **Path normalization**: all keys are normalized (no `..`, no `//`, no trailing `/`).
/// 3. **Parent consistency**: a physical record at `/a/b/c` implies a folder record `/a/b`.
///
/// ### Thread Safety
///
/// Not thread-safe; state lives in a `RefCell` and the storage is shared through `Rc`.
///
/// ### Example
///
/// ```no_run
/// use std::rc::Rc;
/// use vfs_nodes::{Folder, ManagedFolder, MapStorage};
///
/// let storage = Rc::new(MapStorage::new());
/// let root = ManagedFolder::root(storage.clone()).unwrap();
/// root.new_file("docs/note.txt").unwrap();
///
/// storage.insert_external("/docs/late.txt", b"out of band").unwrap();
/// assert!(!root.get("docs").unwrap().as_folder().unwrap().listing().unwrap()
///     .iter().any(|e| e.name() == "late.txt"));
/// ```
pub struct MapStorage {
    state: RefCell<State>,
}

struct State {
    nodes: BTreeMap<String, Record>,
    index: BTreeMap<String, EntryType>,
    forbidden: BTreeSet<String>,
}

#[derive(Clone)]
struct Record {
    kind: EntryType,
    content: Vec<u8>,
    permissions: Permissions,
}

impl Record {
    fn new(kind: EntryType) -> Self {
        let permissions = match kind {
            EntryType::Folder => Permissions::all(),
            EntryType::File => Permissions::READ | Permissions::UPDATE | Permissions::DELETE,
        };
        Self {
            kind,
            content: Vec::new(),
            permissions,
        }
    }
}

impl MapStorage {
    /// Creates a storage holding only the root folder.
    pub fn new() -> Self {
        let mut root = Record::new(EntryType::Folder);
        root.permissions.set(Permissions::DELETE, false);

        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), root);
        let mut index = BTreeMap::new();
        index.insert("/".to_string(), EntryType::Folder);

        Self {
            state: RefCell::new(State {
                nodes,
                index,
                forbidden: BTreeSet::new(),
            }),
        }
    }

    /// Adds a file to the physical layer only, creating missing parent folders there.
    /// The index is not touched until the parent folder is scanned.
    pub fn insert_external(&self, path: &str, content: &[u8]) -> ManagedResult<()> {
        let path = utils::join("/", path);
        let mut state = self.state.borrow_mut();
        if state.nodes.contains_key(&path) {
            return Err(ManagedError::AlreadyExists(path));
        }
        for ancestor in state.missing_ancestors(&path)? {
            state.nodes.insert(ancestor, Record::new(EntryType::Folder));
        }
        let mut record = Record::new(EntryType::File);
        record.content = content.to_vec();
        state.nodes.insert(path, record);
        Ok(())
    }

    /// Removes a node and its subtree from the physical layer only.
    pub fn remove_external(&self, path: &str) -> ManagedResult<()> {
        let path = utils::join("/", path);
        let mut state = self.state.borrow_mut();
        if utils::is_root(&path) || !state.nodes.contains_key(&path) {
            return Err(ManagedError::NotFound(path));
        }
        state.nodes.retain(|key, _| !is_within(key, &path));
        Ok(())
    }

    /// Makes every operation on `path` and below fail with `Forbidden`.
    pub fn forbid(&self, path: &str) {
        self.state
            .borrow_mut()
            .forbidden
            .insert(utils::join("/", path));
    }

    /// Overrides the permission bits of one node.
    pub fn set_permissions(&self, path: &str, permissions: Permissions) -> ManagedResult<()> {
        let path = utils::join("/", path);
        let mut state = self.state.borrow_mut();
        match state.nodes.get_mut(&path) {
            Some(record) => {
                record.permissions = permissions;
                Ok(())
            }
            None => Err(ManagedError::NotFound(path)),
        }
    }

    /// Returns `true` if `path` is known to the index (what `list()` reports).
    pub fn is_indexed(&self, path: &str) -> bool {
        self.state
            .borrow()
            .index
            .contains_key(&utils::join("/", path))
    }

    /// Shared preamble of every storage call: normalization and the forbidden check.
    fn resolve(&self, path: &str) -> ManagedResult<String> {
        let path = utils::join("/", path);
        let state = self.state.borrow();
        if state.forbidden.iter().any(|root| is_within(&path, root)) {
            return Err(ManagedError::Forbidden(path));
        }
        Ok(path)
    }

    fn create(&self, path: &str, kind: EntryType) -> ManagedResult<()> {
        let path = self.resolve(path)?;
        let mut state = self.state.borrow_mut();
        if state.nodes.contains_key(&path) {
            return Err(ManagedError::AlreadyExists(path));
        }
        for ancestor in state.missing_ancestors(&path)? {
            state.insert(ancestor, Record::new(EntryType::Folder));
        }
        state.insert(path, Record::new(kind));
        Ok(())
    }

    /// Common checks of `rename` and `copy`. Returns the normalized (source, target) pair.
    fn prepare_transfer(&self, from: &str, to: &str) -> ManagedResult<(String, String)> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        let state = self.state.borrow();

        if !state.nodes.contains_key(&from) {
            return Err(ManagedError::NotFound(from));
        }
        if state.nodes.contains_key(&to) {
            return Err(ManagedError::AlreadyExists(to));
        }
        if utils::is_root(&from) || is_within(&to, &from) {
            return Err(ManagedError::Other(anyhow!(
                "cannot transfer {} into {}",
                from,
                to
            )));
        }
        let parent = utils::parent(&to).map_err(|err| ManagedError::Other(err.into()))?;
        match state.nodes.get(&parent) {
            Some(record) if record.kind == EntryType::Folder => Ok((from, to)),
            _ => Err(ManagedError::NotFound(parent)),
        }
    }
}

impl Default for MapStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    fn insert(&mut self, path: String, record: Record) {
        self.index.insert(path.clone(), record.kind);
        self.nodes.insert(path, record);
    }

    /// Ancestors of `path` that have no record yet, outermost first.
    /// Fails with `AlreadyExists` when an ancestor is a file.
    fn missing_ancestors(&self, path: &str) -> ManagedResult<Vec<String>> {
        let mut missing = Vec::new();
        let mut current = path.to_string();
        while let Ok(parent) = utils::parent(&current) {
            match self.nodes.get(&parent) {
                Some(record) if record.kind == EntryType::File => {
                    return Err(ManagedError::AlreadyExists(format!(
                        "{} exists but is not a folder",
                        parent
                    )));
                }
                Some(_) => break,
                None => missing.push(parent.clone()),
            }
            current = parent;
        }
        missing.reverse();
        Ok(missing)
    }

    /// Moves (or duplicates, when `keep_source`) a subtree in both layers.
    fn transfer(&mut self, from: &str, to: &str, keep_source: bool) {
        let moved: Vec<(String, Record)> = self
            .nodes
            .iter()
            .filter(|(key, _)| is_within(key, from))
            .map(|(key, record)| (rebase(key, from, to), record.clone()))
            .collect();

        if !keep_source {
            self.nodes.retain(|key, _| !is_within(key, from));
            self.index.retain(|key, _| !is_within(key, from));
        }
        for (path, record) in moved {
            self.insert(path, record);
        }
    }
}

impl ManagedStorage for MapStorage {
    fn stat(&self, path: &str) -> ManagedResult<ManagedEntry> {
        let path = self.resolve(path)?;
        let state = self.state.borrow();
        match state.nodes.get(&path) {
            Some(record) => Ok(ManagedEntry {
                path,
                kind: record.kind,
                permissions: record.permissions,
            }),
            None => Err(ManagedError::NotFound(path)),
        }
    }

    /// Lists the children recorded in the index, in path order.
    ///
    /// Index entries whose physical record is gone are still reported (with no permissions)
    /// until the folder is scanned again.
    fn list(&self, path: &str) -> ManagedResult<ManagedEntries> {
        let path = self.resolve(path)?;
        let state = self.state.borrow();
        if state.index.get(&path) != Some(&EntryType::Folder) {
            return Err(ManagedError::NotFound(path));
        }

        let children: Vec<ManagedEntry> = state
            .index
            .iter()
            .filter(|(key, _)| is_child(key, &path))
            .map(|(key, kind)| ManagedEntry {
                path: key.clone(),
                kind: *kind,
                permissions: state
                    .nodes
                    .get(key)
                    .map(|record| record.permissions)
                    .unwrap_or_default(),
            })
            .collect();

        Ok(Box::new(children.into_iter().map(Ok)))
    }

    fn read(&self, path: &str) -> ManagedResult<Vec<u8>> {
        let path = self.resolve(path)?;
        let state = self.state.borrow();
        match state.nodes.get(&path) {
            Some(record) if record.kind == EntryType::File => Ok(record.content.clone()),
            Some(_) => Err(ManagedError::Other(anyhow!("{} is a folder", path))),
            None => Err(ManagedError::NotFound(path)),
        }
    }

    fn write(&self, path: &str, data: &[u8]) -> ManagedResult<()> {
        let path = self.resolve(path)?;
        let mut state = self.state.borrow_mut();
        match state.nodes.get_mut(&path) {
            Some(record) if record.kind == EntryType::File => {
                record.content = data.to_vec();
                Ok(())
            }
            Some(_) => Err(ManagedError::Other(anyhow!("{} is a folder", path))),
            None => Err(ManagedError::NotFound(path)),
        }
    }

    fn create_file(&self, path: &str) -> ManagedResult<()> {
        self.create(path, EntryType::File)
    }

    fn create_folder(&self, path: &str) -> ManagedResult<()> {
        self.create(path, EntryType::Folder)
    }

    fn delete(&self, path: &str) -> ManagedResult<()> {
        let path = self.resolve(path)?;
        if utils::is_root(&path) {
            return Err(ManagedError::Forbidden(path));
        }
        let mut state = self.state.borrow_mut();
        if !state.nodes.contains_key(&path) {
            return Err(ManagedError::NotFound(path));
        }
        state.nodes.retain(|key, _| !is_within(key, &path));
        state.index.retain(|key, _| !is_within(key, &path));
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> ManagedResult<()> {
        let (from, to) = self.prepare_transfer(from, to)?;
        self.state.borrow_mut().transfer(&from, &to, false);
        Ok(())
    }

    fn copy(&self, from: &str, to: &str) -> ManagedResult<()> {
        let (from, to) = self.prepare_transfer(from, to)?;
        self.state.borrow_mut().transfer(&from, &to, true);
        Ok(())
    }

    /// Rebuilds the index entries below `path` from the physical records: direct children
    /// only, or the whole subtree when `recursive`.
    fn scan(&self, path: &str, recursive: bool) -> ManagedResult<()> {
        let path = self.resolve(path)?;
        let mut state = self.state.borrow_mut();
        match state.nodes.get(&path) {
            Some(record) if record.kind == EntryType::Folder => {}
            _ => return Err(ManagedError::NotFound(path)),
        }

        let covered = |key: &str| {
            if recursive {
                key != path && is_within(key, &path)
            } else {
                is_child(key, &path)
            }
        };

        state.index.retain(|key, _| !covered(key.as_str()));
        let found: Vec<(String, EntryType)> = state
            .nodes
            .iter()
            .filter(|(key, _)| covered(key.as_str()))
            .map(|(key, record)| (key.clone(), record.kind))
            .collect();
        debug!("scanned {} ({} entries)", path, found.len());
        state.index.extend(found);
        Ok(())
    }
}

/// `path` equals `root` or lies below it.
fn is_within(path: &str, root: &str) -> bool {
    if utils::is_root(root) {
        return true;
    }
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

fn is_child(path: &str, folder: &str) -> bool {
    !utils::is_root(path) && utils::parent(path).is_ok_and(|parent| parent == folder)
}

fn rebase(path: &str, from: &str, to: &str) -> String {
    format!("{}{}", to, &path[from.len()..])
}
