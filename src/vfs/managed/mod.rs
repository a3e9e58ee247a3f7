//! Nodes backed by a permission-checked managed storage.
//!
//! The storage itself sits behind the [`ManagedStorage`] trait: it owns the records and their
//! permission bits, and it keeps a listing index that may lag behind out-of-band changes until
//! a folder is synced. [`MapStorage`] is the in-memory implementation.

use std::any::Any;
use std::cell::{Cell, OnceCell};
use std::fmt;
use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::core::{Entries, Entry, EntryType, Error, File, Folder, Node, Permissions, Result};
use crate::core::{generic, utils};

mod map_storage;

pub use map_storage::MapStorage;

pub type ManagedResult<T> = std::result::Result<T, ManagedError>;

/// Lazy listing returned by [`ManagedStorage::list`].
pub type ManagedEntries = Box<dyn Iterator<Item = ManagedResult<ManagedEntry>>>;

/// Failure reported by a managed storage.
#[derive(Debug, Error)]
pub enum ManagedError {
    /// The storage refuses the operation for the current principal.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ManagedError> for Error {
    fn from(err: ManagedError) -> Self {
        match err {
            ManagedError::Forbidden(path) => Error::NotPermitted(path),
            ManagedError::NotFound(path) => Error::NotFound(path),
            ManagedError::AlreadyExists(path) => Error::AlreadyExists(path),
            ManagedError::Other(err) => Error::Other(err),
        }
    }
}

/// Record of one node as reported by the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedEntry {
    pub path: String,
    pub kind: EntryType,
    pub permissions: Permissions,
}

/// Boundary to the embedding system's storage.
///
/// All paths are absolute and normalized. Implementations use interior mutability: the
/// storage is shared by every node through an `Rc`.
pub trait ManagedStorage {
    /// Current record of a node, including its permission bits.
    fn stat(&self, path: &str) -> ManagedResult<ManagedEntry>;

    /// Children of a folder as recorded in the storage's index.
    fn list(&self, path: &str) -> ManagedResult<ManagedEntries>;

    fn read(&self, path: &str) -> ManagedResult<Vec<u8>>;

    fn write(&self, path: &str, data: &[u8]) -> ManagedResult<()>;

    /// Creates an empty file, creating missing parent folders.
    fn create_file(&self, path: &str) -> ManagedResult<()>;

    /// Creates a folder, creating missing parent folders.
    fn create_folder(&self, path: &str) -> ManagedResult<()>;

    /// Deletes a node and, for folders, everything below it.
    fn delete(&self, path: &str) -> ManagedResult<()>;

    /// Moves a node (and its subtree) to a new path inside the same storage.
    fn rename(&self, from: &str, to: &str) -> ManagedResult<()>;

    /// Duplicates a node (and its subtree) inside the same storage.
    fn copy(&self, from: &str, to: &str) -> ManagedResult<()>;

    /// Reconciles the index of a folder (and its subtree when `recursive`) with the storage.
    fn scan(&self, path: &str, recursive: bool) -> ManagedResult<()>;
}

/// A folder of a managed storage.
///
/// Listings come from the storage's index. A folder starts out with
/// [`needs_sync`](Self::needs_sync) set unless it was produced by a folder that was synced
/// recursively; listing such a folder does not sync it implicitly.
pub struct ManagedFolder {
    storage: Rc<dyn ManagedStorage>,
    path: String,
    needs_sync: Cell<bool>,
    synced_recursively: Cell<bool>,
    parent: OnceCell<Box<dyn Folder>>,
}

/// A file of a managed storage.
pub struct ManagedFile {
    storage: Rc<dyn ManagedStorage>,
    path: String,
    parent: OnceCell<Box<dyn Folder>>,
}

impl ManagedFolder {
    /// Opens the root folder of `storage`.
    pub fn root(storage: Rc<dyn ManagedStorage>) -> Result<Self> {
        Self::open(storage, "/")
    }

    /// Opens the folder at `path`. Fails with `NotFound` if the node is missing or is a file.
    pub fn open(storage: Rc<dyn ManagedStorage>, path: &str) -> Result<Self> {
        let path = utils::join("/", path);
        let entry = storage.stat(&path)?;
        if entry.kind != EntryType::Folder {
            return Err(Error::NotFound(format!("folder {} does not exist", path)));
        }
        Ok(Self::from_parts(storage, path, false))
    }

    fn from_parts(storage: Rc<dyn ManagedStorage>, path: String, synced: bool) -> Self {
        Self {
            storage,
            path,
            needs_sync: Cell::new(!synced),
            synced_recursively: Cell::new(synced),
            parent: OnceCell::new(),
        }
    }

    /// `true` until the folder has been synced (directly or through a recursive ancestor).
    pub fn needs_sync(&self) -> bool {
        self.needs_sync.get()
    }

    pub fn storage(&self) -> &Rc<dyn ManagedStorage> {
        &self.storage
    }

    /// Returns the target as a folder of the same storage instance, if it is one.
    fn same_storage<'a>(&self, target: &'a dyn Folder) -> Option<&'a ManagedFolder> {
        same_storage(&self.storage, target)
    }

    fn make_entry(&self, entry: ManagedEntry) -> Entry {
        make_entry(&self.storage, entry, self.synced_recursively.get())
    }
}

impl ManagedFile {
    /// Opens the file at `path`. Fails with `NotFound` if the node is missing or is a folder.
    pub fn open(storage: Rc<dyn ManagedStorage>, path: &str) -> Result<Self> {
        let path = utils::join("/", path);
        let entry = storage.stat(&path)?;
        if entry.kind != EntryType::File {
            return Err(Error::NotFound(format!("file {} does not exist", path)));
        }
        Ok(Self::from_parts(storage, path))
    }

    fn from_parts(storage: Rc<dyn ManagedStorage>, path: String) -> Self {
        Self {
            storage,
            path,
            parent: OnceCell::new(),
        }
    }
}

impl Node for ManagedFolder {
    fn path(&self) -> &str {
        &self.path
    }

    fn parent_node(&self) -> Result<&dyn Folder> {
        cached_parent(&self.parent, &self.storage, &self.path)
    }

    fn permissions(&self) -> Permissions {
        storage_permissions(self.storage.as_ref(), &self.path)
    }

    fn rename(&mut self, new_name: &str) -> Result<()> {
        let renamed = rename_in_storage(&*self, self.storage.as_ref(), new_name)?;
        self.path = renamed;
        self.parent = OnceCell::new();
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        if utils::is_root(&self.path) {
            return Err(Error::NotPermitted("the root cannot be deleted".to_string()));
        }
        delete_in_storage(self, self.storage.as_ref())
    }

    fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        let Some(managed) = self.same_storage(target) else {
            return generic::copy(self, target, new_name);
        };
        let destination = prepare_destination(self, managed, new_name)?;
        assert_not_nested(&self.path, &destination)?;
        self.storage.copy(&self.path, &destination)?;
        debug!("copied folder {} to {}", self.path, destination);
        Ok(Entry::Folder(Box::new(ManagedFolder::from_parts(
            self.storage.clone(),
            destination,
            false,
        ))))
    }

    fn move_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        let Some(managed) = self.same_storage(target) else {
            return generic::move_node(self, target, new_name);
        };
        assert_movable(self)?;
        let destination = prepare_destination(self, managed, new_name)?;
        assert_not_nested(&self.path, &destination)?;
        self.storage.rename(&self.path, &destination)?;
        debug!("moved folder {} to {}", self.path, destination);
        Ok(Entry::Folder(Box::new(ManagedFolder::from_parts(
            self.storage.clone(),
            destination,
            false,
        ))))
    }

    fn as_folder(&self) -> Option<&dyn Folder> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Folder for ManagedFolder {
    fn exists(&self, path: &str) -> bool {
        self.storage.stat(&utils::join(&self.path, path)).is_ok()
    }

    fn get(&self, path: &str) -> Result<Entry> {
        let entry = self.storage.stat(&utils::join(&self.path, path))?;
        Ok(self.make_entry(entry))
    }

    /// Lazily wraps each indexed child as a node.
    ///
    /// A folder that still needs a sync is listed as the index currently stands.
    fn entries(&self) -> Result<Entries> {
        if self.needs_sync.get() {
            debug!("listing {} before it was synced", self.path);
        }
        let listed = self.storage.list(&self.path)?;
        let storage = self.storage.clone();
        let synced = self.synced_recursively.get();

        Ok(Box::new(listed.map(move |item| {
            item.map(|entry| make_entry(&storage, entry, synced))
                .map_err(Error::from)
        })))
    }

    fn new_file(&self, path: &str) -> Result<Box<dyn File>> {
        let target = prepare_child(self, path)?;
        self.storage.create_file(&target)?;
        debug!("created file {}", target);
        Ok(Box::new(ManagedFile::from_parts(self.storage.clone(), target)))
    }

    fn new_folder(&self, path: &str) -> Result<Box<dyn Folder>> {
        let target = prepare_child(self, path)?;
        self.storage.create_folder(&target)?;
        debug!("created folder {}", target);
        Ok(Box::new(ManagedFolder::from_parts(
            self.storage.clone(),
            target,
            self.synced_recursively.get(),
        )))
    }

    /// Rescans the folder in the storage and clears the `needs_sync` flag.
    ///
    /// # Errors
    /// * `NotPermitted` - the storage forbids scanning this folder.
    /// * `NotFound` - the folder no longer exists.
    fn sync(&self, recursive: bool) -> Result<()> {
        self.storage.scan(&self.path, recursive)?;
        self.needs_sync.set(false);
        if recursive {
            self.synced_recursively.set(true);
        }
        debug!("synced {} (recursive: {})", self.path, recursive);
        Ok(())
    }
}

impl Node for ManagedFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn parent_node(&self) -> Result<&dyn Folder> {
        cached_parent(&self.parent, &self.storage, &self.path)
    }

    fn permissions(&self) -> Permissions {
        storage_permissions(self.storage.as_ref(), &self.path)
    }

    fn rename(&mut self, new_name: &str) -> Result<()> {
        let renamed = rename_in_storage(&*self, self.storage.as_ref(), new_name)?;
        self.path = renamed;
        self.parent = OnceCell::new();
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        delete_in_storage(self, self.storage.as_ref())
    }

    fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        let Some(managed) = same_storage(&self.storage, target) else {
            return generic::copy(self, target, new_name);
        };
        if !self.is_readable() {
            return Err(Error::NotPermitted(format!("{} is not readable", self.path)));
        }
        let destination = prepare_destination(self, managed, new_name)?;
        self.storage.copy(&self.path, &destination)?;
        debug!("copied file {} to {}", self.path, destination);
        Ok(Entry::File(Box::new(ManagedFile::from_parts(
            self.storage.clone(),
            destination,
        ))))
    }

    fn move_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        let Some(managed) = same_storage(&self.storage, target) else {
            return generic::move_node(self, target, new_name);
        };
        assert_movable(self)?;
        let destination = prepare_destination(self, managed, new_name)?;
        self.storage.rename(&self.path, &destination)?;
        debug!("moved file {} to {}", self.path, destination);
        Ok(Entry::File(Box::new(ManagedFile::from_parts(
            self.storage.clone(),
            destination,
        ))))
    }

    fn as_file(&self) -> Option<&dyn File> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl File for ManagedFile {
    fn content(&self) -> Result<Vec<u8>> {
        if !self.is_readable() {
            return Err(Error::NotPermitted(format!("{} is not readable", self.path)));
        }
        Ok(self.storage.read(&self.path)?)
    }

    fn put_content(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_updateable() {
            return Err(Error::NotPermitted(format!("{} is read-only", self.path)));
        }
        Ok(self.storage.write(&self.path, data)?)
    }
}

impl fmt::Debug for ManagedFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedFolder")
            .field("path", &self.path)
            .field("needs_sync", &self.needs_sync.get())
            .finish()
    }
}

impl fmt::Debug for ManagedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedFile")
            .field("path", &self.path)
            .finish()
    }
}

fn make_entry(storage: &Rc<dyn ManagedStorage>, entry: ManagedEntry, synced: bool) -> Entry {
    match entry.kind {
        EntryType::File => Entry::File(Box::new(ManagedFile::from_parts(
            storage.clone(),
            entry.path,
        ))),
        EntryType::Folder => Entry::Folder(Box::new(ManagedFolder::from_parts(
            storage.clone(),
            entry.path,
            synced,
        ))),
    }
}

/// Permission bits are read from the storage on every call. A node the storage refuses to
/// describe has no permissions.
fn storage_permissions(storage: &dyn ManagedStorage, path: &str) -> Permissions {
    match storage.stat(path) {
        Ok(entry) => entry.permissions,
        Err(err) => {
            debug!("no permissions for {}: {}", path, err);
            Permissions::empty()
        }
    }
}

fn cached_parent<'a>(
    slot: &'a OnceCell<Box<dyn Folder>>,
    storage: &Rc<dyn ManagedStorage>,
    path: &str,
) -> Result<&'a dyn Folder> {
    if let Some(parent) = slot.get() {
        return Ok(parent.as_ref());
    }
    let parent: Box<dyn Folder> = Box::new(ManagedFolder::from_parts(
        storage.clone(),
        utils::parent(path)?,
        false,
    ));
    Ok(slot.get_or_init(|| parent).as_ref())
}

fn same_storage<'a>(
    storage: &Rc<dyn ManagedStorage>,
    target: &'a dyn Folder,
) -> Option<&'a ManagedFolder> {
    target
        .as_any()
        .downcast_ref::<ManagedFolder>()
        .filter(|managed| std::ptr::addr_eq(Rc::as_ptr(storage), Rc::as_ptr(&managed.storage)))
}

fn prepare_child(folder: &ManagedFolder, path: &str) -> Result<String> {
    let target = utils::join(&folder.path, path);
    if folder.storage.stat(&target).is_ok() {
        return Err(Error::AlreadyExists(target));
    }
    if !folder.is_creatable() {
        return Err(Error::NotPermitted(format!(
            "cannot create {} in {}",
            target, folder.path
        )));
    }
    Ok(target)
}

/// Validates a destination name inside a managed folder and returns the destination path.
fn prepare_destination(
    node: &dyn Node,
    target: &ManagedFolder,
    new_name: Option<&str>,
) -> Result<String> {
    let name = new_name.unwrap_or_else(|| node.name());
    utils::assert_valid_file_name(name)?;
    if !target.is_creatable() {
        return Err(Error::NotPermitted(format!(
            "cannot create {} in {}",
            name, target.path
        )));
    }
    let destination = utils::join(&target.path, name);
    if target.storage.stat(&destination).is_ok() {
        return Err(Error::AlreadyExists(destination));
    }
    Ok(destination)
}

fn assert_movable(node: &dyn Node) -> Result<()> {
    if !node.is_deletable() {
        return Err(Error::NotPermitted(format!("{} cannot be deleted", node.path())));
    }
    Ok(())
}

fn assert_not_nested(source: &str, destination: &str) -> Result<()> {
    if destination.starts_with(&format!("{}/", source)) {
        return Err(Error::InvalidPath(format!(
            "cannot copy {} into itself",
            source
        )));
    }
    Ok(())
}

fn rename_in_storage(node: &dyn Node, storage: &dyn ManagedStorage, new_name: &str) -> Result<String> {
    utils::assert_valid_file_name(new_name)?;
    if !node.is_updateable() {
        return Err(Error::NotPermitted(format!("{} is read-only", node.path())));
    }

    let parent = node.parent()?;
    if !storage_permissions(storage, &parent).contains(Permissions::CREATE) {
        return Err(Error::NotPermitted(format!(
            "cannot create {} in {}",
            new_name, parent
        )));
    }

    let target = utils::join(&parent, new_name);
    if storage.stat(&target).is_ok() {
        return Err(Error::AlreadyExists(target));
    }
    storage.rename(node.path(), &target)?;
    debug!("renamed {} to {}", node.path(), target);
    Ok(target)
}

fn delete_in_storage(node: &dyn Node, storage: &dyn ManagedStorage) -> Result<()> {
    if !node.is_deletable() {
        return Err(Error::NotPermitted(format!("{} cannot be deleted", node.path())));
    }
    storage.delete(node.path())?;
    debug!("deleted {}", node.path());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::LocalFolder;
    use tempdir::TempDir;

    fn setup_storage() -> (Rc<MapStorage>, ManagedFolder) {
        let storage = Rc::new(MapStorage::new());
        let root = ManagedFolder::root(storage.clone()).unwrap();
        (storage, root)
    }

    fn names(folder: &dyn Folder) -> Vec<String> {
        folder
            .listing()
            .unwrap()
            .iter()
            .map(|entry| entry.name().to_string())
            .collect()
    }

    mod creations {
        use super::*;

        #[test]
        fn test_open_nodes() -> anyhow::Result<()> {
            let (storage, root) = setup_storage();
            root.new_file("docs/a.txt")?;

            let docs = ManagedFolder::open(storage.clone(), "docs")?;
            assert_eq!(docs.path(), "/docs");
            let file = ManagedFile::open(storage.clone(), "/docs/a.txt")?;
            assert_eq!(file.name(), "a.txt");

            assert!(matches!(
                ManagedFolder::open(storage.clone(), "/docs/a.txt"),
                Err(Error::NotFound(_))
            ));
            assert!(matches!(
                ManagedFile::open(storage, "/missing"),
                Err(Error::NotFound(_))
            ));

            Ok(())
        }

        #[test]
        fn test_new_nodes_and_content() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();

            let mut file = root.new_file("docs/readme.md")?;
            file.put_content(b"# Title")?;
            assert_eq!(file.content()?, b"# Title");
            assert_eq!(file.size()?, 7);
            assert_eq!(file.extension(), Some("md"));

            root.new_folder("docs/img")?;
            let docs = root.get("docs")?.into_folder().unwrap();
            assert_eq!(names(docs.as_ref()), vec!["img", "readme.md"]);

            assert!(matches!(root.new_file("docs/readme.md"), Err(Error::AlreadyExists(_))));
            assert!(matches!(root.new_folder("docs"), Err(Error::AlreadyExists(_))));

            Ok(())
        }

        #[test]
        fn test_exists_and_get() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();
            root.new_file("a/b.txt")?;

            assert!(root.exists("a/./b.txt"));
            assert!(!root.exists("a/c.txt"));
            assert!(root.get("a")?.is_folder());
            assert!(root.get("a/b.txt")?.is_file());
            assert!(matches!(root.get("zzz"), Err(Error::NotFound(_))));

            Ok(())
        }
    }

    mod sync {
        use super::*;

        #[test]
        fn test_needs_sync_until_synced() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();
            assert!(root.needs_sync());

            root.sync(false)?;
            assert!(!root.needs_sync());

            Ok(())
        }

        #[test]
        fn test_stale_listing_until_sync() -> anyhow::Result<()> {
            let (storage, root) = setup_storage();
            root.new_file("docs/a.txt")?;
            let docs = ManagedFolder::open(storage.clone(), "/docs")?;

            storage.insert_external("/docs/b.txt", b"B")?;
            assert_eq!(names(&docs), vec!["a.txt"]);

            docs.sync(false)?;
            assert_eq!(names(&docs), vec!["a.txt", "b.txt"]);

            Ok(())
        }

        #[test]
        fn test_recursive_sync_marks_children_synced() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();
            root.new_folder("a/b")?;

            root.sync(false)?;
            let child = root.get("a")?.into_folder().unwrap();
            let child = child.as_any().downcast_ref::<ManagedFolder>().unwrap();
            assert!(child.needs_sync(), "a shallow sync does not cover children");

            root.sync(true)?;
            let child = root.get("a")?.into_folder().unwrap();
            let child = child.as_any().downcast_ref::<ManagedFolder>().unwrap();
            assert!(!child.needs_sync());

            let grandchild = child.get("b")?.into_folder().unwrap();
            let grandchild = grandchild.as_any().downcast_ref::<ManagedFolder>().unwrap();
            assert!(!grandchild.needs_sync());

            Ok(())
        }

        #[test]
        fn test_forbidden_sync() -> anyhow::Result<()> {
            let (storage, root) = setup_storage();
            let secret = root.new_folder("secret")?;
            storage.forbid("/secret");

            assert!(matches!(secret.sync(true), Err(Error::NotPermitted(_))));
            assert!(secret.permissions().is_empty());
            assert!(!root.exists("secret"));

            Ok(())
        }
    }

    mod permissions {
        use super::*;

        #[test]
        fn test_read_only_file() -> anyhow::Result<()> {
            let (storage, root) = setup_storage();
            let mut file = root.new_file("locked.txt")?;
            file.put_content(b"original")?;
            storage.set_permissions("/locked.txt", Permissions::READ)?;

            assert!(matches!(file.put_content(b"new"), Err(Error::NotPermitted(_))));
            assert!(matches!(file.rename("other.txt"), Err(Error::NotPermitted(_))));
            assert!(matches!(file.delete(), Err(Error::NotPermitted(_))));
            assert_eq!(file.path(), "/locked.txt");
            assert_eq!(file.content()?, b"original");

            Ok(())
        }

        #[test]
        fn test_unreadable_file() -> anyhow::Result<()> {
            let (storage, root) = setup_storage();
            let file = root.new_file("hidden.txt")?;
            storage.set_permissions("/hidden.txt", Permissions::empty())?;

            assert!(!file.is_readable());
            assert!(matches!(file.content(), Err(Error::NotPermitted(_))));

            Ok(())
        }

        #[test]
        fn test_folder_without_create() -> anyhow::Result<()> {
            let (storage, root) = setup_storage();
            let folder = root.new_folder("closed")?;
            storage.set_permissions("/closed", Permissions::READ | Permissions::DELETE)?;

            assert!(!folder.is_creatable());
            assert!(matches!(folder.new_file("a.txt"), Err(Error::NotPermitted(_))));
            assert!(matches!(folder.new_folder("sub"), Err(Error::NotPermitted(_))));
            assert!(!folder.exists("a.txt"));

            Ok(())
        }

        #[test]
        fn test_same_location_same_permissions() -> anyhow::Result<()> {
            let (storage, root) = setup_storage();
            let created = root.new_file("a.txt")?;
            let opened = ManagedFile::open(storage.clone(), "/a.txt")?;
            storage.set_permissions("/a.txt", Permissions::READ)?;

            assert_eq!(created.permissions(), opened.permissions());
            assert_eq!(created.permissions(), Permissions::READ);

            Ok(())
        }

        #[test]
        fn test_root_is_not_deletable() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();

            assert!(!root.is_deletable());
            assert!(matches!(root.delete(), Err(Error::NotPermitted(_))));

            Ok(())
        }
    }

    mod rename_delete {
        use super::*;

        #[test]
        fn test_rename_folder() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();
            root.new_file("old/a.txt")?;
            let mut folder = root.get("old")?.into_folder().unwrap();

            folder.rename("new")?;
            assert_eq!(folder.path(), "/new");
            assert!(root.exists("new/a.txt"));
            assert!(!root.exists("old"));

            Ok(())
        }

        #[test]
        fn test_rename_rejects_bad_names() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();
            let mut file = root.new_file("keep.txt")?;
            root.new_file("taken.txt")?;

            assert!(matches!(file.rename(".."), Err(Error::InvalidPath(_))));
            assert!(matches!(file.rename("x/y"), Err(Error::InvalidPath(_))));
            assert!(matches!(file.rename("taken.txt"), Err(Error::AlreadyExists(_))));
            assert_eq!(file.path(), "/keep.txt");

            Ok(())
        }

        #[test]
        fn test_delete_and_truncate() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();
            root.new_file("box/a.txt")?;
            root.new_file("box/inner/b.txt")?;
            let file = root.new_file("loose.txt")?;

            file.delete()?;
            assert!(!root.exists("loose.txt"));

            let folder = root.get("box")?.into_folder().unwrap();
            folder.truncate()?;
            assert!(root.exists("box"));
            assert!(folder.listing()?.is_empty());

            folder.delete()?;
            assert!(!root.exists("box"));

            Ok(())
        }
    }

    mod copy_move {
        use super::*;

        #[test]
        fn test_native_copy_and_move() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();
            root.new_file("src/a.txt")?.put_content(b"A")?;
            let dst = root.new_folder("dst")?;

            let source = root.get("src")?;
            let copy = source.copy_to(dst.as_ref(), None)?;
            assert_eq!(copy.path(), "/dst/src");
            assert!(root.exists("src/a.txt"));
            assert!(root.exists("dst/src/a.txt"));

            let moved = source.move_to(dst.as_ref(), Some("moved"))?;
            assert_eq!(moved.path(), "/dst/moved");
            assert!(!root.exists("src"));
            let a = root.get("dst/moved/a.txt")?.into_file().unwrap();
            assert_eq!(a.content()?, b"A");

            Ok(())
        }

        #[test]
        fn test_copy_into_itself_fails() -> anyhow::Result<()> {
            let (_storage, root) = setup_storage();
            let outer = root.new_folder("outer")?;
            let inner = root.new_folder("outer/inner")?;

            assert!(matches!(
                outer.copy_to(inner.as_ref(), None),
                Err(Error::InvalidPath(_))
            ));

            Ok(())
        }

        #[test]
        fn test_move_requires_delete_on_source() -> anyhow::Result<()> {
            let (storage, root) = setup_storage();
            let file = root.new_file("pinned.txt")?;
            let dst = root.new_folder("dst")?;
            storage.set_permissions("/pinned.txt", Permissions::READ | Permissions::UPDATE)?;

            assert!(matches!(file.move_to(dst.as_ref(), None), Err(Error::NotPermitted(_))));
            assert!(!dst.exists("pinned.txt"));

            Ok(())
        }

        #[test]
        fn test_copy_between_storages_is_generic() -> anyhow::Result<()> {
            let (_first, source_root) = setup_storage();
            let (_second, target_root) = setup_storage();
            source_root.new_file("pack/deep/x.txt")?.put_content(b"X")?;

            let pack = source_root.get("pack")?;
            pack.copy_to(&target_root, None)?;

            let x = target_root.get("pack/deep/x.txt")?.into_file().unwrap();
            assert_eq!(x.content()?, b"X");

            Ok(())
        }

        #[test]
        fn test_move_managed_to_local() -> anyhow::Result<()> {
            let temp_dir = TempDir::new("managed_test")?;
            let local = LocalFolder::new(temp_dir.path())?;
            let (_storage, root) = setup_storage();
            root.new_file("out/report.csv")?.put_content(b"a,b")?;

            let out = root.get("out")?;
            out.move_to(&local, None)?;

            assert!(!root.exists("out"));
            assert_eq!(std::fs::read(temp_dir.path().join("out/report.csv"))?, b"a,b");

            Ok(())
        }

        #[test]
        fn test_generic_copy_stops_at_first_failure() -> anyhow::Result<()> {
            let (storage, source_root) = setup_storage();
            let (_second, target_root) = setup_storage();
            source_root.new_file("pack/a.txt")?.put_content(b"A")?;
            source_root.new_file("pack/b.txt")?.put_content(b"B")?;
            storage.set_permissions("/pack/b.txt", Permissions::empty())?;

            let pack = source_root.get("pack")?;
            let result = pack.copy_to(&target_root, None);

            assert!(matches!(result, Err(Error::NotPermitted(_))));
            assert!(target_root.exists("pack/a.txt"), "already copied children stay");
            assert!(!target_root.exists("pack/b.txt"));

            Ok(())
        }
    }
}
