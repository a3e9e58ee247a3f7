//! Nodes backed directly by a directory on the host system.
//!
//! ### Key Features:
//! - **Isolated base**: every node path is relative to a base directory resolved once, at
//!   construction, to an absolute symlink-free path.
//! - **Stateless**: no entry tracking; every operation reads the host file system directly, so
//!   `sync()` has nothing to do.
//! - **Path normalization**: `.` and `..` are resolved and `..` never climbs above the base.
//! - **Host permissions**: permission bits come from `access(2)` checks on the host.

use std::cell::OnceCell;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, warn};

use crate::config::StorageConfig;
use crate::core::{Entries, Entry, Error, File, Folder, Node, Permissions, Result};
use crate::core::{generic, utils};

/// A folder below a host base directory.
///
/// ### Usage notes:
/// - Symlinks are followed when probing, but `delete()` removes a link, not its target.
/// - Not thread-safe: the cached parent folder is not synchronized.
///
/// ### Example:
/// ```no_run
/// use vfs_nodes::{File, Folder, LocalFolder};
///
/// let root = LocalFolder::new("/srv/data").unwrap();
/// let mut note = root.new_file("docs/note.txt").unwrap();
/// note.put_content(b"Hello").unwrap();
/// assert!(root.exists("docs/note.txt"));
/// ```
pub struct LocalFolder {
    base: Rc<Path>, // host-related absolute canonical path
    path: String,   // inner absolute normalized path
    parent: OnceCell<Box<dyn Folder>>,
}

/// A regular file below a host base directory.
pub struct LocalFile {
    base: Rc<Path>,
    path: String,
    parent: OnceCell<Box<dyn Folder>>,
}

impl LocalFolder {
    /// Opens the root folder of `base`.
    /// * `base` must be an existing directory; it is canonicalized once, here.
    pub fn new<P: AsRef<Path>>(base: P) -> Result<Self> {
        Self::open(base, "/")
    }

    /// Opens the folder at the inner `path` below `base`.
    /// Fails with `NotFound` if it does not exist or is not a directory.
    pub fn open<P: AsRef<Path>>(base: P, path: &str) -> Result<Self> {
        let base = canonical_base(base.as_ref())?;
        let path = utils::join("/", path);
        let host = utils::to_host(&base, &path);
        if !host.is_dir() {
            return Err(Error::NotFound(format!("folder {} does not exist", path)));
        }
        Ok(Self::from_parts(base, path))
    }

    /// Opens the root folder of the configured base directory.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new(&config.base_dir)
    }

    fn from_parts(base: Rc<Path>, path: String) -> Self {
        Self {
            base,
            path,
            parent: OnceCell::new(),
        }
    }

    /// Canonical host path this backend is rooted at.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn host(&self) -> PathBuf {
        utils::to_host(&self.base, &self.path)
    }

    /// Creates every missing folder between the base and the parent of `path`.
    /// Existing ancestors are reused when they are folders.
    fn create_parents(&self, path: &str) -> Result<()> {
        let parent = utils::parent(path)?;
        let mut built = String::new();
        for segment in parent.split('/').filter(|s| !s.is_empty()) {
            built.push('/');
            built.push_str(segment);

            let host = utils::to_host(&self.base, &built);
            if host.exists() {
                if !host.is_dir() {
                    return Err(Error::AlreadyExists(format!(
                        "{} exists but is not a folder",
                        built
                    )));
                }
                continue;
            }
            fs::create_dir(&host)?;
            debug!("created folder {}", built);
        }
        Ok(())
    }

    /// Common checks of `new_file` and `new_folder`. Returns the normalized target path.
    fn prepare_child(&self, path: &str) -> Result<String> {
        let target = utils::join(&self.path, path);
        if utils::to_host(&self.base, &target).exists() {
            return Err(Error::AlreadyExists(target));
        }
        if !self.is_creatable() {
            return Err(Error::NotPermitted(format!(
                "cannot create {} in {}",
                target, self.path
            )));
        }
        self.create_parents(&target)?;
        Ok(target)
    }
}

impl LocalFile {
    /// Opens the file at the inner `path` below `base`.
    /// Fails with `NotFound` if it does not exist or is not a regular file.
    pub fn open<P: AsRef<Path>>(base: P, path: &str) -> Result<Self> {
        let base = canonical_base(base.as_ref())?;
        let path = utils::join("/", path);
        if !utils::to_host(&base, &path).is_file() {
            return Err(Error::NotFound(format!("file {} does not exist", path)));
        }
        Ok(Self::from_parts(base, path))
    }

    fn from_parts(base: Rc<Path>, path: String) -> Self {
        Self {
            base,
            path,
            parent: OnceCell::new(),
        }
    }

    fn host(&self) -> PathBuf {
        utils::to_host(&self.base, &self.path)
    }
}

impl Node for LocalFolder {
    fn path(&self) -> &str {
        &self.path
    }

    fn parent_node(&self) -> Result<&dyn Folder> {
        cached_parent(&self.parent, &self.base, &self.path)
    }

    fn permissions(&self) -> Permissions {
        host_permissions(&self.base, &self.path, true)
    }

    fn rename(&mut self, new_name: &str) -> Result<()> {
        let renamed = rename_on_host(&*self, &self.base, new_name)?;
        self.path = renamed;
        self.parent = OnceCell::new();
        Ok(())
    }

    /// Deletes the folder and everything below it.
    ///
    /// # Behavior
    /// - A folder reached through a symlink is unlinked; the link target is left alone.
    /// - Children are removed first (depth-first), then the now empty directory.
    /// - If the final removal still fails, a directory that is not empty is reported as a
    ///   generic I/O failure, anything else as `NotPermitted`.
    /// - The first failure stops the operation; removed children are not restored.
    fn delete(&self) -> Result<()> {
        if utils::is_root(&self.path) {
            return Err(Error::NotPermitted("the root cannot be deleted".to_string()));
        }
        if !self.is_deletable() {
            return Err(Error::NotPermitted(format!("{} cannot be deleted", self.path)));
        }
        let host = self.host();
        if fs::symlink_metadata(&host)?.file_type().is_symlink() {
            fs::remove_file(&host)?;
            debug!("deleted link {}", self.path);
            return Ok(());
        }
        remove_dir_tree(&host)?;
        debug!("deleted folder {}", self.path);
        Ok(())
    }

    /// Folders are always copied with the generic algorithm.
    fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        generic::copy(self, target, new_name)
    }

    fn move_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        match target.as_any().downcast_ref::<LocalFolder>() {
            Some(local) => match move_on_host(self, local, new_name)? {
                Some(path) => Ok(Entry::Folder(Box::new(LocalFolder::from_parts(
                    local.base.clone(),
                    path,
                )))),
                None => generic::move_node(self, target, new_name),
            },
            None => generic::move_node(self, target, new_name),
        }
    }

    fn local_path(&self) -> Result<PathBuf> {
        Ok(self.host())
    }

    fn as_folder(&self) -> Option<&dyn Folder> {
        Some(self)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl Folder for LocalFolder {
    fn exists(&self, path: &str) -> bool {
        let target = utils::join(&self.path, path);
        utils::to_host(&self.base, &target).exists()
    }

    fn get(&self, path: &str) -> Result<Entry> {
        let target = utils::join(&self.path, path);
        make_entry(&self.base, target.clone())
            .ok_or_else(|| Error::NotFound(format!("{} does not exist", target)))
    }

    /// Lazily scans the directory on the host.
    ///
    /// Each host entry is probed as a file first, then as a folder; entries that are neither
    /// (dangling links, sockets, ...) are skipped. Names that are not UTF-8 cannot be
    /// addressed by a node path and are skipped with a warning.
    fn entries(&self) -> Result<Entries> {
        let read_dir = fs::read_dir(self.host())?;
        let base = self.base.clone();
        let parent = self.path.clone();

        Ok(Box::new(read_dir.filter_map(move |item| match item {
            Err(err) => Some(Err(err.into())),
            Ok(dir_entry) => {
                let name = dir_entry.file_name();
                let Some(name) = name.to_str() else {
                    warn!("skipping non UTF-8 name {:?} in {}", name, parent);
                    return None;
                };
                let path = utils::join(&parent, name);
                make_entry(&base, path).map(Ok)
            }
        })))
    }

    fn new_file(&self, path: &str) -> Result<Box<dyn File>> {
        let target = self.prepare_child(path)?;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(utils::to_host(&self.base, &target))?;
        debug!("created file {}", target);
        Ok(Box::new(LocalFile::from_parts(self.base.clone(), target)))
    }

    fn new_folder(&self, path: &str) -> Result<Box<dyn Folder>> {
        let target = self.prepare_child(path)?;
        fs::create_dir(utils::to_host(&self.base, &target))?;
        debug!("created folder {}", target);
        Ok(Box::new(LocalFolder::from_parts(self.base.clone(), target)))
    }

    /// The host is always authoritative.
    fn sync(&self, _recursive: bool) -> Result<()> {
        Ok(())
    }
}

impl Node for LocalFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn parent_node(&self) -> Result<&dyn Folder> {
        cached_parent(&self.parent, &self.base, &self.path)
    }

    fn permissions(&self) -> Permissions {
        host_permissions(&self.base, &self.path, false)
    }

    fn rename(&mut self, new_name: &str) -> Result<()> {
        let renamed = rename_on_host(&*self, &self.base, new_name)?;
        self.path = renamed;
        self.parent = OnceCell::new();
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        if !self.is_deletable() {
            return Err(Error::NotPermitted(format!("{} cannot be deleted", self.path)));
        }
        fs::remove_file(self.host())?;
        debug!("deleted file {}", self.path);
        Ok(())
    }

    fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        let Some(local) = target.as_any().downcast_ref::<LocalFolder>() else {
            return generic::copy(self, target, new_name);
        };

        let name = new_name.unwrap_or_else(|| self.name());
        let destination = prepare_destination(local, name)?;
        fs::copy(self.host(), utils::to_host(&local.base, &destination))?;
        debug!("copied file {} to {}", self.path, destination);
        Ok(Entry::File(Box::new(LocalFile::from_parts(
            local.base.clone(),
            destination,
        ))))
    }

    fn move_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        match target.as_any().downcast_ref::<LocalFolder>() {
            Some(local) => match move_on_host(self, local, new_name)? {
                Some(path) => Ok(Entry::File(Box::new(LocalFile::from_parts(
                    local.base.clone(),
                    path,
                )))),
                None => generic::move_node(self, target, new_name),
            },
            None => generic::move_node(self, target, new_name),
        }
    }

    fn local_path(&self) -> Result<PathBuf> {
        Ok(self.host())
    }

    fn as_file(&self) -> Option<&dyn File> {
        Some(self)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl File for LocalFile {
    fn content(&self) -> Result<Vec<u8>> {
        Ok(fs::read(self.host())?)
    }

    /// Replaces the content of the file.
    /// Fails with `NotPermitted`, without touching the file, when the file is not updateable.
    fn put_content(&mut self, data: &[u8]) -> Result<()> {
        if !self.is_updateable() {
            return Err(Error::NotPermitted(format!("{} is read-only", self.path)));
        }
        fs::write(self.host(), data)?;
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(fs::metadata(self.host())?.len())
    }
}

impl fmt::Debug for LocalFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFolder")
            .field("base", &self.base)
            .field("path", &self.path)
            .finish()
    }
}

impl fmt::Debug for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalFile")
            .field("base", &self.base)
            .field("path", &self.path)
            .finish()
    }
}

fn canonical_base(base: &Path) -> Result<Rc<Path>> {
    if base.as_os_str().is_empty() {
        return Err(Error::InvalidPath("invalid base path: empty".to_string()));
    }
    let canonical = fs::canonicalize(base)
        .map_err(|_| Error::NotFound(format!("base {} does not exist", base.display())))?;
    if !canonical.is_dir() {
        return Err(Error::InvalidPath(format!(
            "base {} is not a directory",
            base.display()
        )));
    }
    Ok(Rc::from(canonical))
}

/// Builds the node at `path`, probing for a file before a folder.
fn make_entry(base: &Rc<Path>, path: String) -> Option<Entry> {
    let host = utils::to_host(base, &path);
    if host.is_file() {
        Some(Entry::File(Box::new(LocalFile::from_parts(base.clone(), path))))
    } else if host.is_dir() {
        Some(Entry::Folder(Box::new(LocalFolder::from_parts(
            base.clone(),
            path,
        ))))
    } else {
        None
    }
}

fn cached_parent<'a>(
    slot: &'a OnceCell<Box<dyn Folder>>,
    base: &Rc<Path>,
    path: &str,
) -> Result<&'a dyn Folder> {
    if let Some(parent) = slot.get() {
        return Ok(parent.as_ref());
    }
    let parent: Box<dyn Folder> = Box::new(LocalFolder::from_parts(
        base.clone(),
        utils::parent(path)?,
    ));
    Ok(slot.get_or_init(|| parent).as_ref())
}

/// Read ⇐ readable; Update ⇐ writable; Create ⇐ Update ∧ folder; Delete ⇐ parent writable.
fn host_permissions(base: &Path, path: &str, is_folder: bool) -> Permissions {
    let host = utils::to_host(base, path);
    let writable = is_writable(&host);

    let mut permissions = Permissions::empty();
    permissions.set(Permissions::READ, is_readable(&host));
    permissions.set(Permissions::UPDATE, writable);
    permissions.set(Permissions::CREATE, writable && is_folder);

    if let Ok(parent) = utils::parent(path) {
        permissions.set(
            Permissions::DELETE,
            is_writable(&utils::to_host(base, &parent)),
        );
    }
    permissions
}

fn is_readable(host: &Path) -> bool {
    has_access(host, false)
}

fn is_writable(host: &Path) -> bool {
    has_access(host, true)
}

/// `access(2)` for the real user; the node itself is never touched.
#[cfg(unix)]
fn has_access(host: &Path, write: bool) -> bool {
    use rustix::fs::{Access, access};

    let mode = if write { Access::WRITE_OK } else { Access::READ_OK };
    access(host, mode).is_ok()
}

#[cfg(not(unix))]
fn has_access(host: &Path, write: bool) -> bool {
    fs::metadata(host).is_ok_and(|metadata| !write || !metadata.permissions().readonly())
}

/// Validates a destination name inside a local folder and returns the destination path.
fn prepare_destination(target: &LocalFolder, name: &str) -> Result<String> {
    utils::assert_valid_file_name(name)?;
    if !target.is_creatable() {
        return Err(Error::NotPermitted(format!(
            "cannot create {} in {}",
            name, target.path
        )));
    }
    let destination = utils::join(&target.path, name);
    if utils::to_host(&target.base, &destination).exists() {
        return Err(Error::AlreadyExists(destination));
    }
    Ok(destination)
}

fn rename_on_host(node: &dyn Node, base: &Path, new_name: &str) -> Result<String> {
    utils::assert_valid_file_name(new_name)?;
    if !node.is_updateable() {
        return Err(Error::NotPermitted(format!("{} is read-only", node.path())));
    }

    let parent = node.parent()?;
    if !host_permissions(base, &parent, true).contains(Permissions::CREATE) {
        return Err(Error::NotPermitted(format!(
            "cannot create {} in {}",
            new_name, parent
        )));
    }

    let target = utils::join(&parent, new_name);
    let target_host = utils::to_host(base, &target);
    if target_host.exists() {
        return Err(Error::AlreadyExists(target));
    }

    fs::rename(utils::to_host(base, node.path()), &target_host).map_err(Error::Io)?;
    debug!("renamed {} to {}", node.path(), target);
    Ok(target)
}

/// Moves with a host rename. Returns `None` when the rename crosses devices and the caller
/// has to fall back to the generic algorithm.
fn move_on_host(node: &dyn Node, target: &LocalFolder, new_name: Option<&str>) -> Result<Option<String>> {
    if !node.is_deletable() {
        return Err(Error::NotPermitted(format!("{} cannot be deleted", node.path())));
    }
    let name = new_name.unwrap_or_else(|| node.name());
    let destination = prepare_destination(target, name)?;
    let source_host = node.local_path()?;
    let destination_host = utils::to_host(&target.base, &destination);

    if node.is_folder() && destination_host.starts_with(&source_host) {
        return Err(Error::InvalidPath(format!(
            "cannot move {} into itself",
            node.path()
        )));
    }

    match fs::rename(&source_host, &destination_host) {
        Ok(()) => {
            debug!("moved {} to {}", node.path(), destination);
            Ok(Some(destination))
        }
        Err(err) if err.kind() == ErrorKind::CrossesDevices => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Removes a host directory tree, children first. Links are removed, not followed.
fn remove_dir_tree(host: &Path) -> Result<()> {
    for dir_entry in fs::read_dir(host)? {
        let dir_entry = dir_entry?;
        let child = dir_entry.path();
        if dir_entry.file_type()?.is_dir() {
            remove_dir_tree(&child)?;
        } else {
            fs::remove_file(&child)?;
        }
    }

    fs::remove_dir(host).map_err(|err| {
        let is_empty = fs::read_dir(host)
            .map(|mut items| items.next().is_none())
            .unwrap_or(true);
        if !is_empty {
            Error::Io(err)
        } else {
            Error::NotPermitted(format!("{}: {}", host.display(), err))
        }
    })
}
