//! Capability contracts shared by every backend: [`Node`], [`File`] and [`Folder`].

use std::any::Any;
use std::path::PathBuf;

mod cursor;
mod entry;
mod error;
pub mod generic;
mod permissions;
pub mod utils;

pub use cursor::{FolderCursor, Walk, walk};
pub use entry::{Entries, Entry, EntryType};
pub use error::{Error, Result};
pub use permissions::Permissions;

/// An addressable file-system entry (file or folder) of some backend.
///
/// Paths are normalized, start with `/` and are relative to the backend's base.
pub trait Node: Any {
    /// Normalized path of the node, relative to the backend's base.
    fn path(&self) -> &str;

    /// Final path segment. Empty for the root folder.
    fn name(&self) -> &str {
        utils::file_name(self.path())
    }

    /// Path of the parent folder. Fails with `InvalidPath` at the root.
    fn parent(&self) -> Result<String> {
        utils::parent(self.path())
    }

    /// Parent folder node, built on first access and cached by this instance.
    fn parent_node(&self) -> Result<&dyn Folder>;

    fn is_file(&self) -> bool {
        self.as_file().is_some()
    }

    fn is_folder(&self) -> bool {
        self.as_folder().is_some()
    }

    /// Permission bits as currently reported by the backend.
    fn permissions(&self) -> Permissions;

    fn is_readable(&self) -> bool {
        self.permissions().contains(Permissions::READ)
    }

    fn is_updateable(&self) -> bool {
        self.permissions().contains(Permissions::UPDATE)
    }

    fn is_creatable(&self) -> bool {
        self.permissions().contains(Permissions::CREATE)
    }

    fn is_deletable(&self) -> bool {
        self.permissions().contains(Permissions::DELETE)
    }

    /// Renames the node inside its parent folder.
    /// On error the node is left untouched.
    fn rename(&mut self, new_name: &str) -> Result<()>;

    /// Deletes the node; folders are deleted recursively.
    fn delete(&self) -> Result<()>;

    /// Copies the node into `target`, optionally under another name, and returns the copy.
    fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry>;

    /// Moves the node into `target`, optionally under another name, and returns the node at
    /// its new location. `self` no longer refers to an existing node afterwards.
    fn move_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry>;

    /// Host path of the node, for backends that have one.
    fn local_path(&self) -> Result<PathBuf> {
        Err(Error::NotFound(format!(
            "{} has no local path",
            self.path()
        )))
    }

    fn as_file(&self) -> Option<&dyn File> {
        None
    }

    fn as_folder(&self) -> Option<&dyn Folder> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// A node with byte content.
pub trait File: Node {
    fn content(&self) -> Result<Vec<u8>>;

    /// Replaces the whole content.
    fn put_content(&mut self, data: &[u8]) -> Result<()>;

    fn extension(&self) -> Option<&str> {
        utils::extension(self.name())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.content()?.len() as u64)
    }
}

/// A node that contains other nodes.
///
/// All relative paths are resolved against the folder's own path and normalized first.
pub trait Folder: Node {
    fn exists(&self, path: &str) -> bool;

    /// Returns the node at `path`. Fails with `NotFound` if it does not exist.
    fn get(&self, path: &str) -> Result<Entry>;

    /// Lazy, single-level iteration over the folder's children, in the backend's order.
    fn entries(&self) -> Result<Entries>;

    /// Eagerly collected children.
    fn listing(&self) -> Result<Vec<Entry>> {
        self.entries()?.collect()
    }

    /// Creates an empty file, creating missing parent folders.
    fn new_file(&self, path: &str) -> Result<Box<dyn File>>;

    /// Creates a folder, creating missing parent folders.
    fn new_folder(&self, path: &str) -> Result<Box<dyn Folder>>;

    /// Deletes every child of the folder, keeping the folder itself.
    fn truncate(&self) -> Result<()> {
        for entry in self.listing()? {
            entry.delete()?;
        }
        Ok(())
    }

    /// Makes the backend's listing of this folder reflect the storage.
    fn sync(&self, recursive: bool) -> Result<()>;
}
