use std::fmt;

use crate::core::{File, Folder, Permissions, Result};

/// Lazy sequence of folder children.
pub type Entries = Box<dyn Iterator<Item = Result<Entry>>>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryType {
    File,
    Folder,
}

/// A node returned by a folder lookup or listing.
pub enum Entry {
    File(Box<dyn File>),
    Folder(Box<dyn Folder>),
}

impl Entry {
    pub fn entry_type(&self) -> EntryType {
        match self {
            Entry::File(_) => EntryType::File,
            Entry::Folder(_) => EntryType::Folder,
        }
    }

    pub fn is_file(&self) -> bool {
        self.entry_type() == EntryType::File
    }

    pub fn is_folder(&self) -> bool {
        self.entry_type() == EntryType::Folder
    }

    pub fn path(&self) -> &str {
        match self {
            Entry::File(file) => file.path(),
            Entry::Folder(folder) => folder.path(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::File(file) => file.name(),
            Entry::Folder(folder) => folder.name(),
        }
    }

    pub fn permissions(&self) -> Permissions {
        match self {
            Entry::File(file) => file.permissions(),
            Entry::Folder(folder) => folder.permissions(),
        }
    }

    pub fn delete(&self) -> Result<()> {
        match self {
            Entry::File(file) => file.delete(),
            Entry::Folder(folder) => folder.delete(),
        }
    }

    pub fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        match self {
            Entry::File(file) => file.copy_to(target, new_name),
            Entry::Folder(folder) => folder.copy_to(target, new_name),
        }
    }

    pub fn move_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        match self {
            Entry::File(file) => file.move_to(target, new_name),
            Entry::Folder(folder) => folder.move_to(target, new_name),
        }
    }

    pub fn as_file(&self) -> Option<&dyn File> {
        match self {
            Entry::File(file) => Some(file.as_ref()),
            Entry::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&dyn Folder> {
        match self {
            Entry::Folder(folder) => Some(folder.as_ref()),
            Entry::File(_) => None,
        }
    }

    pub fn into_file(self) -> Option<Box<dyn File>> {
        match self {
            Entry::File(file) => Some(file),
            Entry::Folder(_) => None,
        }
    }

    pub fn into_folder(self) -> Option<Box<dyn Folder>> {
        match self {
            Entry::Folder(folder) => Some(folder),
            Entry::File(_) => None,
        }
    }
}

impl From<Box<dyn File>> for Entry {
    fn from(file: Box<dyn File>) -> Self {
        Entry::File(file)
    }
}

impl From<Box<dyn Folder>> for Entry {
    fn from(folder: Box<dyn Folder>) -> Self {
        Entry::Folder(folder)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("type", &self.entry_type())
            .field("path", &self.path())
            .finish()
    }
}
