use std::any::Any;

use crate::core::{Entry, Error, File, Folder, Node, Permissions, Result};
use crate::core::{generic, utils};

/// A file whose content lives only in process memory.
///
/// The path is an identity, not a location: no folder contains a `MemoryFile`, so it has no
/// parent node and no host path. Renaming and writing are plain field updates and `delete()`
/// does nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFile {
    path: String,
    data: Vec<u8>,
}

impl MemoryFile {
    pub fn new<D: Into<Vec<u8>>>(path: &str, data: D) -> Self {
        Self {
            path: utils::join("/", path),
            data: data.into(),
        }
    }

    /// Consumes the file and returns its buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl Node for MemoryFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn parent_node(&self) -> Result<&dyn Folder> {
        Err(Error::InvalidPath(format!(
            "in-memory file {} has no parent folder",
            self.path
        )))
    }

    fn permissions(&self) -> Permissions {
        Permissions::READ | Permissions::UPDATE | Permissions::DELETE
    }

    fn rename(&mut self, new_name: &str) -> Result<()> {
        utils::assert_valid_file_name(new_name)?;
        let parent = utils::parent(&self.path)?;
        self.path = utils::join(&parent, new_name);
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        Ok(())
    }

    fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        generic::copy(self, target, new_name)
    }

    fn move_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        generic::move_node(self, target, new_name)
    }

    fn as_file(&self) -> Option<&dyn File> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl File for MemoryFile {
    fn content(&self) -> Result<Vec<u8>> {
        Ok(self.data.clone())
    }

    fn put_content(&mut self, data: &[u8]) -> Result<()> {
        self.data = data.to_vec();
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }
}
