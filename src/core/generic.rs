//! Backend-agnostic copy and move.
//!
//! Used whenever source and target live in different backends, or when a backend has no
//! cheaper native operation. The algorithm recreates the node tree at the destination by
//! reading and rewriting content. It performs child operations eagerly and stops at the first
//! failure; nothing already copied (or, for a move, already deleted) is rolled back.

use log::debug;

use crate::core::{Entry, Error, Folder, Node, Result, utils};

/// Recursively recreates `source` inside `target` under `new_name` (or the source's name).
///
/// # Errors
/// * `InvalidPath` - the destination name is not a valid file name, or `target` lies inside
///   the source folder on the host.
/// * `NotPermitted` - `target` does not allow creating children.
/// * `AlreadyExists` - `target` already has a node with the destination name.
/// * any error of the underlying reads and writes.
pub fn copy(source: &dyn Node, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
    let name = new_name.unwrap_or_else(|| source.name());
    utils::assert_valid_file_name(name)?;

    if !target.is_creatable() {
        return Err(Error::NotPermitted(format!(
            "cannot create {} in {}",
            name,
            target.path()
        )));
    }
    if target.exists(name) {
        return Err(Error::AlreadyExists(utils::join(target.path(), name)));
    }

    if let Some(folder) = source.as_folder() {
        assert_not_nested(source, target)?;
        debug!("copying folder {} into {}", source.path(), target.path());

        let created = target.new_folder(name)?;
        for child in folder.entries()? {
            child?.copy_to(created.as_ref(), None)?;
        }
        Ok(Entry::Folder(created))
    } else if let Some(file) = source.as_file() {
        debug!("copying file {} into {}", source.path(), target.path());

        let content = file.content()?;
        let mut created = target.new_file(name)?;
        created.put_content(&content)?;
        Ok(Entry::File(created))
    } else {
        Err(Error::InvalidPath(format!(
            "{} is neither a file nor a folder",
            source.path()
        )))
    }
}

/// Copies `source` into `target`, then deletes the source.
///
/// The source must be deletable; this is checked before anything is copied.
pub fn move_node(source: &dyn Node, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
    if !source.is_deletable() {
        return Err(Error::NotPermitted(format!(
            "{} cannot be deleted",
            source.path()
        )));
    }
    let moved = copy(source, target, new_name)?;
    source.delete()?;
    Ok(moved)
}

/// Copying a folder into itself would never terminate.
fn assert_not_nested(source: &dyn Node, target: &dyn Folder) -> Result<()> {
    if let (Ok(source_host), Ok(target_host)) = (source.local_path(), target.local_path()) {
        if target_host.starts_with(&source_host) {
            return Err(Error::InvalidPath(format!(
                "cannot copy {} into itself",
                source.path()
            )));
        }
    }
    Ok(())
}
