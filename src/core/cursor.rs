//! Explicit iteration over folders.
//!
//! [`FolderCursor`] is the restartable rewind/valid/current/advance protocol over one folder.
//! It owns the folder, so a stack of cursors can describe a whole descent (see
//! [`GlobIterator`](crate::GlobIterator)). [`walk`] is the plain recursive variant.

use crate::core::{Entries, Entry, Folder, Result};

/// Single-consumer cursor over the children of one folder.
///
/// The cursor has no position until [`rewind`](Self::rewind) succeeds. Rewinding again
/// discards the previous position and rescans the folder.
pub struct FolderCursor {
    folder: Box<dyn Folder>,
    entries: Option<Entries>,
    current: Option<Entry>,
}

impl FolderCursor {
    pub fn new(folder: Box<dyn Folder>) -> Self {
        Self {
            folder,
            entries: None,
            current: None,
        }
    }

    pub fn folder(&self) -> &dyn Folder {
        self.folder.as_ref()
    }

    pub fn into_folder(self) -> Box<dyn Folder> {
        self.folder
    }

    /// Restarts the iteration. May block on a directory scan and may fail.
    pub fn rewind(&mut self) -> Result<()> {
        self.current = None;
        self.entries = None;

        let mut entries = self.folder.entries()?;
        self.current = entries.next().transpose()?;
        self.entries = Some(entries);
        Ok(())
    }

    /// `true` while the cursor is positioned at an entry.
    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&Entry> {
        self.current.as_ref()
    }

    /// Takes the current entry out of the cursor; the position itself does not move.
    pub fn take_current(&mut self) -> Option<Entry> {
        self.current.take()
    }

    /// Moves to the next entry. Past the end the cursor stays invalid.
    pub fn advance(&mut self) -> Result<()> {
        self.current = None;
        if let Some(entries) = self.entries.as_mut() {
            self.current = entries.next().transpose()?;
        }
        Ok(())
    }
}

/// Lazy depth-first iteration over every descendant of a folder.
///
/// Folders are yielded before their children, in the backend's per-directory order. The
/// starting folder itself is not yielded.
pub struct Walk {
    stack: Vec<Entries>,
}

pub fn walk(folder: &dyn Folder) -> Result<Walk> {
    Ok(Walk {
        stack: vec![folder.entries()?],
    })
}

impl Iterator for Walk {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(Err(err)) => return Some(Err(err)),
                Some(Ok(entry)) => {
                    if let Entry::Folder(folder) = &entry {
                        match folder.entries() {
                            Ok(children) => self.stack.push(children),
                            Err(err) => return Some(Err(err)),
                        }
                    }
                    return Some(Ok(entry));
                }
            }
        }
    }
}
