use log::debug;

use crate::core::{Entry, File, Folder, FolderCursor, Result};
use crate::glob::GlobPattern;

/// Depth-first walk over a folder tree that yields the files matching a glob pattern.
///
/// The walker keeps one [`FolderCursor`] per depth, the root at index 0. A folder is entered
/// only when its name matches the segment of its depth and the pattern goes deeper; a file is
/// yielded only when it matches the last segment. Folders are never yielded, and subtrees
/// whose folder does not match are never listed.
///
/// Two ways to drive it:
/// - the explicit protocol: [`rewind`](Self::rewind), then [`valid`](Self::valid),
///   [`current`](Self::current), [`key`](Self::key) and [`advance`](Self::advance);
/// - the `Iterator` implementation, which rewinds on first use, hands out owned files and
///   stops after the first error.
///
/// ### Example:
/// ```no_run
/// use vfs_nodes::{GlobIterator, LocalFolder, Node};
///
/// let root = LocalFolder::new("/srv/site").unwrap();
/// for file in GlobIterator::new(Box::new(root), "docs/*.md") {
///     println!("{}", file.unwrap().path());
/// }
/// ```
pub struct GlobIterator {
    pattern: GlobPattern,
    stack: Vec<FolderCursor>,
    current: Option<Box<dyn File>>,
    on_match: bool, // the top cursor still sits on the last yielded file
    matches: usize,
    rewound: bool,
    failed: bool,
}

impl GlobIterator {
    pub fn new(root: Box<dyn Folder>, pattern: &str) -> Self {
        Self::with_pattern(root, GlobPattern::new(pattern))
    }

    pub fn with_pattern(root: Box<dyn Folder>, pattern: GlobPattern) -> Self {
        Self {
            pattern,
            stack: vec![FolderCursor::new(root)],
            current: None,
            on_match: false,
            matches: 0,
            rewound: false,
            failed: false,
        }
    }

    pub fn pattern(&self) -> &GlobPattern {
        &self.pattern
    }

    /// Depth of the folder currently being scanned; 0 is the root.
    pub fn depth(&self) -> usize {
        self.stack.len().saturating_sub(1)
    }

    /// Restarts the walk at the root. Rescans the root folder and may fail.
    pub fn rewind(&mut self) -> Result<()> {
        self.stack.truncate(1);
        self.current = None;
        self.on_match = false;
        self.matches = 0;
        self.failed = false;
        self.rewound = true;
        match self.stack.first_mut() {
            Some(root) => root.rewind(),
            None => Ok(()),
        }
    }

    /// Positions the walk on the next matching file, if there is one.
    ///
    /// # Behavior
    /// - Returns `Ok(true)` immediately while a match is current.
    /// - Otherwise tests the entry under the top cursor: a mismatch advances the cursor; a
    ///   matching folder is pushed and rewound when the pattern goes deeper; a matching file
    ///   becomes current when the pattern ends at its depth.
    /// - An exhausted folder is popped and its parent advanced. Exhaustion of the root ends
    ///   the walk with `Ok(false)`.
    ///
    /// # Errors
    /// Listing failures of any visited folder and `InvalidArgument` for a malformed pattern
    /// segment reached by the walk.
    pub fn valid(&mut self) -> Result<bool> {
        if self.current.is_some() {
            return Ok(true);
        }
        if self.on_match {
            self.on_match = false;
            if let Some(top) = self.stack.last_mut() {
                top.advance()?;
            }
        }

        loop {
            let depth = self.depth();
            let Some(top) = self.stack.last_mut() else {
                return Ok(false);
            };

            if !top.valid() {
                if depth == 0 {
                    return Ok(false);
                }
                self.stack.pop();
                if let Some(parent) = self.stack.last_mut() {
                    parent.advance()?;
                }
                continue;
            }

            let (matched, is_folder) = match top.current() {
                Some(entry) => (self.pattern.compare(depth, entry.name())?, entry.is_folder()),
                None => continue,
            };
            if !matched {
                top.advance()?;
                continue;
            }

            let deeper = self.pattern.has_component(depth + 1)?;
            match (is_folder, deeper) {
                (true, true) => {
                    if let Some(folder) = top.take_current().and_then(Entry::into_folder) {
                        debug!("glob descends into {}", folder.path());
                        self.stack.push(FolderCursor::new(folder));
                        if let Some(child) = self.stack.last_mut() {
                            child.rewind()?;
                        }
                    }
                }
                (false, false) => {
                    if let Some(file) = top.take_current().and_then(Entry::into_file) {
                        self.current = Some(file);
                        self.on_match = true;
                        self.matches += 1;
                        return Ok(true);
                    }
                }
                _ => top.advance()?,
            }
        }
    }

    /// The current match. Only meaningful after [`valid`](Self::valid) returned `true`.
    pub fn current(&self) -> Option<&dyn File> {
        self.current.as_deref()
    }

    /// 0-based index of the current match.
    pub fn key(&self) -> Option<usize> {
        self.current.as_ref().map(|_| self.matches - 1)
    }

    /// Moves past the current match. Without a current match, moves past the next one.
    pub fn advance(&mut self) -> Result<()> {
        if self.current.is_none() && !self.valid()? {
            return Ok(());
        }
        self.current = None;
        self.on_match = false;
        match self.stack.last_mut() {
            Some(top) => top.advance(),
            None => Ok(()),
        }
    }
}

impl Iterator for GlobIterator {
    type Item = Result<Box<dyn File>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if !self.rewound {
            if let Err(err) = self.rewind() {
                self.failed = true;
                return Some(Err(err));
            }
        }

        match self.valid() {
            Ok(true) => self.current.take().map(Ok),
            Ok(false) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
