//! Uniform file and folder nodes over several kinds of storage, with a lazy glob walker.
//!
//! ### Overview
//!
//! `vfs-nodes` lets code manipulate files and folders the same way whether they live on the
//! local disk, in a managed storage that enforces its own permissions, or only in memory.
//! Every node implements [`Node`] and one of its two capabilities, [`File`] or [`Folder`];
//! lookups and listings return an [`Entry`] that callers match on capability, not on backend.
//!
//! **Key ideas**:
//! - **Backends**: [`LocalFolder`]/[`LocalFile`] below a host directory,
//!   [`ManagedFolder`]/[`ManagedFile`] over any [`ManagedStorage`] (with [`MapStorage`] as the
//!   in-memory one), and synthetic files: [`MemoryFile`], [`CodeTemplateFile`],
//!   [`PlaceholderFile`].
//! - **Safety**: node paths are normalized and never climb above their backend's base.
//! - **Permissions**: four independent bits ([`Permissions`]) read live from the backend and
//!   checked before any mutating call.
//! - **Copy and move across backends**: native operations inside a backend, a generic
//!   read-and-rewrite algorithm between backends.
//! - **Globbing**: [`GlobPattern`] compiles `*`, `?`, `[...]`, `[!...]` one depth at a time and
//!   [`GlobIterator`] walks a tree depth-first, never listing subtrees that cannot match.
//!
//! The library logs through the `log` facade and never installs a logger.

mod config;
mod core;
mod glob;
mod vfs;

pub use self::config::StorageConfig;
pub use self::core::{
    Entries, Entry, EntryType, Error, File, Folder, FolderCursor, Node, Permissions, Result,
    Walk, generic, utils, walk,
};
pub use self::glob::{Component, GlobIterator, GlobPattern};
pub use self::vfs::{
    CodeTemplateFile, DEFAULT_PLACEHOLDER, LocalFile, LocalFolder, ManagedEntries, ManagedEntry,
    ManagedError, ManagedFile, ManagedFolder, ManagedResult, ManagedStorage, MapStorage,
    MemoryFile, PlaceholderFile,
};
