mod local;
mod managed;
mod memory;
mod template;

pub use local::{LocalFile, LocalFolder};
pub use managed::{
    ManagedEntries, ManagedEntry, ManagedError, ManagedFile, ManagedFolder, ManagedResult,
    ManagedStorage, MapStorage,
};
pub use memory::MemoryFile;
pub use template::{CodeTemplateFile, DEFAULT_PLACEHOLDER, PlaceholderFile};
