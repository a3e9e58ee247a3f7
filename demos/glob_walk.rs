use std::collections::BTreeMap;
use std::rc::Rc;

use vfs_nodes::{
    CodeTemplateFile, File, Folder, GlobIterator, LocalFolder, ManagedFolder, MapStorage,
    MemoryFile, Node, PlaceholderFile,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let base = std::env::temp_dir().join("vfs_nodes_demo");
    std::fs::create_dir_all(&base)?;

    // a local tree below the temp dir
    let root = LocalFolder::new(&base)?;
    root.truncate()?;
    root.new_file("docs/readme.md")?.put_content(b"# Readme")?;
    root.new_file("docs/img/logo.png")?.put_content(&[0x89, b'P', b'N', b'G'])?;
    root.new_file("notes.txt")?.put_content(b"notes")?;

    // only `docs/readme.md` matches; `img` is never entered
    for file in GlobIterator::new(Box::new(LocalFolder::new(&base)?), "docs/*.md") {
        let file = file?;
        println!("match: {} ({} bytes)", file.path(), file.size()?);
    }

    // copy the docs into a managed storage, then sync it
    let storage = Rc::new(MapStorage::new());
    let managed = ManagedFolder::root(storage.clone())?;
    root.get("docs")?.copy_to(&managed, None)?;
    managed.sync(true)?;
    if let Some(docs) = managed.get("docs")?.as_folder() {
        for entry in docs.listing()? {
            println!("managed: {} ({:?})", entry.path(), entry.entry_type());
        }
    }

    // synthetic files
    let template = MemoryFile::new("/templates/Dummy.rs", "pub struct Dummy;\n");
    let generated = CodeTemplateFile::new(Box::new(template), "Invoice")?;
    generated.copy_to(&root, None)?;
    println!("generated: {}", String::from_utf8(generated.content()?)?.trim_end());

    let values = BTreeMap::from([("name", "world")]);
    let greeting = PlaceholderFile::new(
        Box::new(MemoryFile::new("/greeting.txt", "Hello, %%name%%!")),
        values,
    )?;
    println!("{}", String::from_utf8(greeting.content()?)?);

    root.truncate()?;
    Ok(())
}
