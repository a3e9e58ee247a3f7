//! Read-only files that render the content of another file.
//!
//! Both wrappers keep the backing file untouched: `put_content`, `delete` and `move_to` fail
//! with `NotPermitted`. Copying a wrapper copies the rendered content.

use std::any::Any;
use std::collections::BTreeMap;

use regex::{Captures, Regex};

use crate::core::{Entry, Error, File, Folder, Node, Permissions, Result};
use crate::core::{generic, utils};

/// Identifier the bundled code templates declare their type with.
pub const DEFAULT_PLACEHOLDER: &str = "Dummy";

const DECLARATION_KEYWORDS: &str = "class|interface|trait|struct|enum|type";

/// Exposes a source template under a caller-chosen type name.
///
/// The name of the node is `<identifier>.<extension of the backing file>`. Its content is the
/// backing content with every declaration of the placeholder type (`class Dummy`,
/// `struct Dummy`, ...) renamed to the identifier. Other occurrences of the placeholder are
/// left alone.
///
/// ### Example:
/// ```no_run
/// use vfs_nodes::{CodeTemplateFile, File, MemoryFile, Node};
///
/// let backing = MemoryFile::new("/templates/Dummy.rs", "pub struct Dummy;");
/// let mut file = CodeTemplateFile::new(Box::new(backing), "Invoice").unwrap();
/// assert_eq!(file.name(), "Invoice.rs");
/// assert_eq!(file.content().unwrap(), b"pub struct Invoice;");
///
/// file.rename("Receipt.rs").unwrap();
/// assert!(file.rename("Receipt.txt").is_err());
/// ```
pub struct CodeTemplateFile {
    inner: Box<dyn File>,
    path: String,
    placeholder: String,
}

impl CodeTemplateFile {
    /// Wraps `inner` under the type name `identifier`.
    /// Fails with `InvalidPath` if `identifier` is not a valid identifier.
    pub fn new(inner: Box<dyn File>, identifier: &str) -> Result<Self> {
        assert_identifier(identifier)?;
        let name = match inner.extension() {
            Some(extension) => format!("{}.{}", identifier, extension),
            None => identifier.to_string(),
        };
        let parent = utils::parent(inner.path()).unwrap_or_else(|_| "/".to_string());

        Ok(Self {
            path: utils::join(&parent, &name),
            inner,
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        })
    }

    /// Replaces the placeholder identifier searched for in the backing content.
    pub fn with_placeholder(mut self, placeholder: &str) -> Result<Self> {
        assert_identifier(placeholder)?;
        self.placeholder = placeholder.to_string();
        Ok(self)
    }

    /// Type name the template is rendered with.
    pub fn identifier(&self) -> &str {
        utils::stem(self.name())
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    fn render(&self, text: &str) -> Result<String> {
        let pattern = format!(
            r"\b({})(\s+){}\b",
            DECLARATION_KEYWORDS,
            regex::escape(&self.placeholder)
        );
        let declaration = Regex::new(&pattern).map_err(|err| Error::Other(err.into()))?;
        let identifier = self.identifier();

        Ok(declaration
            .replace_all(text, |caps: &Captures| {
                format!("{}{}{}", &caps[1], &caps[2], identifier)
            })
            .into_owned())
    }
}

impl Node for CodeTemplateFile {
    fn path(&self) -> &str {
        &self.path
    }

    fn parent_node(&self) -> Result<&dyn Folder> {
        self.inner.parent_node()
    }

    fn permissions(&self) -> Permissions {
        read_only(self.inner.as_ref())
    }

    /// Renames the exposed identifier.
    ///
    /// # Errors
    /// * `InvalidPath` - the extension differs from the current one, or the base name is not
    ///   an identifier (`[A-Za-z_][A-Za-z0-9_]*`). The node is left unchanged.
    fn rename(&mut self, new_name: &str) -> Result<()> {
        utils::assert_valid_file_name(new_name)?;
        if utils::extension(new_name) != self.extension() {
            return Err(Error::InvalidPath(format!(
                "{}: the extension of {} cannot change",
                new_name, self.path
            )));
        }
        assert_identifier(utils::stem(new_name))?;

        let parent = utils::parent(&self.path)?;
        self.path = utils::join(&parent, new_name);
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        Err(read_only_error(&self.path))
    }

    fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        generic::copy(self, target, new_name)
    }

    fn move_to(&self, _target: &dyn Folder, _new_name: Option<&str>) -> Result<Entry> {
        Err(read_only_error(&self.path))
    }

    fn as_file(&self) -> Option<&dyn File> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl File for CodeTemplateFile {
    /// Rendered content. Backing content that is not UTF-8 is returned unchanged.
    fn content(&self) -> Result<Vec<u8>> {
        let raw = self.inner.content()?;
        match String::from_utf8(raw) {
            Ok(text) => Ok(self.render(&text)?.into_bytes()),
            Err(err) => Ok(err.into_bytes()),
        }
    }

    fn put_content(&mut self, _data: &[u8]) -> Result<()> {
        Err(read_only_error(&self.path))
    }
}

/// Substitutes `%%key%%` tokens in the content of another file.
///
/// # Behavior
/// - Binary backing content (a NUL byte, or not UTF-8) is returned as is.
/// - Replacement is a single left-to-right pass: substituted values are not scanned again and
///   tokens whose key is not in the map stay in place.
/// - When two tokens overlap at the same position, the longer key wins.
pub struct PlaceholderFile {
    inner: Box<dyn File>,
    values: BTreeMap<String, String>,
    tokens: Option<Regex>,
}

impl PlaceholderFile {
    pub fn new<I, K, V>(inner: Box<dyn File>, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values: BTreeMap<String, String> = values
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        let tokens = token_regex(values.keys())?;

        Ok(Self {
            inner,
            values,
            tokens,
        })
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    fn substitute(&self, text: &str) -> String {
        let Some(tokens) = &self.tokens else {
            return text.to_string();
        };
        tokens
            .replace_all(text, |caps: &Captures| {
                let token = &caps[0];
                let key = &token[2..token.len() - 2];
                self.values.get(key).cloned().unwrap_or_else(|| token.to_string())
            })
            .into_owned()
    }
}

impl Node for PlaceholderFile {
    fn path(&self) -> &str {
        self.inner.path()
    }

    fn parent_node(&self) -> Result<&dyn Folder> {
        self.inner.parent_node()
    }

    fn permissions(&self) -> Permissions {
        read_only(self.inner.as_ref())
    }

    fn rename(&mut self, _new_name: &str) -> Result<()> {
        Err(read_only_error(self.path()))
    }

    fn delete(&self) -> Result<()> {
        Err(read_only_error(self.path()))
    }

    fn copy_to(&self, target: &dyn Folder, new_name: Option<&str>) -> Result<Entry> {
        generic::copy(self, target, new_name)
    }

    fn move_to(&self, _target: &dyn Folder, _new_name: Option<&str>) -> Result<Entry> {
        Err(read_only_error(self.path()))
    }

    fn as_file(&self) -> Option<&dyn File> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl File for PlaceholderFile {
    fn content(&self) -> Result<Vec<u8>> {
        let raw = self.inner.content()?;
        if raw.contains(&0) {
            return Ok(raw);
        }
        match String::from_utf8(raw) {
            Ok(text) => Ok(self.substitute(&text).into_bytes()),
            Err(err) => Ok(err.into_bytes()),
        }
    }

    fn put_content(&mut self, _data: &[u8]) -> Result<()> {
        Err(read_only_error(self.path()))
    }
}

/// One alternation of every `%%key%%` token, longest keys first. `None` for an empty map.
fn token_regex<'a>(keys: impl Iterator<Item = &'a String>) -> Result<Option<Regex>> {
    let mut keys: Vec<&String> = keys.collect();
    if keys.is_empty() {
        return Ok(None);
    }
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let alternation = keys
        .iter()
        .map(|key| format!("%%{}%%", regex::escape(key)))
        .collect::<Vec<_>>()
        .join("|");
    let tokens = Regex::new(&alternation).map_err(|err| Error::Other(err.into()))?;
    Ok(Some(tokens))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn assert_identifier(name: &str) -> Result<()> {
    if !is_identifier(name) {
        return Err(Error::InvalidPath(format!("{} is not a valid identifier", name)));
    }
    Ok(())
}

fn read_only(inner: &dyn File) -> Permissions {
    if inner.is_readable() {
        Permissions::READ
    } else {
        Permissions::empty()
    }
}

fn read_only_error(path: &str) -> Error {
    Error::NotPermitted(format!("{} is read-only", path))
}
