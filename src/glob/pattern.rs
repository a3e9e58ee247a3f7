use regex::Regex;

use crate::core::{Error, Result};

/// Characters a backslash escapes inside a glob pattern.
const ESCAPABLE: &[char] = &['*', '?', '[', ']', '\\', '-', '!', '/'];

/// Compiled matcher for one `/`-separated segment of a glob pattern.
#[derive(Debug, Clone)]
pub enum Component {
    /// The pattern has no segment at this depth.
    None,
    /// Segment without wildcards; matches by equality.
    Static(String),
    /// Segment with wildcards, anchored as `^…$`.
    Regex(Regex),
}

impl Component {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Component::None => false,
            Component::Static(literal) => literal == name,
            Component::Regex(regex) => regex.is_match(name),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Component::None)
    }
}

/// A shell-style glob pattern compiled one depth at a time.
///
/// Supported syntax: `*` (any run of characters within a segment), `?` (one character),
/// `[...]` and `[!...]` (character class and its negation), `\` (escapes one of
/// `*?[]\-!/`) and `/` (segment separator). There is no `**`: every segment matches exactly
/// one depth.
///
/// Nothing is compiled at construction. The component of a depth is compiled the first time
/// that depth (or a deeper one) is queried and is kept for the life of the pattern, so a
/// malformed segment is reported only when a walk reaches its depth.
///
/// ### Example:
/// ```
/// use vfs_nodes::GlobPattern;
///
/// let mut pattern = GlobPattern::new("docs/*.md");
/// assert!(pattern.compare(0, "docs").unwrap());
/// assert!(pattern.compare(1, "readme.md").unwrap());
/// assert!(!pattern.compare(1, "logo.png").unwrap());
/// assert!(!pattern.compare(2, "anything").unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct GlobPattern {
    pattern: String,
    position: usize,
    components: Vec<Component>,
}

impl GlobPattern {
    /// Creates a pattern. Leading `/` are ignored: patterns are relative to the folder they
    /// are applied to.
    pub fn new(pattern: &str) -> Self {
        Self {
            pattern: pattern.trim_start_matches('/').to_string(),
            position: 0,
            components: Vec::new(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Returns the component of `depth`, compiling every missing shallower one first.
    ///
    /// # Errors
    /// * `InvalidArgument` - a segment up to `depth` is malformed. The failing segment is not
    ///   memoized, so asking again reports the same error.
    pub fn component(&mut self, depth: usize) -> Result<&Component> {
        while self.components.len() <= depth {
            let (component, next) = compile_segment(&self.pattern, self.position)?;
            self.position = next;
            self.components.push(component);
        }
        Ok(&self.components[depth])
    }

    /// `true` if the pattern has a segment at `depth`.
    pub fn has_component(&mut self, depth: usize) -> Result<bool> {
        Ok(!self.component(depth)?.is_none())
    }

    /// Tests `name` against the segment of `depth`. Depths beyond the pattern never match.
    pub fn compare(&mut self, depth: usize, name: &str) -> Result<bool> {
        Ok(self.component(depth)?.matches(name))
    }
}

/// Compiles the segment starting at byte `start`. Returns the component and the start of the
/// next segment.
fn compile_segment(pattern: &str, start: usize) -> Result<(Component, usize)> {
    if start >= pattern.len() {
        return Ok((Component::None, pattern.len()));
    }

    let mut segment = SegmentBuilder::default();
    let mut next = pattern.len();
    let mut chars = pattern[start..].char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '/' => {
                next = start + offset + 1;
                break;
            }
            '\\' => match chars.peek() {
                Some(&(_, escaped)) if ESCAPABLE.contains(&escaped) => {
                    chars.next();
                    segment.push_literal(escaped);
                }
                _ => segment.push_literal('\\'),
            },
            '*' => segment.push_wildcard("[^/]*", c),
            '?' => segment.push_wildcard(".", c),
            '[' => {
                let negated = chars.peek().is_some_and(|&(_, following)| following == '!');
                if segment.open_class(negated) && negated {
                    chars.next();
                }
            }
            ']' => segment.close_class(),
            '-' => segment.push_dash(),
            _ => segment.push_literal(c),
        }
    }

    let raw = &pattern[start..next.min(pattern.len())];
    let component = segment.finish(raw)?;
    Ok((component, next))
}

#[derive(Default)]
struct SegmentBuilder {
    literal: String,
    regex: Option<String>,
    class_open: bool,
}

impl SegmentBuilder {
    /// Switches to regex mode, escaping the literal accumulated so far.
    fn regex_mode(&mut self) -> &mut String {
        let literal = &self.literal;
        self.regex.get_or_insert_with(|| regex::escape(literal))
    }

    fn push_literal(&mut self, c: char) {
        match self.regex.as_mut() {
            None => self.literal.push(c),
            Some(expr) => expr.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }

    fn push_wildcard(&mut self, expansion: &str, c: char) {
        if self.class_open {
            self.push_literal(c);
        } else {
            self.regex_mode().push_str(expansion);
        }
    }

    /// Returns `true` if a class was opened (a `[` inside an open class is a literal).
    fn open_class(&mut self, negated: bool) -> bool {
        if self.class_open {
            self.push_literal('[');
            return false;
        }
        let regex = self.regex_mode();
        regex.push('[');
        if negated {
            regex.push('^');
        }
        self.class_open = true;
        true
    }

    fn close_class(&mut self) {
        match (self.class_open, self.regex.as_mut()) {
            (true, Some(regex)) => {
                regex.push(']');
                self.class_open = false;
            }
            _ => self.push_literal(']'),
        }
    }

    fn push_dash(&mut self) {
        match (self.class_open, self.regex.as_mut()) {
            (true, Some(regex)) => regex.push('-'),
            _ => self.push_literal('-'),
        }
    }

    fn finish(self, raw: &str) -> Result<Component> {
        if self.class_open {
            return Err(Error::InvalidArgument(format!(
                "unterminated character class in glob segment {:?}",
                raw
            )));
        }
        match self.regex {
            None => Ok(Component::Static(self.literal)),
            Some(regex) => Regex::new(&format!("^{}$", regex))
                .map(Component::Regex)
                .map_err(|err| {
                    Error::InvalidArgument(format!("invalid glob segment {:?}: {}", raw, err))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod compile {
        use super::*;

        #[test]
        fn test_static_segments() -> anyhow::Result<()> {
            let mut pattern = GlobPattern::new("foo/bar");

            assert!(matches!(pattern.component(0)?, Component::Static(s) if s == "foo"));
            assert!(matches!(pattern.component(1)?, Component::Static(s) if s == "bar"));
            assert!(pattern.component(2)?.is_none());
            assert!(pattern.component(10)?.is_none());

            Ok(())
        }

        #[test]
        fn test_regex_segment() -> anyhow::Result<()> {
            let mut pattern = GlobPattern::new("a.b*");
            match pattern.component(0)? {
                Component::Regex(regex) => assert_eq!(regex.as_str(), r"^a\.b[^/]*$"),
                other => panic!("expected a regex, got {:?}", other),
            }

            Ok(())
        }

        #[test]
        fn test_escapes() -> anyhow::Result<()> {
            let mut pattern = GlobPattern::new(r"\*lit\/eral\q/x\[*");

            assert!(
                matches!(pattern.component(0)?, Component::Static(s) if s == r"*lit/eral\q"),
                "escaped chars stay literal and `\\/` does not split"
            );
            assert!(pattern.compare(1, "x[abc")?);
            assert!(!pattern.compare(1, "xabc")?);

            Ok(())
        }

        #[test]
        fn test_leading_slash_and_empty_segment() -> anyhow::Result<()> {
            let mut pattern = GlobPattern::new("/a//b");

            assert!(pattern.compare(0, "a")?);
            assert!(matches!(pattern.component(1)?, Component::Static(s) if s.is_empty()));
            assert!(pattern.compare(2, "b")?);

            Ok(())
        }

        #[test]
        fn test_empty_pattern() -> anyhow::Result<()> {
            let mut pattern = GlobPattern::new("");

            assert!(!pattern.has_component(0)?);
            assert!(!pattern.compare(0, "")?);

            Ok(())
        }
    }

    mod matching {
        use super::*;

        #[test]
        fn test_static_vs_regex() -> anyhow::Result<()> {
            let mut exact = GlobPattern::new("foo/bar");
            assert!(exact.compare(0, "foo")? && exact.compare(1, "bar")?);
            assert!(!exact.compare(1, "bar2")?);

            let mut wild = GlobPattern::new("foo/*.md");
            assert!(wild.compare(1, "x.md")?);
            assert!(wild.compare(1, "anything.md")?);
            assert!(wild.compare(1, ".md")?);
            assert!(!wild.compare(1, "x.mdx")?);
            assert!(!wild.has_component(2)?, "foo/sub/x.md is one level too deep");

            Ok(())
        }

        #[test]
        fn test_question_mark() -> anyhow::Result<()> {
            let mut pattern = GlobPattern::new("?.txt");

            assert!(pattern.compare(0, "a.txt")?);
            assert!(pattern.compare(0, "я.txt")?);
            assert!(!pattern.compare(0, "ab.txt")?);
            assert!(!pattern.compare(0, ".txt")?);

            Ok(())
        }

        #[test]
        fn test_character_classes() -> anyhow::Result<()> {
            let mut negated = GlobPattern::new("[!a-c]*");
            assert!(negated.compare(0, "dog.txt")?);
            assert!(!negated.compare(0, "apple.txt")?);
            assert!(!negated.compare(0, "cat")?);

            let mut class = GlobPattern::new("file[0-9].log");
            assert!(class.compare(0, "file7.log")?);
            assert!(!class.compare(0, "fileA.log")?);

            let mut literal_star = GlobPattern::new("[*?]x");
            assert!(literal_star.compare(0, "*x")?);
            assert!(literal_star.compare(0, "?x")?);
            assert!(!literal_star.compare(0, "ax")?);

            Ok(())
        }

        #[test]
        fn test_special_chars_outside_class() -> anyhow::Result<()> {
            let mut pattern = GlobPattern::new("a-b]*(1)+");

            assert!(pattern.compare(0, "a-b]zz(1)+")?);
            assert!(!pattern.compare(0, "a-b]zz(1)")?);

            Ok(())
        }

        #[test]
        fn test_determinism() -> anyhow::Result<()> {
            let names = ["docs", "x.md", "readme.md", "img", ""];
            let mut forward = GlobPattern::new("d*/[!i]*.md/z");
            let mut backward = GlobPattern::new("d*/[!i]*.md/z");
            backward.component(3)?;

            for depth in 0..4 {
                for name in names {
                    assert_eq!(
                        forward.compare(depth, name)?,
                        backward.compare(depth, name)?,
                        "depth {} name {:?}",
                        depth,
                        name
                    );
                }
            }
            for depth in (0..4).rev() {
                for name in names {
                    assert_eq!(forward.compare(depth, name)?, backward.compare(depth, name)?);
                }
            }

            Ok(())
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn test_unterminated_class() {
            let mut pattern = GlobPattern::new("[abc");
            assert!(matches!(pattern.compare(0, "a"), Err(Error::InvalidArgument(_))));
            assert!(
                matches!(pattern.compare(0, "a"), Err(Error::InvalidArgument(_))),
                "the error repeats"
            );
        }

        #[test]
        fn test_class_cut_by_separator() {
            let mut pattern = GlobPattern::new("[ab/c]");
            assert!(matches!(pattern.component(0), Err(Error::InvalidArgument(_))));
        }

        #[test]
        fn test_error_is_lazy() -> anyhow::Result<()> {
            let mut pattern = GlobPattern::new("docs/[oops");

            assert!(pattern.compare(0, "docs")?);
            assert!(matches!(pattern.compare(1, "x"), Err(Error::InvalidArgument(_))));

            Ok(())
        }

        #[test]
        fn test_empty_class() {
            let mut pattern = GlobPattern::new("[]");
            assert!(matches!(pattern.component(0), Err(Error::InvalidArgument(_))));
        }
    }
}
