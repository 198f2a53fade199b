//! Indentation-based parser for the document language.
//!
//! The parser keeps a stack of open sections keyed by indentation. A line
//! whose indentation drops below the innermost section's level closes that
//! section. List items are collected into per-section buckets which a
//! finishing pass turns into sequences.

mod line;

use indexmap::IndexMap;
use thiserror::Error;

use crate::document::{Mapping, Node};
use line::Line;

pub(crate) use line::is_numeric;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("invalid indentation at line {line}: no enclosing section")]
    IndentationUnderflow { line: usize },
}

/// Parses document source into an intermediate tree.
///
/// The result is a mapping unless list items were attached to the root
/// itself, in which case the root becomes a sequence.
pub fn parse(source: &str) -> Result<Node, ParseError> {
    let mut stack = vec![Frame {
        indent: -1,
        key: String::new(),
        section: Section::default(),
    }];

    for (index, raw) in source.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_skipped(trimmed) {
            continue;
        }

        let indent = count_indent(raw);
        close_sections(&mut stack, indent, index + 1)?;
        let Some(line) = line::classify(trimmed) else {
            continue;
        };

        let current = match stack.last_mut() {
            Some(frame) => &mut frame.section,
            None => return Err(ParseError::IndentationUnderflow { line: index + 1 }),
        };

        match line {
            Line::Section { key } => {
                // Reserve the key's position now; the section is filled in
                // when its frame closes.
                current
                    .entries
                    .insert(key.clone(), Entry::Section(Section::default()));
                stack.push(Frame {
                    indent: indent + 1,
                    key,
                    section: Section::default(),
                });
            }
            Line::ListItem(item) => current.attach(item),
            Line::Assign { key, value } => {
                current.entries.insert(key, Entry::Value(value));
            }
        }
    }

    close_sections(&mut stack, 0, 0)?;
    match stack.pop() {
        Some(root) => Ok(root.section.finish()),
        None => Err(ParseError::IndentationUnderflow { line: 0 }),
    }
}

/// Comments, header lines and document separators produce nothing.
fn is_skipped(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with('%') || trimmed.starts_with("---")
}

/// Counts leading spaces and tabs; a tab is one unit.
fn count_indent(line: &str) -> isize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count() as isize
}

/// Pops every frame opened deeper than `indent`, folding each into its
/// parent.
fn close_sections(stack: &mut Vec<Frame>, indent: isize, line: usize) -> Result<(), ParseError> {
    while stack.last().is_some_and(|top| indent < top.indent) {
        let Some(frame) = stack.pop() else { break };
        let Some(parent) = stack.last_mut() else {
            return Err(ParseError::IndentationUnderflow { line });
        };
        parent
            .section
            .entries
            .insert(frame.key, Entry::Section(frame.section));
    }
    Ok(())
}

#[derive(Debug)]
struct Frame {
    indent: isize,
    key: String,
    section: Section,
}

#[derive(Debug, Default)]
struct Section {
    entries: IndexMap<String, Entry>,
    bucket: Option<Bucket>,
}

#[derive(Debug)]
enum Entry {
    Value(Node),
    Section(Section),
}

/// Pending list items for a section.
#[derive(Debug)]
struct Bucket {
    items: Vec<Node>,
    /// Number of entries when the bucket was opened; while it still equals
    /// `entries.len()` the bucket is the section's most recent key.
    position: usize,
}

/// Where a list item lands, decided from the section's current state.
#[derive(Debug, PartialEq, Eq)]
enum ListTarget {
    /// The section is already acting as a list: its bucket is the most
    /// recent key.
    Sequence,
    /// The most recent key holds a section; the item goes into that
    /// section's bucket.
    PendingSection(String),
    /// The item goes into this section's own bucket.
    Own,
}

impl Section {
    fn list_target(&self) -> ListTarget {
        if self
            .bucket
            .as_ref()
            .is_some_and(|bucket| bucket.position == self.entries.len())
        {
            return ListTarget::Sequence;
        }
        match self.entries.last() {
            Some((key, Entry::Section(_))) => ListTarget::PendingSection(key.clone()),
            _ => ListTarget::Own,
        }
    }

    fn attach(&mut self, item: Node) {
        match self.list_target() {
            ListTarget::PendingSection(key) => {
                if let Some(Entry::Section(nested)) = self.entries.get_mut(&key) {
                    nested.push_item(item);
                }
            }
            ListTarget::Sequence | ListTarget::Own => self.push_item(item),
        }
    }

    fn push_item(&mut self, item: Node) {
        let position = self.entries.len();
        self.bucket
            .get_or_insert_with(|| Bucket {
                items: Vec::new(),
                position,
            })
            .items
            .push(item);
    }

    /// A section holding a bucket becomes that sequence, replacing its
    /// other entries; otherwise it becomes a mapping.
    fn finish(self) -> Node {
        if let Some(bucket) = self.bucket {
            return Node::Sequence(bucket.items);
        }
        let mapping: Mapping = self
            .entries
            .into_iter()
            .map(|(key, entry)| {
                let node = match entry {
                    Entry::Value(node) => node,
                    Entry::Section(section) => section.finish(),
                };
                (key, node)
            })
            .collect();
        Node::Mapping(mapping)
    }
}
