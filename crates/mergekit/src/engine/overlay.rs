//! Built-in overlay engine.
//!
//! Documents are layered in order: each later source is merged onto the
//! result of the earlier ones. Control properties pick an action per element
//! path:
//!
//! ```text
//! default = merge
//! /project/name = override
//! /project/dependencies/dependency = append
//! //comment = preserve
//! /project/legacy = remove
//! ```
//!
//! A later element matches an earlier sibling with the same name and the
//! same `id` attribute; repeated siblings without an `id` pair up by
//! occurrence.
//!
//! When merging, the n-th text node of the newcomer replaces the n-th text
//! node of the existing element in place; surplus text from the newcomer is
//! appended and surplus existing text is kept. Comments of the newcomer that
//! the existing element lacks are appended in document order.
//!
//! The root element is only ever merged, overridden or preserved. `/root`
//! rules asking for anything else are rejected up front, a `//name` rule
//! that lands on the root fails the merge, and an `append` or `remove`
//! default does not apply to it.

use super::tree::{self, Document, Element, Node};
use super::{MergeEngine, Merger, SourceStream};
use crate::error::{Error, Result};
use crate::properties::Properties;
use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;

/// Property key that sets the action for paths without a directive.
pub const DEFAULT_KEY: &str = "default";

/// What to do when an element from a later source meets the result so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Overlay attributes and text, then merge children recursively
    #[default]
    Merge,
    /// Replace the matched element with the newcomer
    Override,
    /// Add the newcomer next to any existing match
    Append,
    /// Keep the existing element and drop the newcomer
    Preserve,
    /// Drop both the existing element and the newcomer
    Remove,
}

impl Action {
    /// Token used in properties files.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Override => "override",
            Self::Append => "append",
            Self::Preserve => "preserve",
            Self::Remove => "remove",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "override" | "replace" => Ok(Self::Override),
            "append" | "insert" => Ok(Self::Append),
            "preserve" | "keep" => Ok(Self::Preserve),
            "remove" | "delete" => Ok(Self::Remove),
            other => Err(format!(
                "unknown action `{other}` (expected merge, override, append, preserve or remove)"
            )),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    /// `/a/b/c`, `*` matches any single name
    Absolute(Vec<String>),
    /// `//name`
    Descendant(String),
}

impl PathPattern {
    fn parse(key: &str) -> Result<Self> {
        if let Some(name) = key.strip_prefix("//") {
            if name.is_empty() || name.contains('/') {
                return Err(Error::directive(key, "`//` must be followed by a single element name"));
            }
            return Ok(Self::Descendant(name.to_string()));
        }

        let Some(rest) = key.strip_prefix('/') else {
            return Err(Error::directive(
                key,
                "expected an absolute element path, `//name` or `default`",
            ));
        };

        let steps: Vec<String> = rest.split('/').map(str::to_string).collect();
        if steps.iter().any(String::is_empty) {
            return Err(Error::directive(key, "empty path step"));
        }
        Ok(Self::Absolute(steps))
    }

    fn matches(&self, path: &[String]) -> bool {
        match self {
            Self::Absolute(steps) => {
                steps.len() == path.len()
                    && steps.iter().zip(path).all(|(s, p)| s == "*" || s == p)
            }
            Self::Descendant(name) => path.last().is_some_and(|last| last == name),
        }
    }
}

/// Parsed directives: a default action plus per-path rules.
#[derive(Debug, Clone, Default)]
pub struct Directives {
    default: Action,
    absolute: Vec<(PathPattern, Action)>,
    descendant: Vec<(PathPattern, Action)>,
}

impl Directives {
    /// Build directives from control properties.
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let mut directives = Self::default();

        for (key, value) in properties.iter() {
            let key = key.trim();
            let action = Action::from_str(value).map_err(|msg| Error::directive(key, msg))?;

            if key == DEFAULT_KEY {
                directives.default = action;
                continue;
            }

            match PathPattern::parse(key)? {
                PathPattern::Absolute(steps) => {
                    if steps.len() == 1 && matches!(action, Action::Append | Action::Remove) {
                        return Err(Error::directive(
                            key,
                            "the root element can only be merged, overridden or preserved",
                        ));
                    }
                    directives
                        .absolute
                        .push((PathPattern::Absolute(steps), action));
                }
                pattern => directives.descendant.push((pattern, action)),
            }
        }

        Ok(directives)
    }

    /// Number of path rules (the default is not counted).
    pub fn rule_count(&self) -> usize {
        self.absolute.len() + self.descendant.len()
    }

    /// Explicit rule for an element path, absolute rules first.
    fn rule_for(&self, path: &[String]) -> Option<Action> {
        self.absolute
            .iter()
            .chain(&self.descendant)
            .find(|(pattern, _)| pattern.matches(path))
            .map(|(_, action)| *action)
    }

    fn action_for(&self, path: &[String]) -> Action {
        self.rule_for(path).unwrap_or(self.default)
    }

    fn root_action(&self, path: &[String]) -> Option<Action> {
        match self.rule_for(path) {
            Some(action) => Some(action),
            None if matches!(self.default, Action::Append | Action::Remove) => None,
            None => Some(self.default),
        }
    }
}

/// The built-in engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayEngine;

impl MergeEngine for OverlayEngine {
    fn name(&self) -> &str {
        "overlay"
    }

    fn configure(&self, properties: &Properties) -> Result<Box<dyn Merger>> {
        let directives = Directives::from_properties(properties)?;
        log::debug!(
            "overlay engine configured with {} rule(s), default action {}",
            directives.rule_count(),
            directives.default
        );
        Ok(Box::new(OverlayMerger { directives }))
    }
}

/// A configured overlay merge.
#[derive(Debug, Clone)]
pub struct OverlayMerger {
    directives: Directives,
}

impl OverlayMerger {
    /// Create a merger with explicit directives.
    pub fn new(directives: Directives) -> Self {
        Self { directives }
    }

    fn overlay_document(&self, base: &mut Document, next: Document, origin: &str) -> Result<()> {
        if next.root.name != base.root.name {
            return Err(Error::Merge(format!(
                "root element <{}> in {origin} does not match <{}>",
                next.root.name, base.root.name
            )));
        }

        let mut path = vec![base.root.name.clone()];
        match self.directives.root_action(&path).unwrap_or(Action::Merge) {
            Action::Override => base.root = next.root,
            Action::Preserve => {}
            Action::Merge => self.merge_element(&mut base.root, next.root, &mut path),
            action => {
                return Err(Error::Merge(format!(
                    "cannot {action} the root element <{}> of {origin}",
                    base.root.name
                )));
            }
        }

        for comment in next.prolog {
            if !base.prolog.contains(&comment) {
                base.prolog.push(comment);
            }
        }
        for comment in next.trailing {
            if !base.trailing.contains(&comment) {
                base.trailing.push(comment);
            }
        }
        Ok(())
    }

    fn merge_element(&self, base: &mut Element, overlay: Element, path: &mut Vec<String>) {
        for (key, value) in overlay.attributes {
            base.set_attribute(key, value);
        }

        let mut texts = Vec::new();
        let mut seen: HashMap<(String, Option<String>), usize> = HashMap::new();

        for child in overlay.children {
            let el = match child {
                Node::Element(el) => el,
                Node::Comment(_) => {
                    if !base.children.contains(&child) {
                        base.children.push(child);
                    }
                    continue;
                }
                text => {
                    texts.push(text);
                    continue;
                }
            };

            path.push(el.name.clone());
            let action = self.directives.action_for(path);
            let key = (el.name.clone(), el.attribute("id").map(str::to_string));
            let occurrence = seen.entry(key.clone()).or_insert(0);
            let nth = *occurrence;
            *occurrence += 1;

            match action {
                Action::Append => base.children.push(Node::Element(el)),
                Action::Remove => base.children.retain(|n| !same_key(n, &key)),
                _ => match find_match(base, &key, nth) {
                    None => base.children.push(Node::Element(el)),
                    Some(idx) => match action {
                        Action::Override => base.children[idx] = Node::Element(el),
                        Action::Preserve => {}
                        _ => {
                            if let Node::Element(existing) = &mut base.children[idx] {
                                self.merge_element(existing, el, path);
                            }
                        }
                    },
                },
            }
            path.pop();
        }

        let mut texts = texts.into_iter();
        for slot in base.children.iter_mut().filter(|n| n.is_text()) {
            match texts.next() {
                Some(text) => *slot = text,
                None => break,
            }
        }
        base.children.extend(texts);
    }
}

impl Merger for OverlayMerger {
    fn merge(&self, sources: &mut [SourceStream]) -> Result<Box<dyn Read>> {
        let mut merged: Option<Document> = None;

        for source in sources.iter_mut() {
            let bytes = source.read_to_vec().map_err(|e| Error::SourceRead {
                path: source.path().to_path_buf(),
                source: e,
            })?;
            let doc = tree::parse(&bytes, source.path())?;

            match merged.as_mut() {
                None => merged = Some(doc),
                Some(base) => {
                    let origin = source.path().display().to_string();
                    self.overlay_document(base, doc, &origin)?;
                }
            }
        }

        let doc = merged.ok_or_else(|| Error::Merge("no documents to merge".to_string()))?;
        Ok(Box::new(Cursor::new(tree::write(&doc)?)))
    }
}

fn element_key(el: &Element) -> (&str, Option<&str>) {
    (el.name.as_str(), el.attribute("id"))
}

fn same_key(node: &Node, key: &(String, Option<String>)) -> bool {
    match node {
        Node::Element(el) => element_key(el) == (key.0.as_str(), key.1.as_deref()),
        _ => false,
    }
}

/// Index of the `nth` child of `base` matching `key`.
fn find_match(base: &Element, key: &(String, Option<String>), nth: usize) -> Option<usize> {
    base.children
        .iter()
        .enumerate()
        .filter(|(_, n)| same_key(n, key))
        .nth(nth)
        .map(|(idx, _)| idx)
}
