//! Content-region matching for selections.
//!
//! A rendered line remembers the chain of region nodes it sits in, outermost
//! first. A selection only counts when the innermost node of its anchor, or
//! one of its ancestors, matches a content marker.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: String,
    pub classes: Vec<String>,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            classes: Vec::new(),
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c == name)
    }
}

impl fmt::Display for ElementNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag)?;
        for class in &self.classes {
            write!(f, ".{class}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ElementPath {
    nodes: Vec<ElementNode>,
}

impl ElementPath {
    pub fn new(nodes: Vec<ElementNode>) -> Self {
        Self { nodes }
    }

    pub fn child(&self, node: ElementNode) -> Self {
        let mut nodes = self.nodes.clone();
        nodes.push(node);
        Self { nodes }
    }

    pub fn nodes(&self) -> &[ElementNode] {
        &self.nodes
    }

    /// Nearest node, starting from the innermost one, that matches `marker`
    pub fn closest(&self, marker: &RegionMarker) -> Option<&ElementNode> {
        self.nodes.iter().rev().find(|node| marker.matches(node))
    }

    pub fn is_within_any(&self, markers: &[RegionMarker]) -> bool {
        markers.iter().any(|marker| self.closest(marker).is_some())
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegionMarker {
    /// `.name`
    Class(String),
    /// `tag`
    Tag(String),
    /// `[class*="fragment"]`
    ClassContains(String),
}

impl RegionMarker {
    pub fn matches(&self, node: &ElementNode) -> bool {
        match self {
            RegionMarker::Class(name) => node.has_class(name),
            RegionMarker::Tag(tag) => node.tag.eq_ignore_ascii_case(tag),
            RegionMarker::ClassContains(fragment) => {
                node.classes.iter().any(|c| c.contains(fragment.as_str()))
            }
        }
    }

    /// Markers that identify book content on a rendered page
    pub fn content_defaults() -> Vec<RegionMarker> {
        vec![
            RegionMarker::Class("markdown".into()),
            RegionMarker::Class("container".into()),
            RegionMarker::Tag("article".into()),
            RegionMarker::Class("main-wrapper".into()),
            RegionMarker::Tag("main".into()),
            RegionMarker::Class("docContent".into()),
            RegionMarker::ClassContains("docItem".into()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_path() -> ElementPath {
        ElementPath::new(vec![
            ElementNode::new("div").with_class("layout"),
            ElementNode::new("main"),
            ElementNode::new("article").with_class("markdown"),
            ElementNode::new("p"),
        ])
    }

    #[test]
    fn closest_walks_from_innermost_node() {
        let path = article_path();
        let found = path.closest(&RegionMarker::Class("markdown".into())).unwrap();
        assert_eq!(found.tag, "article");
        assert!(path.closest(&RegionMarker::Tag("nav".into())).is_none());
    }

    #[test]
    fn class_contains_matches_fragments() {
        let node = ElementNode::new("div").with_class("theme-docItemContainer");
        assert!(RegionMarker::ClassContains("docItem".into()).matches(&node));
        assert!(!RegionMarker::Class("docItem".into()).matches(&node));
    }

    #[test]
    fn sidebar_chrome_is_not_content() {
        let sidebar = ElementPath::new(vec![
            ElementNode::new("div").with_class("layout"),
            ElementNode::new("nav").with_class("sidebar"),
        ]);
        assert!(!sidebar.is_within_any(&RegionMarker::content_defaults()));
        assert!(article_path().is_within_any(&RegionMarker::content_defaults()));
    }

    #[test]
    fn display_renders_selector_like_path() {
        assert_eq!(
            article_path().to_string(),
            "div.layout > main > article.markdown > p"
        );
    }
}
