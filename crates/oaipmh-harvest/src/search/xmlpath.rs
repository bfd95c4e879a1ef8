//! A compiled subset-XPath over record XML.
//!
//! Supported: absolute location paths of child (`/name`) and descendant
//! (`//name`) steps, with an optional final attribute step (`@name`).
//! Element and attribute names match on local name, so producer
//! namespace prefixes are irrelevant. No predicates, no functions.

use roxmltree::{Document, Node};

use super::SearchError;

/// A step in a compiled path.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    name: String,
    /// True for `//name` (any depth), false for `/name` (direct child).
    descendant: bool,
}

/// A compiled path expression.
#[derive(Debug, Clone)]
pub struct XmlPath {
    steps: Vec<Step>,
    attribute: Option<String>,
}

impl XmlPath {
    /// Compile a path expression.
    pub fn compile(path: &str) -> Result<XmlPath, SearchError> {
        let fail = |reason: &str| SearchError::Path {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        if !path.starts_with('/') {
            return Err(fail("path must be absolute"));
        }

        let mut remaining = path;
        let mut steps = Vec::new();
        let mut attribute = None;

        while !remaining.is_empty() {
            let descendant = if let Some(rest) = remaining.strip_prefix("//") {
                remaining = rest;
                true
            } else if let Some(rest) = remaining.strip_prefix('/') {
                remaining = rest;
                false
            } else {
                return Err(fail("expected '/' between steps"));
            };

            let end = remaining.find('/').unwrap_or(remaining.len());
            let segment = &remaining[..end];
            remaining = &remaining[end..];

            if segment.is_empty() {
                return Err(fail("empty step"));
            }

            if let Some(attr) = segment.strip_prefix('@') {
                if attr.is_empty() {
                    return Err(fail("empty attribute name"));
                }
                if !remaining.is_empty() {
                    return Err(fail("attribute step must be last"));
                }
                attribute = Some(local_part(attr).to_string());
            } else {
                steps.push(Step {
                    name: local_part(segment).to_string(),
                    descendant,
                });
            }
        }

        if steps.is_empty() {
            return Err(fail("path selects no element"));
        }

        Ok(XmlPath { steps, attribute })
    }

    /// Evaluate the path over an XML document and return the first
    /// match's string value, or `None` when nothing matches.
    pub fn first_match(&self, xml: &str) -> Result<Option<String>, SearchError> {
        let document =
            Document::parse(xml).map_err(|e| SearchError::Xml(e.to_string()))?;

        let mut current: Vec<Node> = vec![document.root()];

        for step in &self.steps {
            let mut next = Vec::new();
            for node in &current {
                if step.descendant {
                    // Strict descendants: skip the node itself.
                    next.extend(
                        node.descendants()
                            .skip(1)
                            .filter(|n| n.is_element() && n.tag_name().name() == step.name),
                    );
                } else {
                    next.extend(
                        node.children()
                            .filter(|n| n.is_element() && n.tag_name().name() == step.name),
                    );
                }
            }
            if next.is_empty() {
                return Ok(None);
            }
            current = next;
        }

        match &self.attribute {
            Some(attr) => Ok(current.iter().find_map(|node| {
                node.attributes()
                    .find(|a| a.name() == attr.as_str())
                    .map(|a| a.value().to_string())
            })),
            None => Ok(Some(string_value(&current[0]))),
        }
    }
}

/// The string value of an element: all descendant text, concatenated.
fn string_value(node: &Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Strip a namespace prefix from a name.
fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_steps_match_by_local_name() {
        let path = XmlPath::compile("/a/b/c").unwrap();
        let xml = r#"<gmd:a xmlns:gmd="something"><val>Some value</val><b><d>Something</d><c>I've got C</c></b></gmd:a>"#;
        assert_eq!(path.first_match(xml).unwrap().as_deref(), Some("I've got C"));
    }

    #[test]
    fn no_match_yields_none() {
        let path = XmlPath::compile("/a/b/c").unwrap();
        let xml = r#"<a><val>Some value</val><b><d>No C Here</d></b></a>"#;
        assert_eq!(path.first_match(xml).unwrap(), None);
    }

    #[test]
    fn attribute_step() {
        let path = XmlPath::compile("/xml/value/@attr").unwrap();
        let xml = r#"<xml>This has<value attr="some attribute" /> set</xml>"#;
        assert_eq!(
            path.first_match(xml).unwrap().as_deref(),
            Some("some attribute")
        );
    }

    #[test]
    fn descendant_step_matches_any_depth() {
        let path = XmlPath::compile("//title").unwrap();
        let xml = r#"<doc><body><section><title>Deep</title></section></body></doc>"#;
        assert_eq!(path.first_match(xml).unwrap().as_deref(), Some("Deep"));
    }

    #[test]
    fn string_value_concatenates_nested_text() {
        let path = XmlPath::compile("/doc/name").unwrap();
        let xml = r#"<doc><name>Jane <last>Doe</last></name></doc>"#;
        assert_eq!(path.first_match(xml).unwrap().as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn element_without_text_is_empty() {
        let path = XmlPath::compile("/xml/value").unwrap();
        let xml = r#"<xml>This has<value attr="some attribute" /> set</xml>"#;
        assert_eq!(path.first_match(xml).unwrap().as_deref(), Some(""));
    }

    #[test]
    fn compile_rejects_relative_and_malformed_paths() {
        assert!(XmlPath::compile("a/b").is_err());
        assert!(XmlPath::compile("/").is_err());
        assert!(XmlPath::compile("/a/@id/b").is_err());
        assert!(XmlPath::compile("/@only").is_err());
    }

    #[test]
    fn malformed_record_xml_is_an_error() {
        let path = XmlPath::compile("/a").unwrap();
        assert!(path.first_match("<a><unclosed>").is_err());
    }
}
