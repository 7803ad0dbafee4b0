//! Minimal RDF/XML reader
//!
//! Handles the striped syntax used by site-map style documents: node
//! elements directly under `rdf:RDF`, literal-valued property elements, and
//! literals nested in containers such as `rdf:Bag`/`rdf:li`. Property and
//! type names are reported by local name.

use quick_xml::events::BytesStart;

use super::xml::{attribute, walk, XmlVisitor};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RdfNode {
    /// `rdf:about`, `#` + `rdf:ID`, or `_:` + `rdf:nodeID`; empty for anonymous nodes
    pub subject: String,
    pub types: Vec<String>,
    /// `(property local name, literal)` in document order
    pub properties: Vec<(String, String)>,
}

impl RdfNode {
    pub fn values<'a, 'p>(&'a self, property: &'p str) -> impl Iterator<Item = &'a str> + 'p
    where
        'a: 'p,
    {
        self.properties
            .iter()
            .filter(move |(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn first(&self, property: &str) -> Option<&str> {
        self.values(property).next()
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| t.eq_ignore_ascii_case(type_name))
    }
}

/// Fragment or last path segment of an IRI
fn iri_local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

#[derive(Default)]
struct RdfVisitor {
    in_rdf: bool,
    current: Option<RdfNode>,
    nodes: Vec<RdfNode>,
}

impl XmlVisitor for RdfVisitor {
    fn start(&mut self, path: &[String], element: &BytesStart<'_>) -> Result<()> {
        match path.len() {
            1 => self.in_rdf = path[0] == "RDF",
            2 if self.in_rdf => {
                let subject = if let Some(about) = attribute(element, "about")? {
                    about
                } else if let Some(id) = attribute(element, "ID")? {
                    format!("#{}", id)
                } else if let Some(node_id) = attribute(element, "nodeID")? {
                    format!("_:{}", node_id)
                } else {
                    String::new()
                };
                let mut node = RdfNode {
                    subject,
                    ..RdfNode::default()
                };
                if path[1] != "Description" {
                    node.types.push(path[1].clone());
                }
                self.current = Some(node);
            },
            3 => {
                if let Some(node) = self.current.as_mut() {
                    if path[2] == "type" {
                        if let Some(iri) = attribute(element, "resource")? {
                            node.types.push(iri_local_name(&iri).to_string());
                        }
                    }
                }
            },
            _ => {},
        }
        Ok(())
    }

    fn text(&mut self, path: &[String], text: &str) -> Result<()> {
        if path.len() >= 3 {
            if let Some(node) = self.current.as_mut() {
                node.properties.push((path[2].clone(), text.to_string()));
            }
        }
        Ok(())
    }

    fn end(&mut self, path: &[String]) -> Result<()> {
        if path.len() == 2 {
            if let Some(node) = self.current.take() {
                self.nodes.push(node);
            }
        }
        Ok(())
    }
}

/// Top-level nodes of an RDF/XML document, in document order
pub fn parse_rdf_xml(bytes: &[u8]) -> Result<Vec<RdfNode>> {
    let mut visitor = RdfVisitor::default();
    walk(bytes, &mut visitor)?;
    Ok(visitor.nodes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:bsm="http://biositemaps.example.org/ns#">
  <bsm:Resource rdf:about="http://example.org/tools/blast">
    <bsm:name>BLAST</bsm:name>
    <bsm:description>Sequence &amp; alignment search</bsm:description>
    <bsm:keywords>
      <rdf:Bag>
        <rdf:li>alignment</rdf:li>
        <rdf:li>sequence</rdf:li>
      </rdf:Bag>
    </bsm:keywords>
  </bsm:Resource>
  <rdf:Description rdf:ID="galaxy">
    <rdf:type rdf:resource="http://biositemaps.example.org/ns#Resource"/>
    <bsm:name>Galaxy</bsm:name>
  </rdf:Description>
</rdf:RDF>"#;

    #[test]
    fn test_typed_node() {
        let nodes = parse_rdf_xml(DOC.as_bytes()).unwrap();
        assert_eq!(nodes.len(), 2);

        let blast = &nodes[0];
        assert_eq!(blast.subject, "http://example.org/tools/blast");
        assert!(blast.has_type("Resource"));
        assert_eq!(blast.first("name"), Some("BLAST"));
        assert_eq!(blast.first("description"), Some("Sequence & alignment search"));
        assert_eq!(blast.values("keywords").collect::<Vec<_>>(), vec!["alignment", "sequence"]);
    }

    #[test]
    fn test_description_with_rdf_type() {
        let nodes = parse_rdf_xml(DOC.as_bytes()).unwrap();
        let galaxy = &nodes[1];
        assert_eq!(galaxy.subject, "#galaxy");
        assert_eq!(galaxy.types, vec!["Resource"]);
        assert_eq!(galaxy.first("name"), Some("Galaxy"));
    }

    #[test]
    fn test_non_rdf_root_yields_nothing() {
        assert!(parse_rdf_xml(b"<html><body>x</body></html>").unwrap().is_empty());
    }
}
