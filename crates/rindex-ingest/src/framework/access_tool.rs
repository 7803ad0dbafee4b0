//! The connector seam: one [`ResourceAccessTool`] per external resource

use async_trait::async_trait;
use rindex_common::{Element, Resource};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{IngestError, Result};

/// What a connector knows about the current state of its ET table
#[derive(Debug, Clone, Copy)]
pub struct FetchContext<'a> {
    known_ids: &'a HashSet<String>,
    max_elements: Option<usize>,
}

impl<'a> FetchContext<'a> {
    pub fn new(known_ids: &'a HashSet<String>, max_elements: Option<usize>) -> Self {
        Self {
            known_ids,
            max_elements,
        }
    }

    pub fn is_known(&self, local_element_id: &str) -> bool {
        self.known_ids.contains(local_element_id)
    }

    pub fn known_count(&self) -> usize {
        self.known_ids.len()
    }

    pub fn known_ids(&self) -> &'a HashSet<String> {
        self.known_ids
    }

    pub fn max_elements(&self) -> Option<usize> {
        self.max_elements
    }
}

/// Accumulates a connector's output while honoring the element cap.
///
/// Known IDs and repeats within the run are dropped here so connectors that
/// page through large catalogs stop as soon as the cap is reached with new
/// elements.
#[derive(Debug)]
pub struct ElementCollector<'c> {
    ctx: &'c FetchContext<'c>,
    elements: Vec<Element>,
    seen: HashSet<String>,
    skipped_known: usize,
}

impl<'c> ElementCollector<'c> {
    pub fn new(ctx: &'c FetchContext<'c>) -> Self {
        Self {
            ctx,
            elements: Vec::new(),
            seen: HashSet::new(),
            skipped_known: 0,
        }
    }

    /// True if the ID is neither stored nor already collected
    pub fn wants(&self, local_element_id: &str) -> bool {
        !self.ctx.is_known(local_element_id) && !self.seen.contains(local_element_id)
    }

    /// Add an element; known and repeated IDs are ignored.
    ///
    /// Returns false once the cap is reached.
    pub fn push(&mut self, element: Element) -> bool {
        if self.is_full() {
            return false;
        }
        let id = element.local_element_id();
        if self.ctx.is_known(id) {
            self.skipped_known += 1;
        } else if self.seen.insert(id.to_string()) {
            self.elements.push(element);
        }
        !self.is_full()
    }

    /// Note that an ID was skipped before its details were fetched
    pub fn skip_known(&mut self) {
        self.skipped_known += 1;
    }

    pub fn is_full(&self) -> bool {
        self.ctx
            .max_elements()
            .is_some_and(|max| self.elements.len() >= max)
    }

    /// Capacity left under the cap, if any
    pub fn remaining(&self) -> Option<usize> {
        self.ctx
            .max_elements()
            .map(|max| max.saturating_sub(self.elements.len()))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn finish(self, resource_id: &str) -> Vec<Element> {
        debug!(
            resource_id,
            collected = self.elements.len(),
            skipped_known = self.skipped_known,
            "Connector finished"
        );
        self.elements
    }
}

#[async_trait]
pub trait ResourceAccessTool: Send + Sync {
    fn resource(&self) -> &Resource;

    fn resource_id(&self) -> &str {
        &self.resource().resource_id
    }

    /// Fetch elements not yet stored, up to the context's cap
    async fn fetch_elements(&self, ctx: &FetchContext<'_>) -> Result<Vec<Element>>;

    /// Local element IDs matching a free-text query against the live resource
    async fn query_online_resource(&self, _query: &str) -> Result<HashSet<String>> {
        Err(IngestError::QueryUnsupported(self.resource_id().to_string()))
    }

    fn element_url(&self, local_element_id: &str) -> String {
        self.resource().element_url_for(local_element_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_skips_known_and_repeats() {
        let known: HashSet<String> = ["A".to_string()].into_iter().collect();
        let ctx = FetchContext::new(&known, None);
        let mut collector = ElementCollector::new(&ctx);

        assert!(!collector.wants("A"));
        collector.push(Element::new("A"));
        collector.push(Element::new("B"));
        collector.push(Element::new("B"));
        assert!(!collector.wants("B"));

        let ids: Vec<_> = collector
            .finish("T")
            .iter()
            .map(|e| e.local_element_id().to_string())
            .collect();
        assert_eq!(ids, vec!["B"]);
    }

    #[test]
    fn test_collector_honors_cap() {
        let known = HashSet::new();
        let ctx = FetchContext::new(&known, Some(2));
        let mut collector = ElementCollector::new(&ctx);

        assert!(collector.push(Element::new("1")));
        assert_eq!(collector.remaining(), Some(1));
        assert!(!collector.push(Element::new("2")));
        assert!(collector.is_full());
        assert!(!collector.push(Element::new("3")));
        assert_eq!(collector.finish("T").len(), 2);
    }
}
