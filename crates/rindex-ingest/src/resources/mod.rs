//! One connector per external resource
//!
//! Each module exposes `RESOURCE_ID`, a `resource()` description, a config
//! section, a pure parser for the resource's wire format and the
//! [`ResourceAccessTool`](crate::framework::ResourceAccessTool)
//! implementation.

pub mod array_express;
pub mod biositemaps;
pub mod clinical_trials;
pub mod drugbank;
pub mod eutils;
pub mod geo;
pub mod omim;
pub mod pubmed;
pub mod reactome;
pub mod reporter;
pub mod uniprot;
pub mod youtube;

use std::collections::HashSet;

/// Default query-result cap for `query_online_resource`
pub(crate) const DEFAULT_QUERY_LIMIT: usize = 1_000;

/// Add non-empty IDs until `ids` holds `limit` entries
pub(crate) fn extend_capped<I>(ids: &mut HashSet<String>, found: I, limit: usize)
where
    I: IntoIterator<Item = String>,
{
    for id in found {
        if ids.len() >= limit {
            break;
        }
        if !id.is_empty() {
            ids.insert(id);
        }
    }
}
