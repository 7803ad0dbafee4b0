//! Connector lookup by resource ID

use rindex_common::Resource;
use tracing::debug;

use super::access_tool::ResourceAccessTool;
use super::http::HttpClient;
use crate::config::IngestConfig;
use crate::error::{IngestError, Result};
use crate::resources::{
    array_express, biositemaps, clinical_trials, drugbank, geo, omim, pubmed, reactome,
    reporter, uniprot, youtube,
};

/// Every registered resource ID, sorted
pub fn tool_ids() -> Vec<&'static str> {
    let mut ids = vec![
        array_express::RESOURCE_ID,
        biositemaps::RESOURCE_ID,
        clinical_trials::RESOURCE_ID,
        drugbank::RESOURCE_ID,
        geo::RESOURCE_ID,
        omim::RESOURCE_ID,
        pubmed::RESOURCE_ID,
        reactome::RESOURCE_ID,
        reporter::RESOURCE_ID,
        uniprot::RESOURCE_ID,
        youtube::RESOURCE_ID,
    ];
    ids.sort_unstable();
    ids
}

/// Static descriptions of every resource; needs no configuration
pub fn resources() -> Vec<Resource> {
    tool_ids()
        .into_iter()
        .filter_map(describe)
        .collect()
}

/// Description of one resource, case-insensitive
pub fn describe(id: &str) -> Option<Resource> {
    let resource = match canonical_id(id)? {
        array_express::RESOURCE_ID => array_express::resource(),
        biositemaps::RESOURCE_ID => biositemaps::resource(),
        clinical_trials::RESOURCE_ID => clinical_trials::resource(),
        drugbank::RESOURCE_ID => drugbank::resource(),
        geo::RESOURCE_ID => geo::resource(),
        omim::RESOURCE_ID => omim::resource(),
        pubmed::RESOURCE_ID => pubmed::resource(),
        reactome::RESOURCE_ID => reactome::resource(),
        reporter::RESOURCE_ID => reporter::resource(),
        uniprot::RESOURCE_ID => uniprot::resource(),
        youtube::RESOURCE_ID => youtube::resource(),
        _ => return None,
    };
    Some(resource)
}

fn canonical_id(id: &str) -> Option<&'static str> {
    let id = id.trim();
    tool_ids().into_iter().find(|known| known.eq_ignore_ascii_case(id))
}

fn unknown(id: &str) -> IngestError {
    IngestError::UnknownResource {
        requested: id.to_string(),
        known: tool_ids().join(", "),
    }
}

/// Resolve user-supplied IDs to canonical ones, keeping order and dropping repeats
pub fn resolve_ids<S: AsRef<str>>(ids: &[S]) -> Result<Vec<&'static str>> {
    let mut resolved = Vec::new();
    for id in ids {
        let canonical = canonical_id(id.as_ref()).ok_or_else(|| unknown(id.as_ref()))?;
        if !resolved.contains(&canonical) {
            resolved.push(canonical);
        }
    }
    Ok(resolved)
}

/// Build the connector for `id` from its configuration section
pub fn build_tool(id: &str, config: &IngestConfig) -> Result<Box<dyn ResourceAccessTool>> {
    let canonical = canonical_id(id).ok_or_else(|| unknown(id))?;
    let http = || HttpClient::new(&config.http);

    let tool: Box<dyn ResourceAccessTool> = match canonical {
        array_express::RESOURCE_ID => Box::new(array_express::ArrayExpressTool::new(
            config.array_express.clone(),
            http()?,
        )?),
        biositemaps::RESOURCE_ID => Box::new(biositemaps::BioSiteMapsTool::new(
            config.biositemaps.clone(),
            http()?,
        )?),
        clinical_trials::RESOURCE_ID => Box::new(clinical_trials::ClinicalTrialsTool::new(
            config.clinical_trials.clone(),
            http()?,
        )?),
        drugbank::RESOURCE_ID => Box::new(drugbank::DrugBankTool::new(
            config.drugbank.clone(),
            http()?,
        )?),
        geo::RESOURCE_ID => Box::new(geo::GeoTool::new(config.eutils.clone(), http()?)?),
        omim::RESOURCE_ID => Box::new(omim::OmimTool::new(config.omim.clone())?),
        pubmed::RESOURCE_ID => Box::new(pubmed::PubMedTool::new(config.eutils.clone(), http()?)?),
        reactome::RESOURCE_ID => Box::new(reactome::ReactomeTool::new(config.reactome.clone())?),
        reporter::RESOURCE_ID => Box::new(reporter::ReporterTool::new(
            config.reporter.clone(),
            http()?,
        )?),
        uniprot::RESOURCE_ID => Box::new(uniprot::UniProtTool::new(
            config.uniprot.clone(),
            http()?,
        )?),
        youtube::RESOURCE_ID => Box::new(youtube::YouTubeTool::new(
            config.youtube.clone(),
            http()?,
        )?),
        _ => return Err(unknown(id)),
    };
    debug!(resource_id = canonical, "Built connector");
    Ok(tool)
}

/// Build every connector. Each entry carries its own result so one
/// misconfigured resource does not hide the others.
pub fn build_all(config: &IngestConfig) -> Vec<(&'static str, Result<Box<dyn ResourceAccessTool>>)> {
    tool_ids()
        .into_iter()
        .map(|id| (id, build_tool(id, config)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_ids() {
        assert_eq!(
            tool_ids(),
            vec!["AE", "BSM", "CT", "DBK", "GEO", "OMIM", "PM", "REAC", "RPTR", "UPKB", "YTB"]
        );
    }

    #[test]
    fn test_every_resource_is_valid() {
        let resources = resources();
        assert_eq!(resources.len(), tool_ids().len());
        for resource in resources {
            resource.validate().unwrap();
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let tool = build_tool("ct", &IngestConfig::default()).unwrap();
        assert_eq!(tool.resource_id(), "CT");
        assert_eq!(describe(" geo ").unwrap().resource_id, "GEO");
    }

    #[test]
    fn test_unknown_id_lists_known_ones() {
        let err = build_tool("NOPE", &IngestConfig::default()).err().unwrap();
        let message = err.to_string();
        assert!(message.contains("NOPE"));
        assert!(message.contains("GEO"));
    }

    #[test]
    fn test_resolve_ids_dedups() {
        assert_eq!(resolve_ids(&["pm", "PM", "geo"]).unwrap(), vec!["PM", "GEO"]);
        assert!(resolve_ids(&["PM", "XX"]).is_err());
    }

    #[test]
    fn test_build_all_reports_each_resource() {
        let built = build_all(&IngestConfig::default());
        assert_eq!(built.len(), tool_ids().len());

        let ct = built.iter().find(|(id, _)| *id == "CT").unwrap();
        assert!(ct.1.is_ok());
        // no API key configured by default
        let ytb = built.iter().find(|(id, _)| *id == "YTB").unwrap();
        assert!(ytb.1.is_err());
    }
}
