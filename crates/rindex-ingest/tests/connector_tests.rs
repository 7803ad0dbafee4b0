//! Connectors against mocked resource endpoints
//!
//! Each test starts a `wiremock` server standing in for the live API and
//! points the connector's base URL at it.

use chrono::{Days, NaiveDate, Utc};
use rindex_ingest::config::HttpConfig;
use rindex_ingest::framework::{FetchContext, HttpClient, ResourceAccessTool};
use rindex_ingest::resources::{
    array_express::{ArrayExpressConfig, ArrayExpressTool},
    biositemaps::{BioSiteMapsConfig, BioSiteMapsTool},
    clinical_trials::{ClinicalTrialsConfig, ClinicalTrialsTool},
    drugbank::{DrugBankConfig, DrugBankSource, DrugBankTool},
    eutils::{Eutils, EutilsConfig, MAX_SEARCH_DEPTH},
    geo::GeoTool,
    omim::{OmimConfig, OmimTool},
    pubmed::PubMedTool,
    reporter::{ReporterConfig, ReporterTool, MAX_RESULTS},
    uniprot::{UniProtConfig, UniProtTool},
    youtube::{YouTubeConfig, YouTubeTool},
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use wiremock::{
    matchers::{method, path, query_param, query_param_is_missing},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

fn http() -> HttpClient {
    HttpClient::new(&HttpConfig {
        max_retries: 1,
        retry_base_delay_ms: 1,
        ..HttpConfig::default()
    })
    .unwrap()
}

fn ids(elements: &[rindex_common::Element]) -> Vec<&str> {
    elements.iter().map(|e| e.local_element_id()).collect()
}

fn study(nct_id: &str, title: &str) -> serde_json::Value {
    json!({
        "protocolSection": {
            "identificationModule": { "nctId": nct_id, "briefTitle": title },
            "conditionsModule": { "conditions": ["Asthma"] }
        }
    })
}

// ============================================================================
// ClinicalTrials.gov
// ============================================================================

#[tokio::test]
async fn test_clinical_trials_pages_and_skips_known() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/studies"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "studies": [study("NCT001", "First"), study("NCT002", "Second")],
            "nextPageToken": "page2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/studies"))
        .and(query_param("pageToken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "studies": [study("NCT003", "Third")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = ClinicalTrialsTool::new(
        ClinicalTrialsConfig {
            base_url: server.uri(),
            ..ClinicalTrialsConfig::default()
        },
        http(),
    )
    .unwrap();

    let known: HashSet<String> = ["NCT002".to_string()].into_iter().collect();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["NCT001", "NCT003"]);
    assert_eq!(elements[0].field("CT_condition"), Some("Asthma"));
}

#[tokio::test]
async fn test_clinical_trials_cap_stops_paging() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/studies"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "studies": [study("NCT001", "First"), study("NCT002", "Second")],
            "nextPageToken": "page2"
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/studies"))
        .and(query_param("pageToken", "page2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let tool = ClinicalTrialsTool::new(
        ClinicalTrialsConfig {
            base_url: server.uri(),
            ..ClinicalTrialsConfig::default()
        },
        http(),
    )
    .unwrap();

    let known = HashSet::new();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, Some(2)))
        .await
        .unwrap();
    assert_eq!(elements.len(), 2);
}

#[tokio::test]
async fn test_clinical_trials_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/studies"))
        .and(query_param("query.term", "asthma"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "studies": [study("NCT010", "Asthma trial")]
        })))
        .mount(&server)
        .await;

    let tool = ClinicalTrialsTool::new(
        ClinicalTrialsConfig {
            base_url: server.uri(),
            ..ClinicalTrialsConfig::default()
        },
        http(),
    )
    .unwrap();

    let found = tool.query_online_resource("asthma").await.unwrap();
    assert_eq!(found, ["NCT010".to_string()].into_iter().collect());
}

#[tokio::test]
async fn test_clinical_trials_query_honors_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/studies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "studies": [study("NCT010", "One"), study("NCT011", "Two"), study("NCT012", "Three")],
            "nextPageToken": "more"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = ClinicalTrialsTool::new(
        ClinicalTrialsConfig {
            base_url: server.uri(),
            query_limit: 2,
            ..ClinicalTrialsConfig::default()
        },
        http(),
    )
    .unwrap();

    let found = tool.query_online_resource("asthma").await.unwrap();
    assert_eq!(found.len(), 2);
}

// ============================================================================
// GEO (E-utilities)
// ============================================================================

#[tokio::test]
async fn test_geo_search_and_summaries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("db", "gds"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<eSearchResult><Count>2</Count><RetMax>2</RetMax><RetStart>0</RetStart>\
             <IdList><Id>200000001</Id><Id>200000002</Id></IdList></eSearchResult>",
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .and(query_param("id", "200000002"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<eSummaryResult>
<DocSum><Id>200000002</Id>
  <Item Name="Accession" Type="String">GSE2</Item>
  <Item Name="title" Type="String">Liver &amp; kidney</Item>
  <Item Name="summary" Type="String">Tissue survey</Item>
  <Item Name="taxon" Type="String">Rattus norvegicus</Item>
</DocSum>
</eSummaryResult>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    // the known series is recognized from its uid, so it is never summarized
    Mock::given(method("GET"))
        .and(path("/esummary.fcgi"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let tool = GeoTool::new(
        EutilsConfig {
            base_url: server.uri(),
            ..EutilsConfig::default()
        },
        http(),
    )
    .unwrap();

    let known: HashSet<String> = ["GSE1".to_string()].into_iter().collect();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["GSE2"]);
    assert_eq!(elements[0].field("GEO_title"), Some("Liver & kidney"));
}

// ============================================================================
// UniProtKB
// ============================================================================

#[tokio::test]
async fn test_uniprot_follows_next_link() {
    let server = MockServer::start().await;
    let next = format!(
        "<{}/uniprotkb/search?cursor=abc&format=tsv&size=1>; rel=\"next\"",
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param_is_missing("cursor"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next.as_str())
                .set_body_string("Entry\tProtein names\nP00001\tFirst protein\n"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/uniprotkb/search"))
        .and(query_param("cursor", "abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("Entry\tProtein names\nP00002\tSecond protein\n"),
        )
        .mount(&server)
        .await;

    let tool = UniProtTool::new(
        UniProtConfig {
            base_url: server.uri(),
            page_size: 1,
            ..UniProtConfig::default()
        },
        http(),
    )
    .unwrap();

    let known = HashSet::new();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["P00001", "P00002"]);
    assert_eq!(elements[1].field("UPKB_protein_name"), Some("Second protein"));
}

// ============================================================================
// YouTube
// ============================================================================

#[tokio::test]
async fn test_youtube_fetches_details_for_new_videos_only() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": { "kind": "youtube#video", "videoId": "old" } },
                { "id": { "kind": "youtube#video", "videoId": "new1" } },
                { "id": { "kind": "youtube#video", "videoId": "new2" } }
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/videos"))
        .and(query_param("id", "new1,new2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                { "id": "new1", "snippet": { "title": "Gene therapy", "tags": ["AAV"] } },
                { "id": "new2", "snippet": { "title": "Protein folding" } }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tool = YouTubeTool::new(
        YouTubeConfig {
            base_url: server.uri(),
            api_key: Some("test-key".to_string()),
            ..YouTubeConfig::default()
        },
        http(),
    )
    .unwrap();

    let known: HashSet<String> = ["old".to_string()].into_iter().collect();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["new1", "new2"]);
    assert_eq!(elements[0].field("YTB_tags"), Some("AAV"));
}

// ============================================================================
// BioSiteMaps
// ============================================================================

#[tokio::test]
async fn test_biositemaps_skips_unreachable_documents() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/sitemap.rdf"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns:bsm="http://biositemaps.ncbcs.org/schema#">
  <bsm:Software_Application rdf:about="http://example.org/tools#viewer">
    <bsm:resource_name>Genome viewer</bsm:resource_name>
  </bsm:Software_Application>
</rdf:RDF>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing.rdf"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let tool = BioSiteMapsTool::new(
        BioSiteMapsConfig {
            urls: vec![
                format!("{}/missing.rdf", server.uri()),
                format!("{}/sitemap.rdf", server.uri()),
            ],
        },
        http(),
    )
    .unwrap();

    let known = HashSet::new();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["http://example.org/tools#viewer"]);
    assert_eq!(elements[0].field("BSM_name"), Some("Genome viewer"));
}

// ============================================================================
// DrugBank
// ============================================================================

#[tokio::test]
async fn test_drugbank_downloads_gzipped_dump() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let xml = r#"<?xml version="1.0"?>
<drugbank xmlns="http://www.drugbank.ca">
  <drug><drugbank-id primary="true">DB00001</drugbank-id><name>Lepirudin</name></drug>
  <drug><drugbank-id primary="true">DB00002</drugbank-id><name>Cetuximab</name></drug>
</drugbank>"#;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).unwrap();
    let gz = encoder.finish().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/full_database.xml.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(gz))
        .mount(&server)
        .await;

    let tool = DrugBankTool::new(
        DrugBankConfig {
            source: Some(DrugBankSource::Url(format!(
                "{}/full_database.xml.gz",
                server.uri()
            ))),
        },
        http(),
    )
    .unwrap();

    let known: HashSet<String> = ["DB00001".to_string()].into_iter().collect();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["DB00002"]);
    assert_eq!(elements[0].field("DBK_name"), Some("Cetuximab"));
}

// ============================================================================
// E-utilities deep searches and PubMed
// ============================================================================

/// esearch over a fixed set of records spread across the last few days,
/// enforcing NCBI's `retstart` ceiling
struct EsearchArchive {
    records: Vec<(NaiveDate, String)>,
}

impl EsearchArchive {
    fn new(count: usize, days: usize) -> Self {
        let today = Utc::now().date_naive();
        let records = (0..count)
            .map(|i| {
                let date = today - Days::new((i % days) as u64);
                (date, (40_000_000 + i).to_string())
            })
            .collect();
        Self { records }
    }
}

fn query_params(request: &Request) -> HashMap<String, String> {
    request.url.query_pairs().into_owned().collect()
}

impl Respond for EsearchArchive {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params = query_params(request);
        let number = |key: &str| {
            params
                .get(key)
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(0)
        };
        let retstart = number("retstart");
        if retstart > 9_998 {
            return ResponseTemplate::new(200).set_body_string(
                "<eSearchResult><ERROR>Search Backend failed: 'retstart' cannot be larger than 9998.</ERROR></eSearchResult>",
            );
        }

        let date = |key: &str| {
            params
                .get(key)
                .and_then(|v| NaiveDate::parse_from_str(v, "%Y/%m/%d").ok())
        };
        let hits: Vec<&str> = match (date("mindate"), date("maxdate")) {
            (Some(from), Some(to)) => self
                .records
                .iter()
                .filter(|(d, _)| from <= *d && *d <= to)
                .map(|(_, id)| id.as_str())
                .collect(),
            _ => self.records.iter().map(|(_, id)| id.as_str()).collect(),
        };
        let ids: String = hits
            .iter()
            .skip(retstart)
            .take(number("retmax"))
            .map(|id| format!("<Id>{}</Id>", id))
            .collect();

        ResponseTemplate::new(200).set_body_string(format!(
            "<eSearchResult><Count>{}</Count><RetStart>{}</RetStart><IdList>{}</IdList></eSearchResult>",
            hits.len(),
            retstart,
            ids
        ))
    }
}

async fn max_requested(server: &MockServer, key: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| query_params(r).get(key).and_then(|v| v.parse().ok()))
        .max()
        .unwrap_or(0)
}

#[tokio::test]
async fn test_eutils_splits_searches_deeper_than_esearch_allows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(EsearchArchive::new(15_000, 3))
        .mount(&server)
        .await;

    let eutils = Eutils::new(
        EutilsConfig {
            base_url: server.uri(),
            ..EutilsConfig::default()
        },
        http(),
    );
    let ids = eutils.search_ids("pubmed", "asthma", "edat", None).await.unwrap();

    assert_eq!(ids.len(), 15_000);
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 15_000);
    assert!(max_requested(&server, "retstart").await < MAX_SEARCH_DEPTH);
}

fn pubmed_article(pmid: &str, title: &str) -> String {
    format!(
        "<PubmedArticleSet><PubmedArticle><MedlineCitation><PMID>{}</PMID>\
         <Article><ArticleTitle>{}</ArticleTitle></Article>\
         </MedlineCitation></PubmedArticle></PubmedArticleSet>",
        pmid, title
    )
}

#[tokio::test]
async fn test_pubmed_cap_limits_search_and_batches_efetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(EsearchArchive::new(15_000, 3))
        .mount(&server)
        .await;

    for (pmid, title) in [("40000001", "Second"), ("40000002", "Third")] {
        Mock::given(method("GET"))
            .and(path("/efetch.fcgi"))
            .and(query_param("id", pmid))
            .respond_with(ResponseTemplate::new(200).set_body_string(pubmed_article(pmid, title)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let tool = PubMedTool::new(
        EutilsConfig {
            base_url: server.uri(),
            fetch_batch_size: 1,
            ..EutilsConfig::default()
        },
        http(),
    )
    .unwrap();

    let known: HashSet<String> = ["40000000".to_string()].into_iter().collect();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, Some(2)))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["40000001", "40000002"]);
    assert_eq!(elements[1].field("PM_title"), Some("Third"));
    // the search asked for the cap plus the known IDs, not all 15 000 hits
    assert_eq!(max_requested(&server, "retmax").await, 3);
}

// ============================================================================
// ArrayExpress
// ============================================================================

fn ae_study(accession: &str, title: &str) -> serde_json::Value {
    json!({
        "accno": accession,
        "section": {
            "attributes": [
                {"name": "Title", "value": title},
                {"name": "Organism", "value": "Homo sapiens"}
            ]
        }
    })
}

async fn ae_search_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/arrayexpress/search"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalHits": 3,
            "hits": [
                {"accession": "E-MTAB-1", "title": "Stored"},
                {"accession": "E-MTAB-2", "title": "Liver"}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/arrayexpress/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalHits": 3,
            "hits": [{"accession": "E-MTAB-3", "title": "Withdrawn"}]
        })))
        .mount(server)
        .await;
}

fn ae_tool(server: &MockServer) -> ArrayExpressTool {
    ArrayExpressTool::new(
        ArrayExpressConfig {
            base_url: server.uri(),
            page_size: 2,
            ..ArrayExpressConfig::default()
        },
        http(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_array_express_pages_and_skips_known_and_missing_studies() {
    let server = MockServer::start().await;
    ae_search_pages(&server).await;

    Mock::given(method("GET"))
        .and(path("/studies/E-MTAB-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ae_study("E-MTAB-1", "Stored")))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/studies/E-MTAB-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ae_study("E-MTAB-2", "Liver")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/studies/E-MTAB-3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let known: HashSet<String> = ["E-MTAB-1".to_string()].into_iter().collect();
    let elements = ae_tool(&server)
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["E-MTAB-2"]);
    assert_eq!(elements[0].field("AE_species"), Some("Homo sapiens"));
}

#[tokio::test]
async fn test_array_express_server_errors_fail_the_run() {
    let server = MockServer::start().await;
    ae_search_pages(&server).await;

    Mock::given(method("GET"))
        .and(path("/studies/E-MTAB-1"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let known = HashSet::new();
    let result = ae_tool(&server)
        .fetch_elements(&FetchContext::new(&known, None))
        .await;
    assert!(result.is_err());
}

// ============================================================================
// NIH RePORTER
// ============================================================================

/// Project search over a fixed set of awards, enforcing the offset ceiling
struct ReporterArchive {
    projects: Vec<(NaiveDate, u64)>,
}

impl ReporterArchive {
    fn new(count: u64, days: u64) -> Self {
        let today = Utc::now().date_naive();
        let projects = (1..=count)
            .map(|appl_id| (today - Days::new(appl_id % days), appl_id))
            .collect();
        Self { projects }
    }
}

impl Respond for ReporterArchive {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };
        let offset = body["offset"].as_u64().unwrap_or(0) as usize;
        let limit = body["limit"].as_u64().unwrap_or(50) as usize;
        if offset > 14_999 {
            return ResponseTemplate::new(400)
                .set_body_json(json!({"detail": "offset must be between 0 and 14999"}));
        }

        let window = &body["criteria"]["award_notice_date"];
        let bound = |key: &str| {
            window[key]
                .as_str()
                .and_then(|v| NaiveDate::parse_from_str(v, "%Y-%m-%d").ok())
        };
        let hits: Vec<u64> = match (bound("from_date"), bound("to_date")) {
            (Some(from), Some(to)) => self
                .projects
                .iter()
                .filter(|(d, _)| from <= *d && *d <= to)
                .map(|(_, id)| *id)
                .collect(),
            _ => self.projects.iter().map(|(_, id)| *id).collect(),
        };
        let results: Vec<serde_json::Value> = hits
            .iter()
            .skip(offset)
            .take(limit)
            .map(|id| json!({"appl_id": id, "project_num": format!("R01GM{}", id), "project_title": format!("Project {}", id)}))
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"total": hits.len(), "offset": offset, "limit": limit},
            "results": results
        }))
    }
}

#[tokio::test]
async fn test_reporter_reaches_projects_beyond_the_offset_ceiling() {
    const PROJECTS: u64 = 20_000;
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/projects/search"))
        .respond_with(ReporterArchive::new(PROJECTS, 2))
        .mount(&server)
        .await;

    let tool = ReporterTool::new(
        ReporterConfig {
            base_url: server.uri(),
            ..ReporterConfig::default()
        },
        http(),
    )
    .unwrap();

    let known: HashSet<String> = ["1".to_string()].into_iter().collect();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();

    assert_eq!(elements.len(), PROJECTS as usize - 1);
    assert!(elements.len() > MAX_RESULTS);
    assert!(elements.iter().any(|e| e.local_element_id() == "20000"));
}

#[tokio::test]
async fn test_reporter_small_search_pages_by_offset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/projects/search"))
        .respond_with(ReporterArchive::new(5, 1))
        .expect(3)
        .mount(&server)
        .await;

    let tool = ReporterTool::new(
        ReporterConfig {
            base_url: server.uri(),
            page_size: 2,
            ..ReporterConfig::default()
        },
        http(),
    )
    .unwrap();

    let known = HashSet::new();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, None))
        .await
        .unwrap();
    assert_eq!(ids(&elements), vec!["1", "2", "3", "4", "5"]);
}

// ============================================================================
// OMIM
// ============================================================================

#[tokio::test]
async fn test_omim_reads_local_gzip_dump() {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let dump = "*RECORD*\n*FIELD* NO\n100050\n*FIELD* TI\n100050 AARSKOG SYNDROME\n\
                *RECORD*\n*FIELD* NO\n100100\n*FIELD* TI\n#100100 PRUNE BELLY SYNDROME\n\
                *FIELD* TX\nAbsence of abdominal musculature.\n\
                *RECORD*\n*FIELD* NO\n100200\n*FIELD* TI\n100200 ABDUCENS PALSY\n*THEEND*\n";
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("omim.txt.gz");
    let mut encoder = GzEncoder::new(std::fs::File::create(&file).unwrap(), Compression::default());
    encoder.write_all(dump.as_bytes()).unwrap();
    encoder.finish().unwrap();

    let tool = OmimTool::new(OmimConfig {
        local_file: Some(file),
        ..OmimConfig::default()
    })
    .unwrap();

    let known: HashSet<String> = ["100050".to_string()].into_iter().collect();
    let elements = tool
        .fetch_elements(&FetchContext::new(&known, Some(1)))
        .await
        .unwrap();

    assert_eq!(ids(&elements), vec!["100100"]);
    assert_eq!(elements[0].field("OMIM_title"), Some("PRUNE BELLY SYNDROME"));
}
