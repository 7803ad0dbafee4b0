//! End-to-end pipeline runs with an in-memory connector and a real MySQL

mod common;

use async_trait::async_trait;
use common::{test_resource, TestMysql};
use rindex_common::{Element, Resource};
use rindex_ingest::framework::{FetchContext, PipelineOptions, ResourceAccessTool, ResourcePipeline};
use rindex_ingest::Result;
use serial_test::serial;

/// Returns the same elements on every fetch, ignoring what is stored
struct FixedTool {
    resource: Resource,
    elements: Vec<Element>,
}

impl FixedTool {
    fn new(elements: Vec<Element>) -> Self {
        Self {
            resource: test_resource("TST"),
            elements,
        }
    }
}

#[async_trait]
impl ResourceAccessTool for FixedTool {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn fetch_elements(&self, _ctx: &FetchContext<'_>) -> Result<Vec<Element>> {
        Ok(self.elements.clone())
    }
}

fn element(id: &str, title: &str) -> Element {
    Element::new(id).with("TST_title", title)
}

fn options() -> PipelineOptions {
    PipelineOptions {
        batch_size: 2,
        max_elements: None,
        dry_run: false,
        show_progress: false,
    }
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_run_inserts_and_records_resource() {
    let mysql = TestMysql::start().await.unwrap();
    let tool = FixedTool::new(vec![
        element("E1", "One"),
        element("E2", "Two"),
        element("E3", "Three"),
        element("E2", "Two again"),
        element("E4", "   "),
    ]);

    let pipeline = ResourcePipeline::new(mysql.db().clone(), options());
    let stats = pipeline.run(&tool).await.unwrap();

    assert_eq!(stats.fetched, 5);
    assert_eq!(stats.inserted, 3);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.blank, 1);
    assert_eq!(stats.total_elements, 3);
    assert_eq!(stats.dictionary_id, 0);

    let row = mysql.db().resources().get("TST").await.unwrap().unwrap();
    assert_eq!(row.total_element, 3);
    assert!(row.last_update_date.is_some());

    let execution = mysql.db().executions().latest("TST").await.unwrap().unwrap();
    assert!(execution.first_execution);
    assert_eq!(execution.nb_element, 3);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_second_run_only_adds_new_elements() {
    let mysql = TestMysql::start().await.unwrap();
    let pipeline = ResourcePipeline::new(mysql.db().clone(), options());

    pipeline
        .run(&FixedTool::new(vec![element("E1", "One"), element("E2", "Two")]))
        .await
        .unwrap();
    let stats = pipeline
        .run(&FixedTool::new(vec![
            element("E1", "One"),
            element("E2", "Two"),
            element("E5", "Five"),
        ]))
        .await
        .unwrap();

    assert_eq!(stats.duplicates, 2);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.total_elements, 3);

    let execution = mysql.db().executions().latest("TST").await.unwrap().unwrap();
    assert!(!execution.first_execution);
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_elements_are_stamped_with_latest_dictionary() {
    let mysql = TestMysql::start().await.unwrap();
    let dictionary_id = mysql.db().obs().add_dictionary("R3").await.unwrap();

    let pipeline = ResourcePipeline::new(mysql.db().clone(), options());
    let stats = pipeline
        .run(&FixedTool::new(vec![element("E1", "One")]))
        .await
        .unwrap();
    assert_eq!(stats.dictionary_id, dictionary_id);

    let stamped: i32 =
        sqlx::query_scalar("SELECT dictionary_id FROM obr_tst_et WHERE local_element_id = 'E1'")
            .fetch_one(mysql.db().pool())
            .await
            .unwrap();
    assert_eq!(stamped, dictionary_id);

    let row = mysql.db().resources().get("TST").await.unwrap().unwrap();
    assert_eq!(row.dictionary_id, Some(dictionary_id));
}

#[tokio::test]
#[ignore]
#[serial]
async fn test_dry_run_writes_nothing() {
    let mysql = TestMysql::start().await.unwrap();
    let pipeline = ResourcePipeline::new(
        mysql.db().clone(),
        PipelineOptions {
            dry_run: true,
            ..options()
        },
    );

    let stats = pipeline
        .run(&FixedTool::new(vec![element("E1", "One"), element("E2", "Two")]))
        .await
        .unwrap();
    assert!(stats.dry_run);
    assert_eq!(stats.inserted, 2);

    let et = mysql.db().element_table(&test_resource("TST")).unwrap();
    assert!(!et.exists().await.unwrap());
    assert!(mysql.db().resources().get("TST").await.unwrap().is_none());
    assert!(mysql.db().executions().latest("TST").await.unwrap().is_none());
}
