//! Workbook and registry transfers against in-memory stores.

use apteczka_db::{Database, DbConfig, TABLES_EXPORT_ORDER};
use apteczka_transfer::workbook::write_workbook;
use apteczka_transfer::{
    abort_pair, export_workbook, import_workbook, ingest_feed, ingest_records, parse_feed,
    AbortSignal, FeedStatus, RegistryConfig, TransferError,
};

async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

async fn populated_db() -> Database {
    let db = memory_db().await;
    let fever = db.tags().add_tag("fever").await.unwrap();
    let kids = db.tags().add_tag("kids").await.unwrap();

    let apap = db
        .medications()
        .add_medication_metadata("Apap", Some("Paracetamolum 500 mg"), &[fever.clone()])
        .await
        .unwrap();
    let nurofen = db
        .medications()
        .add_medication_metadata("Nurofen", None, &[kids.clone()])
        .await
        .unwrap();

    db.packages()
        .add_medication_package(&apap, Some(24), Some("2027-04-30"), &[])
        .await
        .unwrap();
    db.packages()
        .add_medication_package(&nurofen, None, Some("2026-11"), &[fever, kids])
        .await
        .unwrap();

    db
}

const FEED: &str = "\
Identyfikator Produktu Leczniczego;Nazwa Produktu Leczniczego;Nazwa powszechnie stosowana;Rodzaj preparatu;Moc;Opakowanie
1;Apap;Paracetamolum;ludzki;500 mg;12 tabl. ¦ 5909990000001 ¦ OTC
2;Metacam;Meloxicamum;weterynaryjny;1,5 mg/ml;1 butelka ¦ 5909990000002 ¦ Rp
3;Bezimienny;;ludzki;1 mg;
4;Apap;Paracetamolum;LUDZKI;1 g;24 tabl. ¦ 5909990000003 ¦ OTC
";

#[tokio::test]
async fn workbook_round_trip_reproduces_every_row() {
    let source = populated_db().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backup.xlsx");

    let exported = export_workbook(&source, &path).await.unwrap();
    assert_eq!(exported.tables.len(), TABLES_EXPORT_ORDER.len());

    let target = memory_db().await;
    let imported = import_workbook(&target, &path).await.unwrap();
    assert_eq!(imported.total_rows(), exported.tables.iter().map(|t| t.rows).sum::<usize>());

    for table in TABLES_EXPORT_ORDER {
        let before = source.bulk().dump_table(table).await.unwrap();
        let after = target.bulk().dump_table(table).await.unwrap();
        assert_eq!(before, after, "table {} differs after round trip", table);
    }
}

#[tokio::test]
async fn import_without_required_sheets_leaves_store_untouched() {
    let db = populated_db().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags-only.xlsx");

    let tags = db.bulk().dump_table("tags").await.unwrap();
    write_workbook(&path, &[tags]).unwrap();

    match import_workbook(&db, &path).await {
        Err(TransferError::MissingSheets(sheets)) => {
            assert_eq!(sheets, vec!["meds", "meds_metadata"]);
        }
        other => panic!("expected MissingSheets, got {:?}", other),
    }

    assert_eq!(db.medications().count().await.unwrap(), 2);
    assert_eq!(db.inventory().count_packages().await.unwrap(), 2);
}

#[tokio::test]
async fn registry_rows_are_filtered_and_merged() {
    let db = memory_db().await;
    let config = RegistryConfig::default();
    let records = parse_feed(FEED).unwrap();

    let mut updates = Vec::new();
    let report = ingest_records(&db, &records, &config, &AbortSignal::never(), |p| {
        updates.push(p)
    })
    .await
    .unwrap();

    assert_eq!(report.status, FeedStatus::Completed);
    assert_eq!(report.rows_seen, 4);
    assert_eq!(report.ingested, 2);
    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(updates.last().map(|p| (p.processed, p.total)), Some((4, 4)));

    let apap = db
        .medications()
        .search_by_name("Apap", 10)
        .await
        .unwrap()
        .pop()
        .unwrap();
    assert_eq!(
        apap.description.as_deref(),
        Some("Paracetamolum 500 mg\nParacetamolum 1 g")
    );
    assert_eq!(
        db.medications().barcodes(&apap.uuid).await.unwrap(),
        vec!["5909990000003"]
    );

    // Same feed again: nothing new, description unchanged
    let again = ingest_records(&db, &records, &config, &AbortSignal::never(), |_| {})
        .await
        .unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(db.medications().count().await.unwrap(), 1);
    let apap_again = db.medications().get_by_id(&apap.uuid).await.unwrap().unwrap();
    assert_eq!(apap_again.description, apap.description);
}

#[tokio::test]
async fn aborted_ingestion_reports_cancelled() {
    let db = memory_db().await;
    let config = RegistryConfig::default();
    let records = parse_feed(FEED).unwrap();

    let (handle, signal) = abort_pair();
    handle.abort();

    let report = ingest_records(&db, &records, &config, &signal, |_| {})
        .await
        .unwrap();
    assert_eq!(report.status, FeedStatus::Cancelled);
    assert_eq!(report.rows_seen, 0);
    assert_eq!(db.medications().count().await.unwrap(), 0);
}

#[tokio::test]
async fn abort_mid_feed_keeps_rows_already_ingested() {
    let db = memory_db().await;
    let config = RegistryConfig::default();

    let mut feed = FEED.lines().next().unwrap().to_string();
    for i in 0..600 {
        feed.push_str(&format!("\n{};Lek {:03};Substancja {};ludzki;{} mg;", i, i, i, i));
    }
    let records = parse_feed(&feed).unwrap();
    assert_eq!(records.len(), 600);

    // Cancel at the first progress report, after 250 rows
    let (handle, signal) = abort_pair();
    let mut reports = Vec::new();
    let report = ingest_records(&db, &records, &config, &signal, |p| {
        reports.push(p.processed);
        handle.abort();
    })
    .await
    .unwrap();

    assert_eq!(report.status, FeedStatus::Cancelled);
    assert_eq!(reports, vec![250]);
    assert_eq!(report.rows_seen, 250);
    assert_eq!(report.ingested, 250);
    assert_eq!(db.medications().count().await.unwrap(), 250);

    let medications = db.medications();
    assert_eq!(medications.search_by_name("Lek 249", 10).await.unwrap().len(), 1);
    assert!(medications.search_by_name("Lek 250", 10).await.unwrap().is_empty());
    assert!(medications.search_by_name("Lek 599", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn aborted_download_never_reaches_the_store() {
    let db = memory_db().await;
    let config = RegistryConfig {
        url: "http://127.0.0.1:9/registry.csv".to_string(),
        ..Default::default()
    };

    let (handle, signal) = abort_pair();
    handle.abort();

    let report = ingest_feed(&db, &config, signal, |_| {}).await.unwrap();
    assert_eq!(report.status, FeedStatus::Cancelled);
    assert_eq!(report.rows_seen, 0);
}
