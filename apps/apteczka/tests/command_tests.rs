//! Command layer against an in-memory store.

use apteczka::commands::{inventory, package, product, settings, tags};
use apteczka::state::{OperationKind, OperationOutcome, OperationStatus};
use apteczka::{AppConfig, AppState, ErrorCode};
use apteczka_core::{InventoryQuery, RegistryRecord};

async fn open_state(export_dir: &std::path::Path) -> AppState {
    AppState::open(AppConfig::in_memory(export_dir)).await.unwrap()
}

fn registry_row(name: &str, packaging: &str) -> RegistryRecord {
    RegistryRecord {
        product_name: name.to_string(),
        common_name: "Paracetamolum".to_string(),
        kind: "ludzki".to_string(),
        strength: Some("500 mg".to_string()),
        packaging: Some(packaging.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn package_form_inherits_then_edits_its_own_tags() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path()).await;

    let fever = tags::add_tag(&state, "fever").await.unwrap();
    let kids = tags::add_tag(&state, "kids").await.unwrap();
    let travel = tags::add_tag(&state, "travel").await.unwrap();

    let apap = product::add_product(
        &state,
        product::ProductForm {
            name: "  Apap  ".into(),
            description: Some("Paracetamolum 500 mg".into()),
            tag_ids: vec![fever.uuid.clone(), kids.uuid.clone()],
        },
    )
    .await
    .unwrap();
    assert_eq!(apap.name, "Apap");

    // New package: user picks a tag first, then the product
    let mut draft = package::PackageDraft::new();
    draft.add_tag(travel.clone());
    package::select_product(&state, &mut draft, &apap.uuid)
        .await
        .unwrap();
    assert_eq!(draft.tags.len(), 3);

    draft.quantity = "20".into();
    draft.expiration_date = "2027-03".into();
    let uuid = package::save_package(&state, &draft).await.unwrap();

    let items = inventory::list_inventory(&state, InventoryQuery::default())
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].package_uuid, uuid);
    assert_eq!(items[0].quantity, Some(20));
    assert_eq!(items[0].expiration_date.as_deref(), Some("2027-03"));

    // Edit: drop a tag, clear the quantity
    let mut edit = package::load_package(&state, &uuid).await.unwrap();
    assert!(edit.is_edit());
    assert_eq!(edit.quantity, "20");
    edit.remove_tag(&kids.uuid);
    edit.quantity = String::new();
    package::save_package(&state, &edit).await.unwrap();

    let reloaded = package::load_package(&state, &uuid).await.unwrap();
    assert_eq!(reloaded.quantity, "");
    let mut names: Vec<String> = reloaded.tags.into_iter().map(|t| t.name).collect();
    names.sort();
    assert_eq!(names, vec!["fever", "travel"]);

    // The product keeps both of its tags
    let product_tags = state.db().tags().tags_for_product(&apap.uuid).await.unwrap();
    assert_eq!(product_tags.len(), 2);
}

#[tokio::test]
async fn invalid_package_form_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path()).await;

    let draft = package::PackageDraft::new();
    let err = package::save_package(&state, &draft).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    let apap = product::add_product(
        &state,
        product::ProductForm {
            name: "Apap".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let mut draft = package::PackageDraft::new();
    package::select_product(&state, &mut draft, &apap.uuid)
        .await
        .unwrap();

    draft.quantity = "a lot".into();
    let err = package::save_package(&state, &draft).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    draft.quantity = "5".into();
    draft.expiration_date = "2027-13-01".into();
    let err = package::save_package(&state, &draft).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    assert_eq!(state.db().inventory().count_packages().await.unwrap(), 0);
}

#[tokio::test]
async fn blank_product_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path()).await;

    let err = product::add_product(
        &state,
        product::ProductForm {
            name: "   ".into(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(state.db().medications().count().await.unwrap(), 0);
}

#[tokio::test]
async fn barcode_lookup_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path()).await;
    let meds = state.db().medications();

    meds.import_medicine(&registry_row("Apap", "12 tabl. ¦ 5909990000011 ¦ OTC"), "¦")
        .await
        .unwrap();
    meds.import_medicine(&registry_row("Codipar", "10 tabl. ¦ 5901110000022 ¦ OTC"), "¦")
        .await
        .unwrap();
    meds.import_medicine(&registry_row("Efferalgan", "16 tabl. ¦ 5902220000022 ¦ OTC"), "¦")
        .await
        .unwrap();

    match product::lookup_barcode(&state, " 5909990000011 ").await.unwrap() {
        product::BarcodeLookup::Found { product } => assert_eq!(product.name, "Apap"),
        other => panic!("expected Found, got {:?}", other),
    }

    // Scanner dropped the leading digits
    assert!(matches!(
        product::lookup_barcode(&state, "90000011").await.unwrap(),
        product::BarcodeLookup::Found { .. }
    ));

    assert_eq!(
        product::lookup_barcode(&state, "4000000000000").await.unwrap(),
        product::BarcodeLookup::NotFound {
            barcode: "4000000000000".into()
        }
    );

    assert_eq!(
        product::lookup_barcode(&state, "0000022").await.unwrap(),
        product::BarcodeLookup::MultipleMatches {
            barcode: "0000022".into(),
            count: 2
        }
    );

    let err = product::lookup_barcode(&state, "59O9").await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[tokio::test]
async fn tag_commands_dedupe_and_report_collisions() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path()).await;

    let first = tags::add_tag(&state, "Allergy").await.unwrap();
    let again = tags::add_tag(&state, "  allergy ").await.unwrap();
    assert_eq!(first, again);
    assert_eq!(again.name, "Allergy");

    let other = tags::add_tag(&state, "Cold").await.unwrap();
    let err = tags::rename_tag(&state, &other.uuid, "Allergy")
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    let found = tags::search_tags(&state, "ERG", None).await.unwrap();
    assert_eq!(found, vec![first.clone()]);

    tags::delete_tag(&state, &first.uuid).await.unwrap();
    let err = tags::delete_tag(&state, &first.uuid).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
    assert_eq!(tags::list_tags(&state).await.unwrap(), vec![other]);
}

#[tokio::test]
async fn export_wipe_import_restores_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(&dir.path().join("exports")).await;

    let fever = tags::add_tag(&state, "fever").await.unwrap();
    let apap = product::add_product(
        &state,
        product::ProductForm {
            name: "Apap".into(),
            description: None,
            tag_ids: vec![fever.uuid.clone()],
        },
    )
    .await
    .unwrap();
    let mut draft = package::PackageDraft::new();
    package::select_product(&state, &mut draft, &apap.uuid)
        .await
        .unwrap();
    draft.quantity = "8".into();
    package::save_package(&state, &draft).await.unwrap();

    let exported = settings::export_data(&state).await.unwrap();
    assert!(exported.path.starts_with(dir.path().join("exports")));
    assert!(matches!(
        settings::operation_status(&state),
        OperationStatus::Finished {
            kind: OperationKind::Export,
            outcome: OperationOutcome::Success,
            ..
        }
    ));
    settings::dismiss_operation(&state).unwrap();

    settings::wipe_data(&state).await.unwrap();
    assert_eq!(state.db().medications().count().await.unwrap(), 0);
    assert!(tags::list_tags(&state).await.unwrap().is_empty());

    let imported = settings::import_data(&state, &exported.path).await.unwrap();
    assert!(imported.total_rows() >= 4);

    let items = inventory::list_inventory(
        &state,
        InventoryQuery {
            tag_ids: vec![fever.uuid.clone()],
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Apap");
    assert_eq!(items[0].quantity, Some(8));
}

#[tokio::test]
async fn second_operation_is_rejected_while_one_runs() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path()).await;

    let _signal = state
        .operation()
        .begin(OperationKind::Import, "Importing")
        .unwrap();

    let err = settings::wipe_data(&state).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::OperationInProgress);

    // The running operation is untouched and can still be cancelled
    assert!(settings::operation_status(&state).is_running());
    settings::cancel_operation(&state).unwrap();
}

#[tokio::test]
async fn failed_import_is_recorded_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let state = open_state(dir.path()).await;

    let err = settings::import_data(&state, dir.path().join("missing.xlsx"))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TransferError);

    assert!(matches!(
        settings::operation_status(&state),
        OperationStatus::Finished {
            kind: OperationKind::Import,
            outcome: OperationOutcome::Error,
            ..
        }
    ));

    // No operation running any more
    assert_eq!(
        settings::cancel_operation(&state).unwrap_err().code,
        ErrorCode::ValidationError
    );
}
