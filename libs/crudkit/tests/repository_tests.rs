//! Repository behaviour against an in-memory SQLite database

mod common;

use common::{membership, note, print_test_header, setup_db, tag};
use crudkit::{
    with_transaction, ErrorKind, Filterable, PageParams, RawSql, RepoError, Repository, UpdateMap,
};
use sea_orm::ActiveValue::Set;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

type Notes = Repository<note::Entity, Arc<DatabaseConnection>>;

fn draft(title: &str, owner: &str, score: i32) -> note::ActiveModel {
    note::ActiveModel {
        title: Set(title.to_string()),
        owner: Set(owner.to_string()),
        score: Set(score),
        ..Default::default()
    }
}

async fn seed(repo: &Notes, owner: &str, count: i32) -> Vec<note::Model> {
    let mut saved = Vec::new();
    for i in 0..count {
        saved.push(repo.save(draft(&format!("note {i}"), owner, i)).await.unwrap());
    }
    saved
}

#[tokio::test]
async fn save_assigns_identifier_and_timestamps() {
    print_test_header(
        "save_assigns_identifier_and_timestamps",
        &["Insert with an empty key generates a 26 character id"],
    );
    let repo = Notes::new(setup_db().await);

    let saved = repo.save(draft("hello", "ana", 1)).await.unwrap();
    println!("   saved id: {}", saved.id);

    assert_eq!(saved.id.len(), crudkit::ids::ID_LEN);
    assert_eq!(saved.created_at, saved.updated_at);
    assert!(saved.deleted_at.is_none());

    let fetched = repo.find_by_id(saved.id.clone()).await.unwrap();
    assert_eq!(fetched, saved);
}

#[tokio::test]
async fn save_with_existing_key_updates_row() {
    print_test_header(
        "save_with_existing_key_updates_row",
        &["Saving a loaded model writes its changed columns back"],
    );
    let repo = Notes::new(setup_db().await);
    let saved = repo.save(draft("before", "ana", 1)).await.unwrap();

    let mut am: note::ActiveModel = saved.clone().into();
    am.title = Set("after".to_string());
    let updated = repo.save(am).await.unwrap();

    assert_eq!(updated.id, saved.id);
    assert_eq!(updated.title, "after");
    assert_eq!(updated.created_at, saved.created_at);
    assert!(updated.updated_at >= saved.updated_at);
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
async fn find_by_id_reports_missing_row_as_not_found() {
    print_test_header("find_by_id_reports_missing_row_as_not_found", &[]);
    let repo = Notes::new(setup_db().await);

    let err = repo.find_by_id("01ARZ3NDEKTSV4RRFFQ69G5FAV".to_string()).await.unwrap_err();
    println!("   error: {}", err);
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.context().contains("notes"));
}

#[tokio::test]
async fn find_by_ids_returns_only_existing_rows() {
    print_test_header("find_by_ids_returns_only_existing_rows", &[]);
    let repo = Notes::new(setup_db().await);
    let saved = seed(&repo, "ana", 3).await;

    let found = repo
        .find_by_ids(vec![saved[0].id.clone(), saved[2].id.clone(), "missing".to_string()])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);

    let none = repo.find_by_ids(Vec::<String>::new()).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn find_where_and_find_by_filter_on_columns() {
    print_test_header("find_where_and_find_by_filter_on_columns", &[]);
    let repo = Notes::new(setup_db().await);
    seed(&repo, "ana", 3).await;
    seed(&repo, "ben", 2).await;

    let ana = repo.find_by("owner", "ana").await.unwrap();
    assert_eq!(ana.len(), 3);

    let exact = repo
        .find_where([("owner", "ben"), ("title", "note 1")])
        .await
        .unwrap();
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].score, 1);

    let high = repo
        .find_where_expr(RawSql::new("score >= ?").bind(2))
        .await
        .unwrap();
    assert_eq!(high.len(), 1);

    let first = repo.find_first_by("owner", "ben").await.unwrap();
    assert_eq!(first.owner, "ben");
    let missing = repo.find_first_by("owner", "cleo").await.unwrap_err();
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn soft_delete_hides_rows_from_scoped_reads() {
    print_test_header(
        "soft_delete_hides_rows_from_scoped_reads",
        &[
            "Soft-deleted rows disappear from default reads",
            "and stay visible through an unscoped handle",
        ],
    );
    let repo = Notes::new(setup_db().await);
    let saved = repo.save(draft("gone", "ana", 1)).await.unwrap();

    repo.soft_delete(&saved).await.unwrap();

    let err = repo.find_by_id(saved.id.clone()).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(repo.find_all().await.unwrap().is_empty());

    let raw = repo.unscoped().find_by_id(saved.id.clone()).await.unwrap();
    assert!(raw.deleted_at.is_some());

    let again = repo.soft_delete(&saved).await.unwrap_err();
    assert!(again.is_not_found());
}

#[tokio::test]
async fn soft_delete_with_update_applies_changes_in_one_step() {
    print_test_header("soft_delete_with_update_applies_changes_in_one_step", &[]);
    let repo = Notes::new(setup_db().await);
    let saved = repo.save(draft("gone", "ana", 1)).await.unwrap();

    repo.soft_delete_with_update(&saved, &UpdateMap::new().set("owner", "ben"))
        .await
        .unwrap();

    let raw = repo.unscoped().find_by_id(saved.id.clone()).await.unwrap();
    assert_eq!(raw.owner, "ben");
    assert!(raw.deleted_at.is_some());
}

#[tokio::test]
async fn hard_delete_removes_row_entirely() {
    print_test_header("hard_delete_removes_row_entirely", &[]);
    let repo = Notes::new(setup_db().await);
    let saved = seed(&repo, "ana", 2).await;

    assert_eq!(repo.delete(&saved[0], true).await.unwrap(), 1);
    let err = repo.unscoped().find_by_id(saved[0].id.clone()).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(repo.delete_by_id(saved[1].id.clone(), false).await.unwrap(), 1);
    assert_eq!(repo.unscoped().count().await.unwrap(), 1);
}

#[tokio::test]
async fn bulk_deletes_are_soft_by_default() {
    print_test_header("bulk_deletes_are_soft_by_default", &[]);
    let repo = Notes::new(setup_db().await);
    let saved = seed(&repo, "ana", 4).await;

    let removed = repo
        .delete_many_by_ids(vec![saved[0].id.clone(), saved[1].id.clone()])
        .await
        .unwrap();
    assert_eq!(removed, 2);
    assert_eq!(repo.count().await.unwrap(), 2);
    assert_eq!(repo.unscoped().count().await.unwrap(), 4);

    assert_eq!(repo.delete_many(&saved[2..3]).await.unwrap(), 1);
    assert_eq!(repo.delete_where(RawSql::new("owner = ?").bind("ana")).await.unwrap(), 1);
    assert_eq!(repo.count().await.unwrap(), 0);

    assert_eq!(repo.delete_many_by_ids(Vec::<String>::new()).await.unwrap(), 0);
    assert_eq!(repo.unscoped().delete_all().await.unwrap(), 4);
    assert_eq!(repo.unscoped().count().await.unwrap(), 0);
}

#[tokio::test]
async fn paginate_reports_totals_and_window() {
    print_test_header(
        "paginate_reports_totals_and_window",
        &["25 rows, page 2 of size 10"],
    );
    let repo = Notes::new(setup_db().await);
    seed(&repo, "ana", 25).await;

    let page = repo
        .query()
        .order_asc("score")
        .page(2, 10)
        .paginate()
        .await
        .unwrap();

    println!("   page {} of {}", page.page, page.total_pages);
    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].score, 10);
    assert_eq!(page.total_count, 25);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_next);
    assert!(page.has_prev);
}

#[tokio::test]
async fn paginate_single_page() {
    print_test_header("paginate_single_page", &[]);
    let repo = Notes::new(setup_db().await);
    seed(&repo, "ana", 5).await;

    let page = repo.query().page(1, 20).paginate().await.unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total_pages, 1);
    assert!(!page.has_next);
    assert!(!page.has_prev);
}

#[tokio::test]
async fn upsert_keeps_identity_and_updates_listed_columns() {
    print_test_header(
        "upsert_keeps_identity_and_updates_listed_columns",
        &["A second upsert on (group_id, user_id) changes role only"],
    );
    let db = setup_db().await;
    let repo = Repository::<membership::Entity, _>::new(db);

    let member = |role: &str| membership::ActiveModel {
        group_id: Set("g1".to_string()),
        user_id: Set("u1".to_string()),
        role: Set(role.to_string()),
        ..Default::default()
    };

    let first = repo
        .upsert_only_columns(member("member"), &["group_id", "user_id"], &["role"])
        .await
        .unwrap();
    let second = repo
        .upsert_only_columns(member("admin"), &["group_id", "user_id"], &["role"])
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(second.role, "admin");
    assert_eq!(repo.count().await.unwrap(), 1);

    let err = repo
        .upsert_only_columns(member("owner"), &["group_id", "user_id"], &["nope"])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("failed to upsert entity with specified columns"));
}

#[tokio::test]
async fn updates_validates_keys() {
    print_test_header("updates_validates_keys", &[]);
    let repo = Notes::new(setup_db().await);
    let saved = repo.save(draft("t", "ana", 1)).await.unwrap();

    repo.updates(&saved, &UpdateMap::new().set("score", 42).set("title", "renamed"))
        .await
        .unwrap();
    let fetched = repo.find_by_id(saved.id.clone()).await.unwrap();
    assert_eq!(fetched.score, 42);
    assert_eq!(fetched.title, "renamed");

    let unknown = repo
        .updates(&saved, &UpdateMap::new().set("colour", "red"))
        .await
        .unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::InvalidInput);

    let key = repo
        .updates(&saved, &UpdateMap::new().set("id", "other"))
        .await
        .unwrap_err();
    assert_eq!(key.kind(), ErrorKind::InvalidInput);
}

#[tokio::test]
async fn grouped_conditions_match_expected_rows() {
    print_test_header(
        "grouped_conditions_match_expected_rows",
        &["owner = ana AND (score = 1 OR score = 2)"],
    );
    let repo = Notes::new(setup_db().await);
    seed(&repo, "ana", 4).await;
    seed(&repo, "ben", 4).await;

    let rows = repo
        .query()
        .where_eq("owner", "ana")
        .where_group(|g| g.where_eq("score", 1).or_where_eq("score", 2))
        .all()
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|n| n.owner == "ana"));

    let via_in = repo
        .query()
        .where_eq("owner", "ana")
        .where_in("score", [1, 2])
        .count()
        .await
        .unwrap();
    assert_eq!(via_in, 2);
}

#[tokio::test]
async fn failed_unit_of_work_rolls_back() {
    print_test_header("failed_unit_of_work_rolls_back", &[]);
    let db = setup_db().await;

    let result: Result<(), RepoError> = with_transaction(db.as_ref(), |txn| async move {
        let repo = Repository::<note::Entity, _>::new(txn);
        repo.save(draft("lost", "ana", 1)).await?;
        Err(RepoError::invalid_input("test", "abort"))
    })
    .await;
    assert!(result.is_err());
    assert_eq!(Notes::new(db.clone()).count().await.unwrap(), 0);

    let kept = with_transaction(db.as_ref(), |txn| async move {
        let repo = Repository::<note::Entity, _>::new(txn);
        repo.save(draft("kept", "ana", 1)).await
    })
    .await
    .unwrap();
    assert_eq!(Notes::new(db).find_by_id(kept.id).await.unwrap().title, "kept");
}

#[tokio::test]
async fn unique_violation_on_second_write_rolls_back_the_first() {
    print_test_header(
        "unique_violation_on_second_write_rolls_back_the_first",
        &["A constraint failure mid-transaction leaves nothing committed"],
    );
    let db = setup_db().await;

    let result: Result<(), RepoError> = with_transaction(db.as_ref(), |txn| async move {
        let notes = Repository::<note::Entity, _>::new(txn.clone());
        let members = Repository::<membership::Entity, _>::new(txn);
        let group = notes.save(draft("group", "ana", 1)).await?;
        for role in ["owner", "admin"] {
            members
                .save(membership::ActiveModel {
                    group_id: Set(group.id.clone()),
                    user_id: Set("ana".to_string()),
                    role: Set(role.to_string()),
                    ..Default::default()
                })
                .await?;
        }
        Ok(())
    })
    .await;

    let err = result.unwrap_err();
    println!("   error: {}", err);
    assert_eq!(err.kind(), ErrorKind::Database);
    assert_eq!(Notes::new(db.clone()).unscoped().count().await.unwrap(), 0);
    assert_eq!(
        Repository::<membership::Entity, _>::new(db).unscoped().count().await.unwrap(),
        0
    );
}

#[tokio::test]
async fn leaked_handle_keeps_the_original_error() {
    print_test_header("leaked_handle_keeps_the_original_error", &[]);
    let db = setup_db().await;
    let mut leaked = None;

    let result: Result<(), RepoError> = with_transaction(db.as_ref(), |txn| {
        leaked = Some(txn.clone());
        async move {
            drop(txn);
            Err(RepoError::invalid_input("import notes", "bad row"))
        }
    })
    .await;
    drop(leaked);

    let err = result.unwrap_err();
    assert_eq!(err.context(), "import notes");
    assert!(err.to_string().contains("bad row"));

    let mut leaked = None;
    let result: Result<(), RepoError> = with_transaction(db.as_ref(), |txn| {
        leaked = Some(txn.clone());
        async move {
            drop(txn);
            Ok(())
        }
    })
    .await;
    drop(leaked);
    assert_eq!(result.unwrap_err().context(), "finish transaction");
}

#[tokio::test]
async fn derived_handles_do_not_leak_state() {
    print_test_header(
        "derived_handles_do_not_leak_state",
        &["select/unscoped return new handles and leave the original alone"],
    );
    let repo = Notes::new(setup_db().await);
    let narrowed = repo.select(["title"]);
    let _unscoped = repo.unscoped();

    let narrowed_sql = narrowed.query().to_sql();
    let base_sql = repo.query().to_sql();
    println!("   narrowed: {}", narrowed_sql);
    println!("   base:     {}", base_sql);

    assert!(narrowed_sql.starts_with(r#"SELECT "title" FROM "notes""#));
    assert!(base_sql.starts_with(r#"SELECT "notes".* FROM "notes""#));
    assert!(base_sql.contains(r#""notes"."deleted_at" IS NULL"#));
}

#[tokio::test]
async fn preload_loads_live_children() {
    print_test_header("preload_loads_live_children", &[]);
    let db = setup_db().await;
    let notes = Notes::new(db.clone());
    let tags = Repository::<tag::Entity, _>::new(db);

    let parent = notes.save(draft("tagged", "ana", 1)).await.unwrap();
    let labels = ["red", "blue"];
    let mut saved = Vec::new();
    for label in labels {
        let t = tag::ActiveModel {
            note_id: Set(parent.id.clone()),
            label: Set(label.to_string()),
            ..Default::default()
        };
        saved.push(tags.save(t).await.unwrap());
    }
    tags.soft_delete(&saved[1]).await.unwrap();

    let (loaded, children) = notes
        .preload::<tag::Entity>("id", parent.id.clone())
        .await
        .unwrap();
    assert_eq!(loaded.id, parent.id);
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].label, "red");
}

#[tokio::test]
async fn count_and_exists() {
    print_test_header("count_and_exists", &[]);
    let repo = Notes::new(setup_db().await);
    let saved = seed(&repo, "ana", 3).await;

    assert_eq!(repo.count().await.unwrap(), 3);
    assert!(repo.exists(RawSql::new("owner = ?").bind("ana")).await.unwrap());
    assert!(!repo.exists(RawSql::new("owner = ?").bind("zed")).await.unwrap());
    assert!(repo.exist_by_id(saved[0].id.clone()).await.unwrap());
    assert!(!repo.exist_by_id("missing".to_string()).await.unwrap());
}

#[tokio::test]
async fn raw_predicates_stay_inside_the_soft_delete_scope() {
    print_test_header(
        "raw_predicates_stay_inside_the_soft_delete_scope",
        &["A top-level OR in a raw fragment must not match deleted rows"],
    );
    let repo = Notes::new(setup_db().await);
    let gone = repo.save(draft("gone", "ana", 1)).await.unwrap();
    repo.save(draft("live", "ben", 2)).await.unwrap();
    repo.soft_delete(&gone).await.unwrap();

    let rows = repo
        .find_where_expr(RawSql::new("owner = ? OR owner = ?").bind("ben").bind("ana"))
        .await
        .unwrap();
    let titles: Vec<&str> = rows.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["live"]);

    assert!(!repo
        .exists(RawSql::new("1 = 0 OR owner = ?").bind("ana"))
        .await
        .unwrap());
    assert!(repo
        .unscoped()
        .exists(RawSql::new("1 = 0 OR owner = ?").bind("ana"))
        .await
        .unwrap());
}

#[tokio::test]
async fn huge_page_numbers_return_an_empty_page() {
    print_test_header("huge_page_numbers_return_an_empty_page", &[]);
    let repo = Notes::new(setup_db().await);
    seed(&repo, "ana", 3).await;

    let page = repo
        .query()
        .with_page_params(&PageParams::new(i64::MAX, 100))
        .paginate()
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total_count, 3);
    assert!(!page.has_next);
    assert!(page.has_prev);
}

#[tokio::test]
async fn not_in_an_empty_list_matches_everything() {
    print_test_header("not_in_an_empty_list_matches_everything", &[]);
    let repo = Notes::new(setup_db().await);
    seed(&repo, "ana", 2).await;

    let all = repo
        .query()
        .where_not_in("owner", Vec::<String>::new())
        .all()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let none = repo
        .query()
        .where_in("owner", Vec::<String>::new())
        .count()
        .await
        .unwrap();
    assert_eq!(none, 0);
}

#[tokio::test]
async fn cancelled_token_aborts_calls() {
    print_test_header("cancelled_token_aborts_calls", &[]);
    let repo = Notes::new(setup_db().await);
    let token = CancellationToken::new();
    token.cancel();

    let err = repo.with_cancellation(token).find_all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    assert!(repo.find_all().await.is_ok());
}
