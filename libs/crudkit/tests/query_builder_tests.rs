//! SQL generation and execution of the fluent query builder

mod common;

use common::{note, print_test_header, setup_db, tag};
use crudkit::{Filterable, Operator, PageParams, QueryBuilder, RawSql, Repository, Sql};
use sea_orm::ActiveValue::Set;
use sea_orm::{DatabaseConnection, FromQueryResult};
use std::sync::Arc;

type Notes = Repository<note::Entity, Arc<DatabaseConnection>>;

fn sql_of(builder: &QueryBuilder<note::Entity, Arc<DatabaseConnection>>) -> String {
    builder.to_statement().sql
}

async fn seed(repo: &Notes) {
    for (title, owner, score) in [
        ("alpha", "ana", 1),
        ("beta", "ana", 2),
        ("gamma", "ben", 3),
        ("delta", "ben", 4),
        ("omega", "cleo", 5),
    ] {
        let am = note::ActiveModel {
            title: Set(title.to_string()),
            owner: Set(owner.to_string()),
            score: Set(score),
            ..Default::default()
        };
        repo.save(am).await.unwrap();
    }
}

#[tokio::test]
async fn scope_is_anded_with_parenthesized_predicate() {
    print_test_header(
        "scope_is_anded_with_parenthesized_predicate",
        &["OR chains must not escape the soft-delete scope"],
    );
    let repo = Notes::new(setup_db().await);

    let sql = sql_of(&repo.query().where_eq("owner", "ana").or_where_eq("owner", "ben"));
    println!("   {}", sql);
    assert!(sql.contains(
        r#"WHERE "notes"."deleted_at" IS NULL AND ("owner" = ? OR "owner" = ?)"#
    ));

    let single = sql_of(&repo.query().where_eq("owner", "ana"));
    assert!(single.contains(r#"WHERE "notes"."deleted_at" IS NULL AND "owner" = ?"#));

    let unscoped = sql_of(&repo.query().unscoped().where_eq("owner", "ana"));
    assert!(!unscoped.contains("deleted_at"));
}

#[tokio::test]
async fn sort_fields_resolve_against_aliases() {
    print_test_header(
        "sort_fields_resolve_against_aliases",
        &["Bare fields are qualified unless they name a selected alias"],
    );
    let repo = Notes::new(setup_db().await);

    let params = PageParams::new(2, 10).sorted_by("tag_count,title", "desc");
    let builder = repo
        .query()
        .select(["notes.*"])
        .select_as(Sql::count("tags.id"), "tag_count")
        .left_join("tags")
        .on("id", "note_id")
        .group_by(["notes.id"])
        .with_page_params(&params);
    let sql = sql_of(&builder);
    println!("   {}", sql);

    assert!(sql.contains(r#"COUNT("tags"."id") AS "tag_count""#));
    assert!(sql.contains(r#"LEFT JOIN "tags" ON "notes"."id" = "tags"."note_id""#));
    assert!(sql.contains(r#"GROUP BY "notes"."id""#));
    assert!(sql.contains(r#"ORDER BY "tag_count" DESC, "notes"."title" ASC"#));
    assert!(sql.ends_with("LIMIT 10 OFFSET 10"));
}

#[tokio::test]
async fn join_aliases_qualify_both_sides() {
    print_test_header("join_aliases_qualify_both_sides", &[]);
    let repo = Notes::new(setup_db().await);

    let sql = sql_of(
        &repo
            .query()
            .join_as("tags", "t")
            .on_group(|c| {
                c.on("id", Operator::Eq, "note_id")
                    .and("t.label", Operator::Eq, RawSql::new("?").bind("red"))
                    .and_null("deleted_at");
            }),
    );
    println!("   {}", sql);
    assert!(sql.contains(
        r#"INNER JOIN "tags" AS "t" ON "notes"."id" = "t"."note_id" AND "t"."label" = ? AND "t"."deleted_at" IS NULL"#
    ));
}

#[tokio::test]
#[should_panic(expected = "no join to apply condition")]
async fn on_without_join_panics() {
    let repo = Notes::new(setup_db().await);
    let _ = repo.query().on("id", "note_id");
}

#[tokio::test]
async fn count_ignores_order_and_window() {
    print_test_header("count_ignores_order_and_window", &[]);
    let repo = Notes::new(setup_db().await);
    seed(&repo).await;

    let total = repo
        .query()
        .order_desc("score")
        .limit(1)
        .offset(1)
        .count()
        .await
        .unwrap();
    assert_eq!(total, 5);

    let windowed = repo.query().order_asc("score").limit(2).offset(1).all().await.unwrap();
    let scores: Vec<i32> = windowed.iter().map(|n| n.score).collect();
    assert_eq!(scores, vec![2, 3]);

    let tail = repo.query().order_asc("score").offset(3).all().await.unwrap();
    assert_eq!(tail.len(), 2);
}

#[derive(Debug, FromQueryResult)]
struct OwnerTotal {
    owner: String,
    total: i64,
}

#[tokio::test]
async fn grouped_aggregates_decode_into_custom_rows() {
    print_test_header(
        "grouped_aggregates_decode_into_custom_rows",
        &["GROUP BY owner HAVING total > 1"],
    );
    let repo = Notes::new(setup_db().await);
    seed(&repo).await;

    let rows = repo
        .query()
        .select(["owner"])
        .select_as(Sql::count("notes.id"), "total")
        .group_by(["owner"])
        .having_gt("total", 1)
        .order_asc("owner")
        .all_as::<OwnerTotal>()
        .await
        .unwrap();

    let summary: Vec<(String, i64)> = rows.into_iter().map(|r| (r.owner, r.total)).collect();
    println!("   {:?}", summary);
    assert_eq!(summary, vec![("ana".to_string(), 2), ("ben".to_string(), 2)]);

    let groups = repo
        .query()
        .select(["owner"])
        .group_by(["owner"])
        .count()
        .await
        .unwrap();
    assert_eq!(groups, 3);
}

#[tokio::test]
async fn json_rows_carry_selected_columns() {
    print_test_header("json_rows_carry_selected_columns", &[]);
    let repo = Notes::new(setup_db().await);
    seed(&repo).await;

    let first = repo
        .query()
        .select(["title", "score"])
        .where_between("score", 2, 3)
        .order_asc("score")
        .first_json()
        .await
        .unwrap();
    println!("   {}", first);
    assert_eq!(first["title"], "beta");
    assert_eq!(first["score"], 2);

    let page = repo
        .query()
        .select(["title"])
        .where_like("title", "%a")
        .order_asc("title")
        .page(1, 2)
        .paginate_json()
        .await
        .unwrap();
    assert_eq!(page.total_count, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0]["title"], "alpha");
}

#[tokio::test]
async fn join_filters_execute() {
    print_test_header("join_filters_execute", &[]);
    let db = setup_db().await;
    let notes = Notes::new(db.clone());
    let tags = Repository::<tag::Entity, _>::new(db);
    seed(&notes).await;

    let alpha = notes.find_first_by("title", "alpha").await.unwrap();
    for label in ["red", "green"] {
        tags.save(tag::ActiveModel {
            note_id: Set(alpha.id.clone()),
            label: Set(label.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    }

    let tagged = notes
        .query()
        .distinct(["notes.id", "notes.title"])
        .join("tags")
        .on("id", "note_id")
        .where_in("tags.label", ["red", "green"])
        .count()
        .await
        .unwrap();
    assert_eq!(tagged, 1);

    let untagged = notes
        .query()
        .left_join_as("tags", "t")
        .on("id", "note_id")
        .where_null("t.id")
        .count()
        .await
        .unwrap();
    assert_eq!(untagged, 4);
}
