#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, Value};

    use crate::database::entity::{post, post_tag, profile, tag, user};
    use crate::database::postgres_base::{PostgresStore, map_db_err};
    use quill_core::error::RepoError;
    use quill_core::ports::Repositories;

    fn tag_model(id: i32, name: &str) -> tag::Model {
        let now = chrono::Utc::now();
        tag::Model {
            id,
            name: name.to_owned(),
            slug: name.to_lowercase(),
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    #[tokio::test]
    async fn test_find_tag_by_id() {
        let now = chrono::Utc::now();

        // Mock the query expectation
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![tag::Model {
                id: 7,
                name: "Rust".to_owned(),
                slug: "rust".to_owned(),
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .into_connection();

        let store = PostgresStore::new(db);

        let result = store.tags().find(7).await.unwrap();

        let tag = result.expect("tag should be found");
        assert_eq!(tag.id, 7);
        assert_eq!(tag.name, "Rust");
    }

    #[tokio::test]
    async fn test_find_missing_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<post::Model>::new()])
            .into_connection();

        let store = PostgresStore::new(db);

        let result = store.posts().find(uuid::Uuid::new_v4()).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_title_taken_counts_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![count_row(1)], vec![count_row(0)]])
            .into_connection();

        let store = PostgresStore::new(db);

        assert!(store.posts().title_taken("Hello", None).await.unwrap());
        assert!(
            !store
                .posts()
                .title_taken("Hello", Some(uuid::Uuid::new_v4()))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_delete_missing_tag_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let store = PostgresStore::new(db);

        let err = store.tags().delete(42).await.unwrap_err();
        assert!(matches!(err, RepoError::NotFound));
    }

    #[test]
    fn test_map_db_err() {
        assert!(matches!(
            map_db_err(DbErr::RecordNotUpdated),
            RepoError::NotFound
        ));
        assert!(matches!(
            map_db_err(DbErr::Custom("boom".into())),
            RepoError::Query(_)
        ));
    }

    #[tokio::test]
    async fn test_find_assembles_owner_and_tags() {
        let now = chrono::Utc::now();
        let owner_id = uuid::Uuid::new_v4();
        let post_id = uuid::Uuid::new_v4();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![post::Model {
                id: post_id,
                user_id: owner_id,
                title: "Hello World".to_owned(),
                slug: "hello-world".to_owned(),
                content: "A body that is comfortably long enough.".to_owned(),
                status: post::Status::Published,
                image_path: None,
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .append_query_results(vec![vec![(
                user::Model {
                    id: owner_id,
                    username: "author1".to_owned(),
                    email: "author1@example.com".to_owned(),
                    password_hash: "hash".to_owned(),
                    role: user::Role::Author,
                    created_at: now.into(),
                    updated_at: now.into(),
                },
                Some(profile::Model {
                    user_id: owner_id,
                    name: "Author One".to_owned(),
                    created_at: now.into(),
                    updated_at: now.into(),
                }),
            )]])
            .append_query_results(vec![vec![
                (
                    post_tag::Model {
                        post_id,
                        tag_id: 1,
                    },
                    Some(tag_model(1, "Rust")),
                ),
                (
                    post_tag::Model {
                        post_id,
                        tag_id: 2,
                    },
                    Some(tag_model(2, "Web")),
                ),
            ]])
            .into_connection();

        let store = PostgresStore::new(db);

        let details = store.posts().find(post_id).await.unwrap().unwrap();
        assert_eq!(details.post.title, "Hello World");
        assert_eq!(details.author.id, owner_id);
        assert_eq!(details.author.name, "Author One");
        let tag_ids: Vec<i32> = details.tags.iter().map(|t| t.id).collect();
        assert_eq!(tag_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_sync_detaches_then_attaches() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                },
            ])
            .into_connection();

        let store = PostgresStore::new(db);
        let post_id = uuid::Uuid::new_v4();

        store
            .posts()
            .sync_associations(post_id, &[3, 4], &[1])
            .await
            .unwrap();

        let log = store.conn.into_transaction_log();
        let statements: Vec<&str> = log
            .iter()
            .flat_map(|txn| txn.statements())
            .map(|stmt| stmt.sql.as_str())
            .collect();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with(r#"DELETE FROM "post_tags""#));
        assert!(statements[1].starts_with(r#"INSERT INTO "post_tags""#));
    }

    #[tokio::test]
    async fn test_empty_sync_sends_nothing() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let store = PostgresStore::new(db);

        store
            .posts()
            .sync_associations(uuid::Uuid::new_v4(), &[], &[])
            .await
            .unwrap();

        assert!(store.conn.into_transaction_log().is_empty());
    }
}
