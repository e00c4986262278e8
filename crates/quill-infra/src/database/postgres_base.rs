use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseTransaction, DbConn, DbErr, SqlErr, TransactionTrait};

use quill_core::error::RepoError;
use quill_core::ports::{PostStore, Repositories, Store, TagStore, Transaction, UserStore};

/// SeaORM-backed store, generic over the connection its queries run on.
///
/// Over a pool it is the [`Store`]; over a `DatabaseTransaction` it is a
/// [`Transaction`]. SeaORM rolls a `DatabaseTransaction` back when it is
/// dropped uncommitted.
pub struct SeaOrmStore<C> {
    pub(crate) conn: C,
}

/// PostgreSQL store backed by the connection pool.
pub type PostgresStore = SeaOrmStore<DbConn>;

/// An open PostgreSQL transaction.
pub type PostgresTransaction = SeaOrmStore<DatabaseTransaction>;

impl<C> SeaOrmStore<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

impl<C> Repositories for SeaOrmStore<C>
where
    C: ConnectionTrait + Send + Sync,
{
    fn posts(&self) -> &dyn PostStore {
        self
    }

    fn tags(&self) -> &dyn TagStore {
        self
    }

    fn users(&self) -> &dyn UserStore {
        self
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, RepoError> {
        let txn = self.conn.begin().await.map_err(map_db_err)?;
        Ok(Box::new(SeaOrmStore::new(txn)))
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        let SeaOrmStore { conn } = *self;
        conn.commit().await.map_err(map_db_err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        let SeaOrmStore { conn } = *self;
        conn.rollback().await.map_err(map_db_err)
    }
}

/// Translate SeaORM errors, keeping constraint violations distinguishable.
pub(crate) fn map_db_err(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => return RepoError::Duplicate(msg),
        Some(SqlErr::ForeignKeyConstraintViolation(msg)) => {
            return RepoError::MissingReference(msg);
        }
        _ => {}
    }

    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => RepoError::Connection(err.to_string()),
        DbErr::RecordNotFound(_) | DbErr::RecordNotUpdated => RepoError::NotFound,
        other => RepoError::Query(other.to_string()),
    }
}
