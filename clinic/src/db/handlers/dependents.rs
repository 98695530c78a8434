//! Generic repository for rows that hang off a user account (patients and doctors).
//!
//! Both tables share the same shape: a UUID primary key, a unique `user_id` referencing
//! `users(id)` with `ON DELETE CASCADE`, and a handful of kind-specific columns. Instead of
//! two copies of the same queries, a single [`Dependents`] repository is parameterized by a
//! [`DependentKind`] which supplies the metadata: table name, selected columns, the role a
//! user must hold to own such a row, and how to bind create/update payloads.

use std::fmt::Debug;
use std::marker::PhantomData;

use sqlx::{
    FromRow, PgConnection, Postgres,
    postgres::{PgArguments, PgRow},
    query::QueryAs,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    api::models::users::Role,
    db::{
        errors::{DbError, Result},
        handlers::repository::Repository,
    },
    types::{Resource, UserId, abbrev_uuid},
};

/// Query builder type handed to [`DependentKind`] bind hooks.
pub type RowQuery<'q, R> = QueryAs<'q, Postgres, R, PgArguments>;

/// Metadata describing one kind of user-dependent record.
pub trait DependentKind: Send + Sync + 'static {
    /// Table the rows live in
    const TABLE: &'static str;
    /// Column list selected and returned for a row, in [`DependentKind::Row`] field order
    const COLUMNS: &'static str;
    /// Kind-specific columns written on insert (bound from `$3` onwards)
    const INSERT_COLUMNS: &'static str;
    /// Placeholders matching [`DependentKind::INSERT_COLUMNS`]
    const INSERT_VALUES: &'static str;
    /// `SET` clause for updates; the row id is always `$1`
    const UPDATE_ASSIGNMENTS: &'static str;
    /// Role the owning user account must carry
    const OWNER_ROLE: Role;
    /// Resource used for capability checks
    const RESOURCE: Resource;
    /// Human-readable singular name ("Patient")
    const LABEL: &'static str;

    /// Kind-specific fields for a new row
    type Fields: Debug + Send + Sync;
    /// Mutable kind-specific fields
    type Changes: Debug + Send + Sync;
    /// Row as read from the table
    type Row: for<'r> FromRow<'r, PgRow> + Debug + Clone + Send + Sync + Unpin;

    /// Bind [`DependentKind::Fields`] in the order of [`DependentKind::INSERT_COLUMNS`].
    fn bind_fields<'q>(query: RowQuery<'q, Self::Row>, fields: &Self::Fields) -> RowQuery<'q, Self::Row>;

    /// Bind [`DependentKind::Changes`] in the order used by [`DependentKind::UPDATE_ASSIGNMENTS`].
    fn bind_changes<'q>(query: RowQuery<'q, Self::Row>, changes: &Self::Changes) -> RowQuery<'q, Self::Row>;

    fn row_id(row: &Self::Row) -> Uuid;

    fn row_user_id(row: &Self::Row) -> UserId;
}

/// Database request for creating a dependent row bound to an existing user
#[derive(Debug, Clone)]
pub struct DependentCreateDBRequest<F> {
    pub user_id: UserId,
    pub fields: F,
}

pub struct Dependents<'c, K: DependentKind> {
    db: &'c mut PgConnection,
    _kind: PhantomData<K>,
}

#[async_trait::async_trait]
impl<'c, K: DependentKind> Repository for Dependents<'c, K> {
    type CreateRequest = DependentCreateDBRequest<K::Fields>;
    type UpdateRequest = K::Changes;
    type Response = K::Row;
    type Id = Uuid;

    #[instrument(skip(self, request), fields(table = K::TABLE, user_id = %abbrev_uuid(&request.user_id)), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let sql = format!(
            "INSERT INTO {} (id, user_id, {}) VALUES ($1, $2, {}) RETURNING {}",
            K::TABLE,
            K::INSERT_COLUMNS,
            K::INSERT_VALUES,
            K::COLUMNS
        );
        let query = sqlx::query_as::<_, K::Row>(&sql).bind(Uuid::new_v4()).bind(request.user_id);

        let row = K::bind_fields(query, &request.fields).fetch_one(&mut *self.db).await?;
        Ok(row)
    }

    #[instrument(skip(self), fields(table = K::TABLE, id = %abbrev_uuid(&id)), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", K::COLUMNS, K::TABLE);
        let row = sqlx::query_as::<_, K::Row>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row)
    }

    #[instrument(skip(self), fields(table = K::TABLE), err)]
    async fn list(&mut self) -> Result<Vec<Self::Response>> {
        let sql = format!("SELECT {} FROM {}", K::COLUMNS, K::TABLE);
        let rows = sqlx::query_as::<_, K::Row>(&sql).fetch_all(&mut *self.db).await?;

        Ok(rows)
    }

    #[instrument(skip(self), fields(table = K::TABLE, id = %abbrev_uuid(&id)), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", K::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&mut *self.db).await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(table = K::TABLE, id = %abbrev_uuid(&id)), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        let sql = format!(
            "UPDATE {} SET {} WHERE id = $1 RETURNING {}",
            K::TABLE,
            K::UPDATE_ASSIGNMENTS,
            K::COLUMNS
        );
        let query = sqlx::query_as::<_, K::Row>(&sql).bind(id);

        K::bind_changes(query, request)
            .fetch_optional(&mut *self.db)
            .await?
            .ok_or(DbError::NotFound)
    }
}

impl<'c, K: DependentKind> Dependents<'c, K> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db, _kind: PhantomData }
    }

    /// Find the row owned by a user account, if any.
    #[instrument(skip(self), fields(table = K::TABLE, user_id = %abbrev_uuid(&user_id)), err)]
    pub async fn get_by_user_id(&mut self, user_id: UserId) -> Result<Option<K::Row>> {
        let sql = format!("SELECT {} FROM {} WHERE user_id = $1", K::COLUMNS, K::TABLE);
        let row = sqlx::query_as::<_, K::Row>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(row)
    }

    /// Cheap existence check used before linking rows together.
    #[instrument(skip(self), fields(table = K::TABLE, id = %abbrev_uuid(&id)), err)]
    pub async fn exists(&mut self, id: Uuid) -> Result<bool> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", K::TABLE);
        let exists: bool = sqlx::query_scalar(&sql).bind(id).fetch_one(&mut *self.db).await?;

        Ok(exists)
    }
}
