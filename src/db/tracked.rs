//! Storage for tracked items (pull requests, merge requests, issues).
//!
//! Each provider has its own table keyed by the provider's external
//! identifier. The operations here are generic over [`TrackedItem`] and,
//! apart from [`list_all`], run on a caller-supplied connection so a whole
//! reconciliation pass can share one transaction.

use crate::db::pool::DbPool;
use serde::Serialize;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Decode, Encode, FromRow, Sqlite, SqliteConnection, Type};
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A prepared SQLite statement with its bound arguments.
pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Largest identifier list bound into a single `IN (...)` clause.
const KEY_CHUNK: usize = 500;

/// A row type mirrored from a remote tracker.
pub trait TrackedItem:
    for<'r> FromRow<'r, SqliteRow> + Serialize + Debug + Send + Sync + Unpin + 'static
{
    /// External identifier, unique within the provider's table.
    type Key: Clone
        + Ord
        + Hash
        + Debug
        + Display
        + Send
        + Sync
        + Unpin
        + 'static
        + for<'q> Encode<'q, Sqlite>
        + for<'r> Decode<'r, Sqlite>
        + Type<Sqlite>;

    /// Table holding this provider's items.
    const TABLE: &'static str;

    /// Column holding [`TrackedItem::Key`].
    const KEY_COLUMN: &'static str;

    /// Column list for `SELECT`, in [`FromRow`] order.
    const COLUMNS: &'static str;

    /// The item's external identifier.
    fn key(&self) -> Self::Key;

    /// Whether every remote-sourced field matches `other`.
    ///
    /// Local-only fields (row id, creation time) are ignored.
    fn same_content(&self, other: &Self) -> bool;

    /// `INSERT` for a new row.
    fn insert_query(&self) -> SqliteQuery<'_>;

    /// `UPDATE` of the remote-sourced fields of the row with this key.
    /// Leaves the row id and `created_at` untouched.
    fn update_query(&self) -> SqliteQuery<'_>;
}

/// Read every stored item, most recently updated first.
pub async fn list_all<T: TrackedItem>(pool: &DbPool) -> Result<Vec<T>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM {} ORDER BY updated_at DESC, {}",
        T::COLUMNS,
        T::TABLE,
        T::KEY_COLUMN
    );
    sqlx::query_as::<_, T>(&sql).fetch_all(pool).await
}

/// Read the identifiers of every stored item.
pub async fn local_keys<T: TrackedItem>(
    conn: &mut SqliteConnection,
) -> Result<Vec<T::Key>, sqlx::Error> {
    let sql = format!("SELECT {} FROM {}", T::KEY_COLUMN, T::TABLE);
    sqlx::query_scalar::<_, T::Key>(&sql)
        .fetch_all(&mut *conn)
        .await
}

/// Read the stored items whose identifiers are in `keys`.
pub async fn find_by_keys<T: TrackedItem>(
    conn: &mut SqliteConnection,
    keys: &[T::Key],
) -> Result<Vec<T>, sqlx::Error> {
    let mut found = Vec::with_capacity(keys.len());

    for chunk in keys.chunks(KEY_CHUNK) {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} IN ({})",
            T::COLUMNS,
            T::TABLE,
            T::KEY_COLUMN,
            placeholders(chunk.len())
        );

        let mut query = sqlx::query_as::<_, T>(&sql);
        for key in chunk {
            query = query.bind(key.clone());
        }
        found.extend(query.fetch_all(&mut *conn).await?);
    }

    Ok(found)
}

/// Insert a new item.
pub async fn insert<T: TrackedItem>(
    conn: &mut SqliteConnection,
    item: &T,
) -> Result<(), sqlx::Error> {
    item.insert_query().execute(&mut *conn).await?;
    Ok(())
}

/// Overwrite the remote-sourced fields of an existing item.
pub async fn update<T: TrackedItem>(
    conn: &mut SqliteConnection,
    item: &T,
) -> Result<(), sqlx::Error> {
    item.update_query().execute(&mut *conn).await?;
    Ok(())
}

/// Delete the items whose identifiers are in `keys`.
///
/// Returns the number of rows removed.
pub async fn delete_by_keys<T: TrackedItem>(
    conn: &mut SqliteConnection,
    keys: &[T::Key],
) -> Result<u64, sqlx::Error> {
    let mut deleted = 0;

    for chunk in keys.chunks(KEY_CHUNK) {
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            T::TABLE,
            T::KEY_COLUMN,
            placeholders(chunk.len())
        );

        let mut query = sqlx::query(&sql);
        for key in chunk {
            query = query.bind(key.clone());
        }
        deleted += query.execute(&mut *conn).await?.rows_affected();
    }

    Ok(deleted)
}

/// `?, ?, ?` with `count` placeholders.
fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
