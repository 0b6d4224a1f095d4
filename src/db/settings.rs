//! Database queries for the settings singleton (single-row pattern, id=1).

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::{Settings, SettingsUpdate};

const SELECT_SETTINGS: &str = r#"
    SELECT user_name, github_access_token, github_org, github_user, github_api_url,
           gitlab_access_token, gitlab_api_url, gitlab_user,
           jira_api_email, jira_api_key, jira_api_url
    FROM settings WHERE id = 1
"#;

/// Get the current settings, or `None` if they were never written.
pub async fn get_settings(pool: &DbPool) -> Result<Option<Settings>, sqlx::Error> {
    sqlx::query_as::<_, Settings>(SELECT_SETTINGS)
        .fetch_optional(pool)
        .await
}

/// Read one settings field by name.
///
/// Fails when the settings row does not exist or the name is not a
/// settings field.
pub async fn get_field(pool: &DbPool, name: &str) -> Result<Option<String>, AppError> {
    let settings = get_settings(pool)
        .await?
        .ok_or_else(|| AppError::not_found("settings"))?;

    Ok(settings.field(name)?.map(str::to_string))
}

/// Create the settings row if absent, then overwrite only the provided fields.
///
/// Both steps run in one transaction. An update with no fields is rejected
/// before touching the database.
pub async fn upsert_settings(pool: &DbPool, update: &SettingsUpdate) -> Result<Settings, AppError> {
    let fields = update.provided();
    if fields.is_empty() {
        return Err(AppError::invalid_input(
            "No valid fields provided for updating settings",
        ));
    }

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO settings (id) VALUES (1) ON CONFLICT(id) DO NOTHING")
        .execute(&mut *tx)
        .await?;

    // Column names come from SettingsField, never from caller input
    let assignments: Vec<String> = fields
        .iter()
        .map(|(field, _)| format!("{} = ?", field.column()))
        .collect();
    let sql = format!(
        "UPDATE settings SET {}, updated_at = strftime('%s', 'now') WHERE id = 1",
        assignments.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for (_, value) in &fields {
        query = query.bind(*value);
    }
    query.execute(&mut *tx).await?;

    let settings = sqlx::query_as::<_, Settings>(SELECT_SETTINGS)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    log::info!(
        "Updated settings fields: {}",
        fields
            .iter()
            .map(|(field, _)| field.column())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(settings)
}
