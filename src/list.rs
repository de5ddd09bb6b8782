//! Source lister: builds the Drive filter expression and runs the single listing call.

use tracing::{error, info};

use crate::config::{ConfigError, NameMatch, SourceConfig};
use crate::contract::{ListQuery, SourceItem, SourceStore, StoreError};

/// Quotes a value as a Drive query string literal.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// `'<folder>' in parents and (<name predicate> or ...)`.
///
/// At least one non-blank name is required; a folder-only query would match every file in it.
pub fn build_filter(
    folder_id: &str,
    names: &[String],
    name_match: NameMatch,
) -> Result<String, ConfigError> {
    let operator = match name_match {
        NameMatch::Exact => "=",
        NameMatch::Contains => "contains",
    };
    let predicates: Vec<String> = names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| format!("name {operator} {}", quote(n)))
        .collect();

    if predicates.is_empty() {
        return Err(ConfigError::Missing("source.file_names"));
    }
    Ok(format!(
        "{} in parents and ({})",
        quote(folder_id),
        predicates.join(" or ")
    ))
}

pub fn build_query(source: &SourceConfig) -> Result<ListQuery, ConfigError> {
    Ok(ListQuery {
        filter: build_filter(&source.folder_id, &source.file_names, source.name_match)?,
        page_size: source.page_size,
        shared_drive_id: source.shared_drive_id.clone(),
    })
}

/// Lists matching items. Never follows further pages; anything past the ceiling is dropped.
pub async fn list_items<S>(source: &S, query: &ListQuery) -> Result<Vec<SourceItem>, StoreError>
where
    S: SourceStore + ?Sized,
{
    info!(
        filter = %query.filter,
        page_size = query.page_size,
        shared_drive = ?query.shared_drive_id,
        "[LIST] Querying source store"
    );

    let mut items = match source.list(query).await {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, "[LIST][ERROR] Listing failed");
            return Err(e);
        }
    };
    items.truncate(query.page_size as usize);

    info!(count = items.len(), "[LIST] Listing returned");
    Ok(items)
}
