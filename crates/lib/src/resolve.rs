//! Tenant-scoped entity resolution.
//!
//! Every lookup folds both sides through the shared normalizer and returns
//! the first exact match: deterministic, at most one candidate, never
//! cross-tenant. There is no ranking or partial-match scoring.

use crate::directory::{Client, Directory, DirectoryError, Expediente};
use crate::normalize::fold_name;

/// Find the tenant's client whose display name matches `name` after
/// normalization.
pub async fn resolve_client_by_name(
    directory: &dyn Directory,
    tenant_id: &str,
    name: &str,
) -> Result<Option<Client>, DirectoryError> {
    let wanted = fold_name(name);
    if wanted.is_empty() {
        return Ok(None);
    }
    let clients = directory.list_clients(tenant_id).await?;
    Ok(clients.into_iter().find(|c| fold_name(&c.name) == wanted))
}

/// Find the tenant's case file whose title matches `title` after
/// normalization.
pub async fn resolve_expediente_by_title(
    directory: &dyn Directory,
    tenant_id: &str,
    title: &str,
) -> Result<Option<Expediente>, DirectoryError> {
    let wanted = fold_name(title);
    if wanted.is_empty() {
        return Ok(None);
    }
    let expedientes = directory.list_expedientes(tenant_id).await?;
    Ok(expedientes
        .into_iter()
        .find(|e| fold_name(&e.title) == wanted))
}

/// Find the tenant's case file by its exact identifier (trimmed,
/// case-insensitive). Identifiers are not fuzzy-matched.
pub async fn resolve_expediente_by_numero(
    directory: &dyn Directory,
    tenant_id: &str,
    numero: &str,
) -> Result<Option<Expediente>, DirectoryError> {
    let wanted = numero.trim();
    if wanted.is_empty() {
        return Ok(None);
    }
    let expedientes = directory.list_expedientes(tenant_id).await?;
    Ok(expedientes
        .into_iter()
        .find(|e| e.numero_expediente.trim().eq_ignore_ascii_case(wanted)))
}
