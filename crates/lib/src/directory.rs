//! Persistence collaborator: the tenant-scoped directory of clients, case
//! files and appointments.
//!
//! The pipeline only needs create/find operations keyed by tenant id; row
//! shape and real storage live elsewhere. `MemoryDirectory` is the in-process
//! implementation used by the gateway binary and the tests; it enforces the
//! same uniqueness constraints a backing store would.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::normalize::fold_name;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Uniqueness violation. The message is shown to the user verbatim.
    #[error("{0}")]
    Duplicate(String),
    #[error("error de persistencia: {0}")]
    Backend(String),
}

/// How a case file entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origen {
    #[default]
    Manual,
    Asistente,
}

/// Appointment status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CitaEstado {
    #[default]
    Programada,
    Confirmada,
    Completada,
    Cancelada,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expediente {
    pub id: String,
    pub tenant_id: String,
    pub numero_expediente: String,
    pub client_id: String,
    pub client_name: String,
    pub title: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub origen: Origen,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cita {
    pub id: String,
    pub tenant_id: String,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expediente_id: Option<String>,
    pub titulo: String,
    pub fecha: DateTime<Utc>,
    pub estado: CitaEstado,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone)]
pub struct NewExpediente {
    pub numero_expediente: String,
    pub client_id: String,
    pub client_name: String,
    pub title: String,
    pub status: String,
    pub due_date: Option<String>,
    pub origen: Origen,
}

#[derive(Debug, Clone)]
pub struct NewCita {
    pub client_id: String,
    pub expediente_id: Option<String>,
    pub titulo: String,
    pub fecha: DateTime<Utc>,
    pub estado: CitaEstado,
}

/// Create/find operations the pipeline issues against the store. Every
/// operation is scoped to one tenant id.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn list_clients(&self, tenant_id: &str) -> Result<Vec<Client>, DirectoryError>;
    async fn get_client(
        &self,
        tenant_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, DirectoryError>;
    async fn create_client(
        &self,
        tenant_id: &str,
        new: NewClient,
    ) -> Result<Client, DirectoryError>;
    async fn list_expedientes(&self, tenant_id: &str) -> Result<Vec<Expediente>, DirectoryError>;
    async fn create_expediente(
        &self,
        tenant_id: &str,
        new: NewExpediente,
    ) -> Result<Expediente, DirectoryError>;
    async fn create_cita(&self, tenant_id: &str, new: NewCita) -> Result<Cita, DirectoryError>;
}

/// In-memory directory: tenant id -> entity list. Uniqueness of client email
/// and expediente número is enforced per tenant, matching the store-level
/// constraints the pipeline relies on.
#[derive(Default)]
pub struct MemoryDirectory {
    clients: RwLock<HashMap<String, Vec<Client>>>,
    expedientes: RwLock<HashMap<String, Vec<Expediente>>>,
    citas: RwLock<HashMap<String, Vec<Cita>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn list_clients(&self, tenant_id: &str) -> Result<Vec<Client>, DirectoryError> {
        Ok(self
            .clients
            .read()
            .await
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_client(
        &self,
        tenant_id: &str,
        client_id: &str,
    ) -> Result<Option<Client>, DirectoryError> {
        Ok(self
            .clients
            .read()
            .await
            .get(tenant_id)
            .and_then(|list| list.iter().find(|c| c.id == client_id).cloned()))
    }

    async fn create_client(
        &self,
        tenant_id: &str,
        new: NewClient,
    ) -> Result<Client, DirectoryError> {
        let mut guard = self.clients.write().await;
        let list = guard.entry(tenant_id.to_string()).or_default();
        let wanted = fold_name(&new.email);
        if list.iter().any(|c| fold_name(&c.email) == wanted) {
            return Err(DirectoryError::Duplicate(format!(
                "Ya existe un cliente con el email {}.",
                new.email
            )));
        }
        let client = Client {
            id: format!("cli-{}", uuid::Uuid::new_v4()),
            tenant_id: tenant_id.to_string(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            created_at: Utc::now(),
        };
        list.push(client.clone());
        Ok(client)
    }

    async fn list_expedientes(&self, tenant_id: &str) -> Result<Vec<Expediente>, DirectoryError> {
        Ok(self
            .expedientes
            .read()
            .await
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_expediente(
        &self,
        tenant_id: &str,
        new: NewExpediente,
    ) -> Result<Expediente, DirectoryError> {
        let mut guard = self.expedientes.write().await;
        let list = guard.entry(tenant_id.to_string()).or_default();
        let wanted = new.numero_expediente.trim().to_string();
        if list
            .iter()
            .any(|e| e.numero_expediente.trim().eq_ignore_ascii_case(&wanted))
        {
            return Err(DirectoryError::Duplicate(format!(
                "Ya existe un expediente con el número {}.",
                new.numero_expediente
            )));
        }
        let expediente = Expediente {
            id: format!("exp-{}", uuid::Uuid::new_v4()),
            tenant_id: tenant_id.to_string(),
            numero_expediente: new.numero_expediente,
            client_id: new.client_id,
            client_name: new.client_name,
            title: new.title,
            status: new.status,
            due_date: new.due_date,
            origen: new.origen,
            created_at: Utc::now(),
        };
        list.push(expediente.clone());
        Ok(expediente)
    }

    async fn create_cita(&self, tenant_id: &str, new: NewCita) -> Result<Cita, DirectoryError> {
        let cita = Cita {
            id: format!("cita-{}", uuid::Uuid::new_v4()),
            tenant_id: tenant_id.to_string(),
            client_id: new.client_id,
            expediente_id: new.expediente_id,
            titulo: new.titulo,
            fecha: new.fecha,
            estado: new.estado,
            created_at: Utc::now(),
        };
        self.citas
            .write()
            .await
            .entry(tenant_id.to_string())
            .or_default()
            .push(cita.clone());
        Ok(cita)
    }
}
