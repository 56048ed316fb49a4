//! createExpediente: remap the upstream vocabulary, resolve the owning
//! client, and create the case file under the client's canonical name.

use serde_json::{Map, Value};

use super::{prompt_for, ActionPayload, Outcome};
use crate::directive::field;
use crate::directory::{Directory, NewExpediente, Origen};
use crate::resolve::resolve_client_by_name;
use crate::validate::{first_missing, RequiredField};

/// Upstream field name -> internal field name.
const FIELD_MAP: &[(&str, &str)] = &[
    ("numero", "numeroExpediente"),
    ("cliente", "clientName"),
    ("titulo", "title"),
    ("estado", "status"),
    ("fechaLimite", "dueDate"),
];

const REQUIRED: &[RequiredField] = &[
    RequiredField { key: "numeroExpediente", label: "el número de expediente" },
    RequiredField { key: "clientName", label: "el nombre del cliente" },
    RequiredField { key: "title", label: "el título del expediente" },
];

const DEFAULT_STATUS: &str = "abierto";

pub(super) async fn create_expediente(
    directory: &dyn Directory,
    tenant_id: &str,
    data: &Map<String, Value>,
) -> Outcome {
    let data = remap_keys(data);

    if let Some(label) = first_missing(&data, REQUIRED) {
        return Outcome::MissingField { response: prompt_for(label) };
    }

    let client_name = field(&data, "clientName").unwrap_or_default();
    let client = match resolve_client_by_name(directory, tenant_id, &client_name).await {
        Ok(Some(client)) => client,
        Ok(None) => {
            return Outcome::EntityNotFound {
                response: format!(
                    "No se encontró el cliente \"{}\" en el despacho. Verifica el nombre e inténtalo de nuevo.",
                    client_name
                ),
            }
        }
        Err(e) => return Outcome::DispatchFailed { response: e.to_string() },
    };

    let new = NewExpediente {
        numero_expediente: field(&data, "numeroExpediente").unwrap_or_default(),
        client_id: client.id.clone(),
        // canonical directory name, not the (possibly imprecise) input spelling
        client_name: client.name.clone(),
        title: field(&data, "title").unwrap_or_default(),
        status: field(&data, "status").unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        due_date: field(&data, "dueDate"),
        origen: Origen::Asistente,
    };
    match directory.create_expediente(tenant_id, new).await {
        Ok(expediente) => Outcome::Dispatched {
            response: "Expediente creado con éxito.".to_string(),
            payload: ActionPayload::Expediente(expediente),
        },
        Err(e) => Outcome::DispatchFailed { response: e.to_string() },
    }
}

/// Apply FIELD_MAP without clobbering fields already in internal vocabulary.
fn remap_keys(data: &Map<String, Value>) -> Map<String, Value> {
    let mut out = data.clone();
    for (from, to) in FIELD_MAP {
        if !out.contains_key(*to) {
            if let Some(v) = out.remove(*from) {
                out.insert((*to).to_string(), v);
            }
        }
    }
    out
}
