//! createClient: validate contact data and create the client.

use serde_json::{Map, Value};

use super::{prompt_for, ActionPayload, Outcome};
use crate::directive::field;
use crate::directory::{Directory, NewClient};
use crate::validate::{first_missing, RequiredField};

const REQUIRED: &[RequiredField] = &[
    RequiredField { key: "name", label: "el nombre" },
    RequiredField { key: "email", label: "el email" },
    RequiredField { key: "phone", label: "el teléfono" },
];

pub(super) async fn create_client(
    directory: &dyn Directory,
    tenant_id: &str,
    data: &Map<String, Value>,
) -> Outcome {
    let mut data = data.clone();
    // the upstream service sometimes labels the email field "mail"
    if !data.contains_key("email") {
        if let Some(v) = data.remove("mail") {
            data.insert("email".to_string(), v);
        }
    }

    if let Some(label) = first_missing(&data, REQUIRED) {
        return Outcome::MissingField { response: prompt_for(label) };
    }

    let new = NewClient {
        name: field(&data, "name").unwrap_or_default(),
        email: field(&data, "email").unwrap_or_default(),
        phone: field(&data, "phone").unwrap_or_default(),
    };
    match directory.create_client(tenant_id, new).await {
        Ok(client) => Outcome::Dispatched {
            response: "Cliente creado con éxito.".to_string(),
            payload: ActionPayload::Client(client),
        },
        Err(e) => Outcome::DispatchFailed { response: e.to_string() },
    }
}
