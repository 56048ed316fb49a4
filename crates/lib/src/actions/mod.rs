//! Action routing: one pure handler per directive action, selected by the
//! discriminator. Every branch funnels into an `Outcome`; nothing here
//! returns an error to the gateway.

mod agendar_cita;
mod create_client;
mod create_expediente;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::directive::{Action, Directive};
use crate::directory::{Cita, Client, Directory, Expediente};

/// Terminal states of one dispatch. `Dispatched` is the only success;
/// the rest carry the human-readable reason shown to the user.
#[derive(Debug)]
pub enum Outcome {
    Dispatched {
        response: String,
        payload: ActionPayload,
    },
    /// Soft validation failure: a required datum is missing or unusable; the
    /// response prompts the user for it.
    MissingField { response: String },
    EntityNotFound { response: String },
    /// The persistence collaborator rejected the dispatch; its message is
    /// surfaced verbatim.
    DispatchFailed { response: String },
}

/// Entity created by a successful dispatch, tagged by kind in the envelope
/// (`client`, `expediente` or `cita`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPayload {
    Client(Client),
    Expediente(Expediente),
    Cita(Cita),
}

/// The externally visible result of a dispatch (or of a plain chat turn,
/// with no payload).
#[derive(Debug, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ActionPayload>,
}

impl Outcome {
    pub fn into_result(self) -> ActionResult {
        let timestamp = Utc::now();
        match self {
            Outcome::Dispatched { response, payload } => ActionResult {
                success: true,
                response,
                timestamp,
                payload: Some(payload),
            },
            Outcome::MissingField { response }
            | Outcome::EntityNotFound { response }
            | Outcome::DispatchFailed { response } => ActionResult {
                success: false,
                response,
                timestamp,
                payload: None,
            },
        }
    }
}

/// Dispatch a directive to its action handler. All handlers share the same
/// `(directory, tenant_id, data) -> Outcome` shape.
pub async fn route(directory: &dyn Directory, tenant_id: &str, directive: &Directive) -> Outcome {
    match directive.action {
        Action::CreateClient => {
            create_client::create_client(directory, tenant_id, &directive.data).await
        }
        Action::CreateExpediente => {
            create_expediente::create_expediente(directory, tenant_id, &directive.data).await
        }
        Action::AgendarCita => {
            agendar_cita::agendar_cita(directory, tenant_id, &directive.data).await
        }
    }
}

/// Single-field prompt used by all validation failures.
pub(crate) fn prompt_for(label: &str) -> String {
    format!("Me falta {} para completar la operación. ¿Puedes indicarlo?", label)
}
