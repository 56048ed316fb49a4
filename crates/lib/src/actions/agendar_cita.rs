//! agendarCita: resolve the subject (case file by identifier, or client by
//! name; exactly one path is taken), combine date and time, and create the
//! appointment.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::{prompt_for, ActionPayload, Outcome};
use crate::directive::field;
use crate::directory::{CitaEstado, Directory, NewCita};
use crate::normalize::fold_name;
use crate::resolve::{resolve_client_by_name, resolve_expediente_by_numero};

/// Upstream status vocabulary -> internal status, compared on the folded
/// form. Unmapped values fall back to the default (programada).
const ESTADOS: &[(&str, CitaEstado)] = &[
    ("programada", CitaEstado::Programada),
    ("confirmada", CitaEstado::Confirmada),
    ("completada", CitaEstado::Completada),
    ("cancelada", CitaEstado::Cancelada),
];

const FECHA_HORA_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%d/%m/%Y %H:%M"];
const FECHA_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];
const DIA_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

const DEFAULT_TITULO: &str = "Cita";

pub(super) async fn agendar_cita(
    directory: &dyn Directory,
    tenant_id: &str,
    data: &Map<String, Value>,
) -> Outcome {
    // two mutually exclusive resolution paths: case identifier wins over name
    let (client, expediente) = if let Some(numero) = field(data, "caseId") {
        let expediente = match resolve_expediente_by_numero(directory, tenant_id, &numero).await {
            Ok(Some(e)) => e,
            Ok(None) => {
                return Outcome::EntityNotFound {
                    response: format!(
                        "No se encontró el expediente \"{}\" en el despacho. Verifica el número e inténtalo de nuevo.",
                        numero
                    ),
                }
            }
            Err(e) => return Outcome::DispatchFailed { response: e.to_string() },
        };
        // owning client by stored reference, not by name
        match directory.get_client(tenant_id, &expediente.client_id).await {
            Ok(Some(client)) => (client, Some(expediente)),
            Ok(None) => {
                return Outcome::EntityNotFound {
                    response: format!(
                        "No se encontró el cliente del expediente \"{}\".",
                        numero
                    ),
                }
            }
            Err(e) => return Outcome::DispatchFailed { response: e.to_string() },
        }
    } else if let Some(nombre) = field(data, "cliente") {
        match resolve_client_by_name(directory, tenant_id, &nombre).await {
            Ok(Some(client)) => (client, None),
            Ok(None) => {
                return Outcome::EntityNotFound {
                    response: format!(
                        "No se encontró el cliente \"{}\" en el despacho. Verifica el nombre e inténtalo de nuevo.",
                        nombre
                    ),
                }
            }
            Err(e) => return Outcome::DispatchFailed { response: e.to_string() },
        }
    } else {
        return Outcome::MissingField {
            response: "Necesito el número de expediente o el nombre del cliente para agendar la cita."
                .to_string(),
        };
    };

    let Some(fecha_raw) = field(data, "fecha") else {
        return Outcome::MissingField { response: prompt_for("la fecha de la cita") };
    };
    let hora = field(data, "hora");
    let Some(fecha) = parse_fecha(&fecha_raw, hora.as_deref()) else {
        return Outcome::MissingField {
            response: "No pude interpretar la fecha de la cita. Indica la fecha como AAAA-MM-DD y la hora como HH:MM.".to_string(),
        };
    };

    let estado = map_estado(field(data, "estado").or_else(|| field(data, "status")).as_deref());
    let new = NewCita {
        client_id: client.id.clone(),
        expediente_id: expediente.as_ref().map(|e| e.id.clone()),
        titulo: field(data, "titulo").unwrap_or_else(|| DEFAULT_TITULO.to_string()),
        fecha,
        estado,
    };
    match directory.create_cita(tenant_id, new).await {
        Ok(cita) => Outcome::Dispatched {
            response: "Cita agendada con éxito.".to_string(),
            payload: ActionPayload::Cita(cita),
        },
        Err(e) => Outcome::DispatchFailed { response: e.to_string() },
    }
}

fn map_estado(raw: Option<&str>) -> CitaEstado {
    let Some(raw) = raw else {
        return CitaEstado::default();
    };
    let folded = fold_name(raw);
    ESTADOS
        .iter()
        .find(|(k, _)| *k == folded)
        .map(|(_, v)| *v)
        .unwrap_or_default()
}

/// Combine a date and an optional time into a single timestamp. Accepts
/// either a separate date+time pair or a single combined date value; returns
/// `None` when nothing in the fixed format lists matches.
fn parse_fecha(fecha: &str, hora: Option<&str>) -> Option<DateTime<Utc>> {
    let fecha = fecha.trim();
    if let Some(hora) = hora {
        let combined = format!("{} {}", fecha, hora.trim());
        for fmt in FECHA_HORA_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(&combined, fmt) {
                return Some(dt.and_utc());
            }
        }
        return None;
    }
    for fmt in FECHA_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(fecha, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DIA_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(fecha, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{MemoryDirectory, NewClient, NewExpediente, Origen};
    use serde_json::json;

    fn data(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    async fn seed(dir: &MemoryDirectory) -> (String, String) {
        let client = dir
            .create_client(
                "t1",
                NewClient {
                    name: "Ana García".to_string(),
                    email: "ana@x.com".to_string(),
                    phone: "555".to_string(),
                },
            )
            .await
            .unwrap();
        let exp = dir
            .create_expediente(
                "t1",
                NewExpediente {
                    numero_expediente: "EXP-1".to_string(),
                    client_id: client.id.clone(),
                    client_name: client.name.clone(),
                    title: "Divorcio".to_string(),
                    status: "abierto".to_string(),
                    due_date: None,
                    origen: Origen::Asistente,
                },
            )
            .await
            .unwrap();
        (client.id, exp.id)
    }

    #[test]
    fn estados_map_through_the_table_with_programada_default() {
        assert_eq!(map_estado(Some("Completada")), CitaEstado::Completada);
        assert_eq!(map_estado(Some("CANCELADA")), CitaEstado::Cancelada);
        assert_eq!(map_estado(Some("pendiente de revisión")), CitaEstado::Programada);
        assert_eq!(map_estado(None), CitaEstado::Programada);
    }

    #[test]
    fn fecha_and_hora_combine_into_one_timestamp() {
        let dt = parse_fecha("2025-01-10", Some("10:00")).expect("parse");
        assert_eq!(dt.to_rfc3339(), "2025-01-10T10:00:00+00:00");
        assert!(parse_fecha("10/01/2025", Some("10:00")).is_some());
        assert!(parse_fecha("2025-01-10T10:00", None).is_some());
        // date only falls back to midnight
        let midnight = parse_fecha("2025-01-10", None).expect("date only");
        assert_eq!(midnight.to_rfc3339(), "2025-01-10T00:00:00+00:00");
        assert!(parse_fecha("el martes que viene", None).is_none());
    }

    #[tokio::test]
    async fn case_path_resolves_owning_client_by_reference() {
        let dir = MemoryDirectory::new();
        let (client_id, exp_id) = seed(&dir).await;
        let d = data(json!({"caseId": "EXP-1", "fecha": "2025-01-10", "hora": "10:00"}));
        match agendar_cita(&dir, "t1", &d).await {
            Outcome::Dispatched { response, payload } => {
                assert_eq!(response, "Cita agendada con éxito.");
                let ActionPayload::Cita(c) = payload else {
                    panic!("expected cita payload");
                };
                assert_eq!(c.client_id, client_id);
                assert_eq!(c.expediente_id.as_deref(), Some(exp_id.as_str()));
                assert_eq!(c.estado, CitaEstado::Programada);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_expediente_is_entity_not_found() {
        let dir = MemoryDirectory::new();
        let d = data(json!({"caseId": "EXP-1", "fecha": "2025-01-10", "hora": "10:00"}));
        match agendar_cita(&dir, "t1", &d).await {
            Outcome::EntityNotFound { response } => {
                assert!(response.contains("No se encontró el expediente \"EXP-1\""))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn client_name_path_is_taken_when_no_case_id() {
        let dir = MemoryDirectory::new();
        seed(&dir).await;
        let d = data(json!({"cliente": "ana garcia", "fecha": "2025-01-10", "hora": "10:00", "estado": "Completada"}));
        match agendar_cita(&dir, "t1", &d).await {
            Outcome::Dispatched { payload, .. } => {
                let ActionPayload::Cita(c) = payload else {
                    panic!("expected cita payload");
                };
                assert!(c.expediente_id.is_none());
                assert_eq!(c.estado, CitaEstado::Completada);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn neither_case_nor_client_prompts_for_the_subject() {
        let dir = MemoryDirectory::new();
        let d = data(json!({"fecha": "2025-01-10"}));
        match agendar_cita(&dir, "t1", &d).await {
            Outcome::MissingField { response } => assert!(response.contains("expediente")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unparseable_fecha_is_a_soft_validation_failure() {
        let dir = MemoryDirectory::new();
        seed(&dir).await;
        let d = data(json!({"caseId": "EXP-1", "fecha": "mañana por la tarde"}));
        match agendar_cita(&dir, "t1", &d).await {
            Outcome::MissingField { response } => assert!(response.contains("fecha")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
