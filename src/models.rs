use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field ids as configured in the Pipefy tables and pipe.
pub mod fields {
    /// Customers table ("Consumidores").
    pub mod customer {
        pub const PHONE: &str = "telefone";
        pub const EMAIL: &str = "e_mail";
        pub const FULL_NAME: &str = "nome";
        pub const ZIP: &str = "cep";
        pub const ENERGY_CONSUMPTION: &str = "consumo_m_dio_de_energia";
        pub const SALES_AGENT: &str = "corretor";
    }

    /// Sales agents table ("Corretores").
    pub mod sales_agent {
        pub const CRECI: &str = "creci";
    }

    /// Sales pipe ("Vendas").
    pub mod sales_card {
        pub const CUSTOMER: &str = "consumidor";
        pub const SALES_AGENT: &str = "corretor";
    }
}

// ============ Submission ============

/// A validated lead submission. `phone` holds the normalized number.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub phone: String,
    pub email: String,
    pub full_name: String,
    pub zip: String,
    pub energy_consumption: f64,
    pub creci: String,
}

// ============ Pipefy read shapes ============

/// Any Pipefy object of which only the identifier matters
/// (table records, created cards).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

impl RecordRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A card as returned by `findCards`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub summary: Vec<CardSummaryItem>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fields: Vec<CardField>,
    #[serde(default)]
    pub current_phase: Option<Phase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardSummaryItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub field: Option<FieldRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Pipefy ids show up both as strings and as bare numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============ Pipefy write/search shapes ============

/// Search criterion for `findRecords` / `findCards`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSearch {
    pub field_id: String,
    pub field_value: String,
}

impl FieldSearch {
    pub fn new(field_id: impl Into<String>, field_value: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            field_value: field_value.into(),
        }
    }
}

/// One entry of `fields_attributes` in create mutations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAttribute {
    pub field_id: String,
    pub field_value: Value,
}

impl FieldAttribute {
    pub fn new(field_id: impl Into<String>, field_value: impl Into<Value>) -> Self {
        Self {
            field_id: field_id.into(),
            field_value: field_value.into(),
        }
    }
}

// ============ Intake responses ============

/// Body of a 202 response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeResponseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_agent: Option<RecordRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer: Option<RecordRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<RecordRef>,
}

/// Result of one `submit_lead` call: status, headers and JSON body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

impl LeadResponse {
    pub fn new(status: StatusCode, body: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            header::CONTENT_TYPE.as_str().to_string(),
            "application/json".to_string(),
        );

        Self {
            status_code: status.as_u16(),
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for LeadResponse {
    fn into_response(self) -> Response {
        // Json sets content-type: application/json
        (self.status(), Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_card_with_numeric_ids() {
        let json = json!({
            "id": 123456,
            "title": "Gabriel Oliveira",
            "summary": [{ "title": "Consumidor", "value": "Gabriel" }],
            "fields": [{ "name": "Corretor", "value": "[\"42\"]", "field": { "id": "corretor" } }],
            "url": "https://app.pipefy.com/open-cards/123456",
            "current_phase": { "id": 987, "name": "Caixa de entrada" }
        });

        let card: Card = serde_json::from_value(json).unwrap();
        assert_eq!(card.id, "123456");
        assert_eq!(card.summary.len(), 1);
        assert_eq!(card.fields[0].field.as_ref().unwrap().id, "corretor");
        assert_eq!(card.current_phase.unwrap().id, "987");
    }

    #[test]
    fn test_parse_minimal_card() {
        let card: Card =
            serde_json::from_value(json!({ "id": "77", "summary": null, "fields": null }))
                .unwrap();
        assert_eq!(card.id, "77");
        assert!(card.summary.is_empty());
        assert!(card.fields.is_empty());
        assert!(card.current_phase.is_none());
    }

    #[test]
    fn test_record_ref_rejects_non_scalar_id() {
        let result: Result<RecordRef, _> = serde_json::from_value(json!({ "id": {} }));
        assert!(result.is_err());
    }

    #[test]
    fn test_search_and_attribute_wire_names() {
        assert_eq!(
            serde_json::to_value(FieldSearch::new("creci", "123456")).unwrap(),
            json!({ "fieldId": "creci", "fieldValue": "123456" })
        );
        assert_eq!(
            serde_json::to_value(FieldAttribute::new("cep", "01141000")).unwrap(),
            json!({ "field_id": "cep", "field_value": "01141000" })
        );
    }

    #[test]
    fn test_response_body_omits_absent_entities() {
        let body = IntakeResponseBody {
            sales_agent: Some(RecordRef::new("1")),
            customer: None,
            card: Some(RecordRef::new("3")),
        };

        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({ "salesAgent": { "id": "1" }, "card": { "id": "3" } })
        );
    }

    #[test]
    fn test_lead_response_serializes_like_a_gateway_response() {
        let response = LeadResponse::new(StatusCode::ACCEPTED, json!({}));
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({
                "statusCode": 202,
                "headers": { "content-type": "application/json" },
                "body": {}
            })
        );
    }
}
