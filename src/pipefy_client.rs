//! Pipefy GraphQL access.
//!
//! The workflow only needs four operations, exposed through [`PipefyApi`] so the
//! orchestrator can run against a test double. [`PipefyClient`] is the real
//! implementation: every query is a constant document and all user-supplied
//! values travel as GraphQL variables.
use crate::config::PipefyConfig;
use crate::errors::AppError;
use crate::models::{Card, FieldAttribute, FieldSearch, RecordRef};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

const FIND_RECORDS_QUERY: &str = r#"
query FindRecords($tableId: ID!, $search: FindRecords!) {
  findRecords(tableId: $tableId, search: $search) {
    edges { node { id } }
  }
}"#;

const CREATE_TABLE_RECORD_MUTATION: &str = r#"
mutation CreateTableRecord($input: CreateTableRecordInput!) {
  createTableRecord(input: $input) {
    table_record { id }
  }
}"#;

const FIND_CARDS_QUERY: &str = r#"
query FindCards($pipeId: ID!, $search: FindCards!) {
  findCards(pipeId: $pipeId, search: $search) {
    edges {
      node {
        id
        title
        url
        summary { title value }
        fields { name value field { id } }
        current_phase { id name }
      }
    }
  }
}"#;

const CREATE_CARD_MUTATION: &str = r#"
mutation CreateCard($input: CreateCardInput!) {
  createCard(input: $input) {
    card { id }
  }
}"#;

/// The four Pipefy operations the intake workflow relies on.
///
/// Any API-level error surfaces as [`AppError::UpstreamError`]; nothing is retried.
#[async_trait]
pub trait PipefyApi: Send + Sync {
    /// First record of `table_id` matching `search`, if any.
    async fn find_record(
        &self,
        table_id: &str,
        search: &FieldSearch,
    ) -> Result<Option<RecordRef>, AppError>;

    /// Creates exactly one record and returns its id.
    async fn create_record(
        &self,
        table_id: &str,
        fields: &[FieldAttribute],
    ) -> Result<RecordRef, AppError>;

    /// First card of `pipe_id` matching `search`, if any.
    async fn find_card(
        &self,
        pipe_id: &str,
        search: &FieldSearch,
    ) -> Result<Option<Card>, AppError>;

    /// Creates exactly one card and returns its id.
    async fn create_card(
        &self,
        pipe_id: &str,
        fields: &[FieldAttribute],
    ) -> Result<RecordRef, AppError>;
}

// ============ GraphQL envelopes ============

/// `data` is decoded only after `errors` has been checked, since failed
/// operations often come back with partial or null data.
#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Connection<T> {
    #[serde(default)]
    edges: Vec<Edge<T>>,
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: Option<T>,
}

impl<T> Connection<T> {
    fn first(self) -> Option<T> {
        self.edges.into_iter().find_map(|edge| edge.node)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindRecordsData {
    find_records: Connection<RecordRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindCardsData {
    find_cards: Connection<Card>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTableRecordData {
    create_table_record: CreatedTableRecord,
}

#[derive(Debug, Deserialize)]
struct CreatedTableRecord {
    table_record: RecordRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCardData {
    create_card: CreatedCard,
}

#[derive(Debug, Deserialize)]
struct CreatedCard {
    card: RecordRef,
}

/// Client for the Pipefy GraphQL endpoint.
#[derive(Clone)]
pub struct PipefyClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl PipefyClient {
    /// Creates a new `PipefyClient` with the configured request timeout.
    pub fn new(config: &PipefyConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| {
                AppError::upstream_message(format!("Failed to create Pipefy client: {}", e))
            })?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            token: config.auth_token.clone(),
        })
    }

    /// Sends one GraphQL document and decodes `data`.
    ///
    /// A non-empty `errors` array wins over everything else, including the HTTP
    /// status, and is returned verbatim.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, AppError> {
        let body = json!({ "query": query, "variables": variables });
        tracing::debug!("[{}] request variables: {}", operation, body["variables"]);

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::debug!("[{}] response ({}): {}", operation, status, text);

        let envelope: GraphQlResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                "[{}] unparsable Pipefy response ({}): {}",
                operation,
                status,
                e
            );
            AppError::upstream_message(format!(
                "Pipefy returned {} with an unexpected body: {}",
                status, e
            ))
        })?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            tracing::error!("[{}] Pipefy reported {} error(s)", operation, errors.len());
            return Err(AppError::UpstreamError(errors));
        }

        let data = envelope.data.filter(|data| !data.is_null()).ok_or_else(|| {
            AppError::upstream_message(format!(
                "Pipefy returned {} without data for {}",
                status, operation
            ))
        })?;

        serde_json::from_value(data).map_err(|e| {
            AppError::upstream_message(format!(
                "Unexpected Pipefy data for {}: {}",
                operation, e
            ))
        })
    }
}

#[async_trait]
impl PipefyApi for PipefyClient {
    async fn find_record(
        &self,
        table_id: &str,
        search: &FieldSearch,
    ) -> Result<Option<RecordRef>, AppError> {
        let data: FindRecordsData = self
            .execute(
                "findRecord",
                FIND_RECORDS_QUERY,
                json!({ "tableId": table_id, "search": search }),
            )
            .await?;

        Ok(data.find_records.first())
    }

    async fn create_record(
        &self,
        table_id: &str,
        fields: &[FieldAttribute],
    ) -> Result<RecordRef, AppError> {
        let data: CreateTableRecordData = self
            .execute(
                "createRecord",
                CREATE_TABLE_RECORD_MUTATION,
                json!({
                    "input": {
                        "table_id": table_id,
                        "fields_attributes": fields,
                    }
                }),
            )
            .await?;

        let record = data.create_table_record.table_record;
        tracing::info!("✓ Record created in table {}: {}", table_id, record.id);
        Ok(record)
    }

    async fn find_card(
        &self,
        pipe_id: &str,
        search: &FieldSearch,
    ) -> Result<Option<Card>, AppError> {
        let data: FindCardsData = self
            .execute(
                "findCard",
                FIND_CARDS_QUERY,
                json!({ "pipeId": pipe_id, "search": search }),
            )
            .await?;

        Ok(data.find_cards.first())
    }

    async fn create_card(
        &self,
        pipe_id: &str,
        fields: &[FieldAttribute],
    ) -> Result<RecordRef, AppError> {
        let data: CreateCardData = self
            .execute(
                "createCard",
                CREATE_CARD_MUTATION,
                json!({
                    "input": {
                        "pipe_id": pipe_id,
                        "fields_attributes": fields,
                    }
                }),
            )
            .await?;

        let card = data.create_card.card;
        tracing::info!("✓ Card created in pipe {}: {}", pipe_id, card.id);
        Ok(card)
    }
}
