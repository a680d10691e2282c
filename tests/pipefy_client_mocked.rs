/// Integration tests with a mocked Pipefy GraphQL endpoint
/// Tests the client without hitting the real API
use rust_lead_intake::config::PipefyConfig;
use rust_lead_intake::errors::AppError;
use rust_lead_intake::models::{FieldAttribute, FieldSearch, RecordRef};
use rust_lead_intake::pipefy_client::{PipefyApi, PipefyClient};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper function to create test config
fn create_test_config(api_url: String) -> PipefyConfig {
    PipefyConfig {
        api_url,
        auth_token: "test_token".to_string(),
        customers_table_id: "customers".to_string(),
        sales_agents_table_id: "agents".to_string(),
        sales_pipe_id: "301".to_string(),
        timeout_secs: 5,
    }
}

async fn client_for(mock_server: &MockServer) -> PipefyClient {
    let config = create_test_config(format!("{}/graphql", mock_server.uri()));
    PipefyClient::new(&config).unwrap()
}

fn upstream_errors(err: AppError) -> Vec<serde_json::Value> {
    match err.root() {
        AppError::UpstreamError(errors) => errors.clone(),
        other => panic!("Expected upstream error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_find_record_sends_search_as_variables() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(header("Authorization", "Bearer test_token"))
        .and(body_partial_json(json!({
            "variables": {
                "tableId": "agents",
                "search": { "fieldId": "creci", "fieldValue": "123456" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "findRecords": {
                    "edges": [
                        { "node": { "id": "501" } },
                        { "node": { "id": "502" } }
                    ]
                }
            }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let record = client
        .find_record("agents", &FieldSearch::new("creci", "123456"))
        .await
        .unwrap();

    assert_eq!(record, Some(RecordRef::new("501")));
}

#[tokio::test]
async fn test_find_record_without_matches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "findRecords": { "edges": [] } }
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let record = client
        .find_record("customers", &FieldSearch::new("telefone", "+55 19 99726-5355"))
        .await
        .unwrap();

    assert_eq!(record, None);
}

#[tokio::test]
async fn test_injection_attempt_stays_inside_variables() {
    let mock_server = MockServer::start().await;
    let hostile = r#"123" } ) { edges { node { id } } } mutation { deleteTable(input: {id: "1"}) { success"#;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": { "search": { "fieldValue": hostile } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "findRecords": { "edges": [] } }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let record = client
        .find_record("agents", &FieldSearch::new("creci", hostile))
        .await
        .unwrap();

    assert_eq!(record, None);
    let requests = mock_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(!body["query"].as_str().unwrap().contains("deleteTable"));
}

#[tokio::test]
async fn test_api_errors_are_passed_through_verbatim() {
    let mock_server = MockServer::start().await;
    let errors = json!([{
        "message": "Permission denied",
        "locations": [{ "line": 3, "column": 3 }],
        "path": ["findRecords"],
        "extensions": { "code": "PERMISSION_DENIED" }
    }]);

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "findRecords": null },
            "errors": errors.clone()
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let err = client
        .find_record("agents", &FieldSearch::new("creci", "123456"))
        .await
        .unwrap_err();

    assert_eq!(json!(upstream_errors(err)), errors);
}

#[tokio::test]
async fn test_errors_win_over_http_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "errors": [{ "message": "Unauthorized" }]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let err = client
        .create_card("301", &[FieldAttribute::new("consumidor", "9")])
        .await
        .unwrap_err();

    assert_eq!(upstream_errors(err), vec![json!({ "message": "Unauthorized" })]);
}

#[tokio::test]
async fn test_non_json_response_is_an_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let err = client
        .find_record("agents", &FieldSearch::new("creci", "123456"))
        .await
        .unwrap_err();

    let errors = upstream_errors(err);
    assert_eq!(errors.len(), 1);
    assert!(errors[0]["message"].as_str().unwrap().contains("502"));
}

#[tokio::test]
async fn test_create_record_sends_fields_attributes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {
                "input": {
                    "table_id": "customers",
                    "fields_attributes": [
                        { "field_id": "nome", "field_value": "Gabriel Oliveira" },
                        { "field_id": "corretor", "field_value": "501" }
                    ]
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "createTableRecord": { "table_record": { "id": 777 } } }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let record = client
        .create_record(
            "customers",
            &[
                FieldAttribute::new("nome", "Gabriel Oliveira"),
                FieldAttribute::new("corretor", "501"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(record, RecordRef::new("777"));
}

#[tokio::test]
async fn test_find_card_reads_rich_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": {
                "pipeId": "301",
                "search": { "fieldId": "consumidor", "fieldValue": "777" }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "findCards": {
                    "edges": [{
                        "node": {
                            "id": "9001",
                            "title": "Gabriel Oliveira",
                            "url": "https://app.pipefy.com/open-cards/9001",
                            "summary": [{ "title": "Consumidor", "value": "Gabriel Oliveira" }],
                            "fields": [{ "name": "Consumidor", "value": "[\"777\"]", "field": { "id": "consumidor" } }],
                            "current_phase": { "id": "12", "name": "Caixa de entrada" }
                        }
                    }]
                }
            }
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let card = client
        .find_card("301", &FieldSearch::new("consumidor", "777"))
        .await
        .unwrap()
        .expect("card");

    assert_eq!(card.id, "9001");
    assert_eq!(card.title.as_deref(), Some("Gabriel Oliveira"));
    assert_eq!(card.current_phase.unwrap().name.as_deref(), Some("Caixa de entrada"));
}

#[tokio::test]
async fn test_create_card_returns_new_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "variables": { "input": { "pipe_id": "301" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "createCard": { "card": { "id": "9002" } } }
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let card = client
        .create_card(
            "301",
            &[
                FieldAttribute::new("consumidor", "777"),
                FieldAttribute::new("corretor", "501"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(card, RecordRef::new("9002"));
}

#[tokio::test]
async fn test_missing_data_is_an_upstream_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": null })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let err = client
        .create_record("customers", &[])
        .await
        .unwrap_err();

    assert_eq!(upstream_errors(err).len(), 1);
}
