//! Tests against DynamoDB Local
//!
//! Run with:
//! DYNAMODB_LOCAL_ENDPOINT=http://localhost:8000 AWS_ACCESS_KEY_ID=local \
//! AWS_SECRET_ACCESS_KEY=local cargo test --package querybridge-integration-tests

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, KeySchemaElement, KeyType, ScalarAttributeType,
};
use pretty_assertions::assert_eq;
use querybridge_core::{
    ChatCompletionsClient, ConnectionSettings, Database, DynamoClient, Processor,
};
use querybridge_integration_tests::{
    skip_if_no_dynamodb, sqs_event, test_config, unique_table_name, MockInferenceApi,
};
use serde_json::json;
use std::sync::Arc;

async fn connect() -> DynamoClient {
    let settings = ConnectionSettings {
        region: "us-west-2".to_string(),
        endpoint: std::env::var("DYNAMODB_LOCAL_ENDPOINT").ok(),
    };
    DynamoClient::create_connection(&settings).await
}

async fn create_table(client: &DynamoClient, table_name: &str) {
    client
        .inner()
        .create_table()
        .table_name(table_name)
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name("id")
                .attribute_type(ScalarAttributeType::S)
                .build()
                .expect("attribute definition"),
        )
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name("id")
                .key_type(KeyType::Hash)
                .build()
                .expect("key schema"),
        )
        .billing_mode(BillingMode::PayPerRequest)
        .send()
        .await
        .expect("Failed to create table");
}

async fn delete_table(client: &DynamoClient, table_name: &str) {
    let _ = client
        .inner()
        .delete_table()
        .table_name(table_name)
        .send()
        .await;
}

#[tokio::test]
async fn test_list_tables_discovers_new_table() {
    skip_if_no_dynamodb!();

    let client = connect().await;
    let table_name = unique_table_name();
    create_table(&client, &table_name).await;

    let tables = client.list_tables().await.expect("list tables");
    assert!(tables.contains(&table_name));

    delete_table(&client, &table_name).await;
}

#[tokio::test]
async fn test_generated_insert_lands_in_table() {
    skip_if_no_dynamodb!();

    let client = connect().await;
    let table_name = unique_table_name();
    create_table(&client, &table_name).await;

    let api = MockInferenceApi::start().await;
    api.route("new user ana", &table_name).await;
    api.translate(
        "new user ana",
        &format!(r#"INSERT INTO "{}" VALUE {{'id': 'ana', 'plan': 'pro'}}"#, table_name),
    )
    .await;

    let endpoint = std::env::var("DYNAMODB_LOCAL_ENDPOINT").expect("endpoint");
    let config = test_config(
        &api.url(),
        &[("DB_TABLES", table_name.as_str()), ("DB_ENDPOINT", endpoint.as_str())],
    );
    let database = DynamoClient::create_connection(&ConnectionSettings::from_config(&config)).await;
    let inference = ChatCompletionsClient::new(&config).expect("client");
    let processor = Processor::new(config, Arc::new(inference), Arc::new(database));

    let response = processor
        .handle_event(sqs_event(&[("m-1", "new user ana")]))
        .await
        .expect("batch");
    let json = serde_json::to_value(response).unwrap();
    assert_eq!(json["failures"], json!([]));

    let items = client
        .execute(&querybridge_core::Query {
            message_id: None,
            record_index: 0,
            table_name: table_name.clone(),
            statement: format!(r#"SELECT * FROM "{}" WHERE id = 'ana'"#, table_name),
            kind: querybridge_core::QueryKind::Select,
        })
        .await
        .expect("select");
    assert_eq!(items, vec![json!({"id": "ana", "plan": "pro"})]);

    delete_table(&client, &table_name).await;
}

#[tokio::test]
async fn test_select_collects_every_page() {
    skip_if_no_dynamodb!();

    let client = connect().await;
    let table_name = unique_table_name();
    create_table(&client, &table_name).await;

    for id in ["a", "b", "c"] {
        client
            .execute(&querybridge_core::Query {
                message_id: None,
                record_index: 0,
                table_name: table_name.clone(),
                statement: format!(r#"INSERT INTO "{}" VALUE {{'id': '{}'}}"#, table_name, id),
                kind: querybridge_core::QueryKind::Insert,
            })
            .await
            .expect("insert");
    }

    // One item per page forces ExecuteStatement to hand back continuation tokens
    let paged = connect().await.with_page_size(1);
    let mut items = paged
        .execute(&querybridge_core::Query {
            message_id: None,
            record_index: 0,
            table_name: table_name.clone(),
            statement: format!(r#"SELECT id FROM "{}""#, table_name),
            kind: querybridge_core::QueryKind::Select,
        })
        .await
        .expect("select");
    items.sort_by_key(|item| item["id"].as_str().unwrap_or_default().to_string());

    assert_eq!(
        items,
        vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})]
    );

    delete_table(&client, &table_name).await;
}
