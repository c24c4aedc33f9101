//! Integration tests for the broker HTTP client using wiremock
//!
//! These tests verify the client's routes, bodies and paging parameters
//! against mocked endpoints, and drive the reconciler end to end.

use mqctl::broker::{
    broker_error, list_users, BrokerError, ReconcileOptions, Reconciler, TargetState, UserListing,
    UserQuery,
};
use mqctl::mq::{ApiError, MqApi, MqClient};
use serde_json::{json, Value};
use wiremock::matchers::{
    bearer_token, body_json, body_partial_json, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> MqClient {
    MqClient::new(&server.uri(), Some("test-token".to_string()))
        .expect("Client should build")
}

fn desired(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().expect("Declaration should be an object")
}

/// Test module for HTTP client integration tests
mod http_client_tests {
    use super::*;

    /// Listing sends the page size and token, and parses summaries
    #[tokio::test]
    async fn test_list_brokers_returns_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/brokers"))
            .and(query_param("maxResults", "100"))
            .and(bearer_token("test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "BrokerSummaries": [
                    {"BrokerName": "orders", "BrokerId": "b-1"},
                    {"BrokerName": "billing", "BrokerId": "b-2"}
                ],
                "NextToken": "page-2"
            })))
            .mount(&server)
            .await;

        let page = client_for(&server).list_brokers(100, None).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1]["BrokerId"], "b-2");
        assert_eq!(page.next_token.as_deref(), Some("page-2"));
    }

    /// Describe hits the broker path
    #[tokio::test]
    async fn test_describe_broker() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/brokers/b-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "BrokerId": "b-1",
                "BrokerState": "RUNNING"
            })))
            .mount(&server)
            .await;

        let broker = client_for(&server).describe_broker("b-1").await.unwrap();
        assert_eq!(broker["BrokerState"], "RUNNING");
    }

    /// Update sends the body with PUT
    #[tokio::test]
    async fn test_update_broker_puts_body() {
        let server = MockServer::start().await;
        let body = json!({"EngineVersion": "5.17.6", "Logs": {"Audit": true}});

        Mock::given(method("PUT"))
            .and(path("/v1/brokers/b-1"))
            .and(body_json(&body))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"BrokerId": "b-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).update_broker("b-1", &body).await.unwrap();
        assert_eq!(result["BrokerId"], "b-1");
    }

    /// Reboot posts to the reboot sub-path; an empty body is null
    #[tokio::test]
    async fn test_reboot_empty_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/brokers/b-1/reboot"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).reboot_broker("b-1").await.unwrap();
        assert_eq!(result, Value::Null);
    }

    /// Delete request
    #[tokio::test]
    async fn test_delete_broker() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/v1/brokers/b-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"BrokerId": "b-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).delete_broker("b-1").await.unwrap();
        assert_eq!(result["BrokerId"], "b-1");
    }

    /// 404 carries the error type header and message
    #[tokio::test]
    async fn test_404_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/brokers/b-missing"))
            .respond_with(
                ResponseTemplate::new(404)
                    .insert_header("x-amzn-errortype", "NotFoundException:http://internal.example/")
                    .set_body_json(json!({
                        "errorAttribute": "broker-id",
                        "message": "Can't find requested broker [b-missing]."
                    })),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).describe_broker("b-missing").await.unwrap_err();
        let api_error = err.downcast_ref::<ApiError>().expect("Should be an API error");

        assert_eq!(api_error.status, 404);
        assert_eq!(api_error.code.as_deref(), Some("NotFoundException"));
        assert_eq!(api_error.message, "Can't find requested broker [b-missing].");
        assert!(!api_error.is_retryable());
    }

    /// Rate limiting (429) is throttled and retryable
    #[tokio::test]
    async fn test_rate_limit_429() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/brokers"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "message": "Rate exceeded"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).list_brokers(100, None).await.unwrap_err();
        let api_error = err.downcast_ref::<ApiError>().expect("Should be an API error");

        assert!(api_error.is_throttled());
        assert!(api_error.is_retryable());
    }

    /// User listing follows tokens across pages
    #[tokio::test]
    async fn test_user_pagination_with_next_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/brokers/b-1/users"))
            .and(query_param_is_missing("nextToken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Users": [{"Username": "u1"}, {"Username": "u2"}],
                "NextToken": "t2"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/brokers/b-1/users"))
            .and(query_param("nextToken", "t2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Users": [{"Username": "u3", "PendingChange": "CREATE"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let query = UserQuery {
            max_results: 2,
            skip_pending_create: true,
            as_map: true,
            ..UserQuery::default()
        };

        let listing = list_users(&client, "b-1", &query).await.unwrap();
        let UserListing::Map(users) = listing else {
            panic!("Expected users keyed by name");
        };

        let names: Vec<&String> = users.keys().collect();
        assert_eq!(names, ["u1", "u2"]);
    }
}

/// End-to-end reconciliation against a mocked API
mod reconcile_tests {
    use super::*;

    async fn mount_listing(server: &MockServer, summaries: Value) {
        Mock::given(method("GET"))
            .and(path("/v1/brokers"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "BrokerSummaries": summaries })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_present_creates_with_default_admin() {
        let server = MockServer::start().await;
        mount_listing(&server, json!([])).await;

        Mock::given(method("POST"))
            .and(path("/v1/brokers"))
            .and(body_partial_json(json!({
                "BrokerName": "orders",
                "SecurityGroups": ["sg-1"],
                "DeploymentMode": "SINGLE_INSTANCE",
                "Users": [{"Username": "admin", "ConsoleAccess": true}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "BrokerId": "b-9",
                "BrokerArn": "arn:aws:mq:eu-west-1:123456789012:broker:orders:b-9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = Reconciler::new(&client, ReconcileOptions::default())
            .reconcile(
                TargetState::Present,
                &desired(json!({"broker_name": "orders", "security_groups": ["sg-1"]})),
            )
            .await
            .unwrap();

        assert!(outcome.changed);
        assert_eq!(outcome.broker["BrokerId"], "b-9");
    }

    #[tokio::test]
    async fn test_present_updates_without_create_only_fields() {
        let server = MockServer::start().await;
        mount_listing(&server, json!([{"BrokerName": "orders", "BrokerId": "b-1"}])).await;

        Mock::given(method("PUT"))
            .and(path("/v1/brokers/b-1"))
            .and(body_json(json!({
                "SecurityGroups": ["sg-1"],
                "HostInstanceType": "mq.m5.large"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"BrokerId": "b-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = Reconciler::new(&client, ReconcileOptions::default())
            .reconcile(
                TargetState::Present,
                &desired(json!({
                    "broker_name": "orders",
                    "security_groups": ["sg-1"],
                    "host_instance_type": "mq.m5.large",
                    "storage_type": "EBS",
                    "users": [{"Username": "ops"}]
                })),
            )
            .await
            .unwrap();

        assert!(outcome.changed);
    }

    #[tokio::test]
    async fn test_absent_on_missing_broker_sends_no_delete() {
        let server = MockServer::start().await;
        mount_listing(&server, json!([{"BrokerName": "billing", "BrokerId": "b-2"}])).await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = Reconciler::new(&client, ReconcileOptions::default())
            .reconcile(TargetState::Absent, &desired(json!({"broker_name": "orders"})))
            .await
            .unwrap_err();

        assert_eq!(
            broker_error(&err),
            Some(&BrokerError::NotFound {
                name: "orders".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_dry_run_create_sends_no_post() {
        let server = MockServer::start().await;
        mount_listing(&server, json!([])).await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let options = ReconcileOptions {
            dry_run: true,
            region: "eu-west-1".to_string(),
            ..ReconcileOptions::default()
        };
        let outcome = Reconciler::new(&client, options)
            .reconcile(
                TargetState::Present,
                &desired(json!({"broker_name": "orders", "security_groups": ["sg-1"]})),
            )
            .await
            .unwrap();

        assert!(outcome.changed);
        let arn = outcome.broker["BrokerArn"].as_str().unwrap();
        assert!(arn.starts_with("arn:aws:mq:eu-west-1:"));
    }

    #[tokio::test]
    async fn test_transport_failure_carries_context() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/brokers"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = Reconciler::new(&client, ReconcileOptions::default())
            .reconcile(TargetState::Restarted, &desired(json!({"broker_name": "orders"})))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Couldn't list brokers");
        let api_error = err
            .chain()
            .find_map(|e| e.downcast_ref::<ApiError>())
            .expect("Should carry the API error");
        assert_eq!(api_error.status, 503);
        assert!(api_error.is_retryable());
    }

    #[tokio::test]
    async fn test_describe_by_name() {
        let server = MockServer::start().await;
        mount_listing(&server, json!([{"BrokerName": "orders", "BrokerId": "b-1"}])).await;

        Mock::given(method("GET"))
            .and(path("/v1/brokers/b-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "BrokerId": "b-1",
                "BrokerName": "orders"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let broker = Reconciler::new(&client, ReconcileOptions::default())
            .describe(None, Some("orders"))
            .await
            .unwrap();

        assert_eq!(broker["BrokerName"], "orders");
    }
}
