use serde_json::{json, Value};
use stetx::core::config::Dsp2Config;
use stetx::core::errors::{AuthError, Dsp2Error, TransportError};
use stetx::core::types::{AccountType, BalanceType, TransactionQuery, TransactionStatus};
use stetx::stet::build_client;
use stetx::{AccountInformation, Dsp2Client, ListPolicy};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "token123";
const ACCOUNT_A: &str = "acct_x05RAIZbtzKCUJ7m1MEnzOI5";
const ACCOUNT_B: &str = "acct_Bq9Zc2Lr7Ts4Uv1Wx8Yy3Ab6";

/// Helper function to create a client config pointing at the mock server
fn config_for(server: &MockServer) -> Dsp2Config {
    Dsp2Config::new("user".to_string(), "pass".to_string()).base_url(server.uri())
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=user"))
        .and(body_string_contains("password=pass"))
        .and(body_string_contains("scope=stet"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": TOKEN })))
        .mount(server)
        .await;
}

async fn mount_get(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", "Bearer token123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(server)
        .await;
}

fn identity_json() -> Value {
    json!({
        "id": "user_xjRTE0pozug4jZ7RId2H8rWZ",
        "prefix": "DOCT",
        "first_name": "Alice",
        "last_name": "Bob",
        "date_of_birth": "2000-01-01",
    })
}

fn account_json(id: &str, iban: &str) -> Value {
    json!({
        "id": id,
        "type": "CACC",
        "usage": "PRIV",
        "iban": iban,
        "name": "Main Account",
        "currency": "EUR",
    })
}

fn balance_json(id: &str, amount: i64) -> Value {
    json!({
        "id": id,
        "name": "Closing booked",
        "amount": amount,
        "currency": "EUR",
        "type": "CLBD",
    })
}

fn transaction_json(id: &str, label: &str) -> Value {
    json!({
        "id": id,
        "label": label,
        "amount": 1250,
        "crdt_dbit_indicator": "CRDT",
        "status": "BOOK",
        "currency": null,
        "date_operation": "2024-05-02T09:15:00Z",
        "date_processed": null,
    })
}

async fn get_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count()
}

#[cfg(test)]
mod authentication_tests {
    use super::*;

    #[tokio::test]
    async fn test_authenticate_success_sets_bearer_header() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_get(&server, "/stet/identity", identity_json()).await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        assert_eq!(client.authenticator().token().await.as_deref(), Some(TOKEN));

        let identity = client.get_identity().await.unwrap();
        assert_eq!(identity.first_name, "Alice");
        assert_eq!(identity.last_name, "Bob");
    }

    #[tokio::test]
    async fn test_authenticate_failure_statuses() {
        for status in [400u16, 401, 403, 500] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/oauth/token"))
                .respond_with(ResponseTemplate::new(status).set_body_string("Bad request"))
                .mount(&server)
                .await;

            let err = Dsp2Client::connect(&config_for(&server)).await.unwrap_err();
            assert!(
                matches!(err, Dsp2Error::AuthenticationError(AuthError::TokenRequest(_))),
                "status {} should fail authentication",
                status
            );
            assert_eq!(err.status().map(|s| s.as_u16()), Some(status));
            assert!(
                err.to_string().contains("Failed POST /oauth/token"),
                "{}",
                err
            );

            let client = build_client(&config_for(&server)).unwrap();
            assert!(client.authenticate().await.is_err());
            assert!(!client.authenticator().has_token().await);
        }
    }

    #[tokio::test]
    async fn test_authenticate_missing_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let result = Dsp2Client::connect(&config_for(&server)).await;
        assert!(matches!(
            result,
            Err(Dsp2Error::AuthenticationError(AuthError::MissingToken))
        ));
    }

    #[tokio::test]
    async fn test_authenticate_empty_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "" })))
            .mount(&server)
            .await;

        let result = Dsp2Client::connect(&config_for(&server)).await;
        assert!(matches!(result, Err(Dsp2Error::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_authenticate_transport_failure() {
        // Nothing listens on the discard port.
        let config = Dsp2Config::new("user".to_string(), "pass".to_string())
            .base_url("http://127.0.0.1:9".to_string())
            .timeout_seconds(2);

        let err = Dsp2Client::connect(&config).await.unwrap_err();
        assert!(matches!(
            err,
            Dsp2Error::AuthenticationError(AuthError::TokenRequest(ref inner))
                if matches!(**inner, Dsp2Error::RequestError { cause: TransportError::Http(_), .. })
        ));
        assert_eq!(err.status(), None);
    }

    #[tokio::test]
    async fn test_missing_credentials_never_hit_network() {
        for (username, password) in [("", "pass"), ("user", ""), ("", "")] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/oauth/token"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": TOKEN })))
                .expect(0)
                .mount(&server)
                .await;

            let config = Dsp2Config::new(username.to_string(), password.to_string())
                .base_url(server.uri());
            let result = Dsp2Client::connect(&config).await;
            assert!(matches!(result, Err(Dsp2Error::ConstructionError(_))));
        }
    }

    #[tokio::test]
    async fn test_failed_auth_retried_on_next_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_token(&server).await;
        mount_get(&server, "/stet/identity", identity_json()).await;

        let client = build_client(&config_for(&server)).unwrap();

        let first = client.get_identity().await;
        assert!(matches!(first, Err(Dsp2Error::AuthenticationError(_))));

        let second = client.get_identity().await.unwrap();
        assert_eq!(second.id, "user_xjRTE0pozug4jZ7RId2H8rWZ");
    }

    #[tokio::test]
    async fn test_token_requested_once_across_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": TOKEN })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/stet/identity"))
            .and(header("authorization", "Bearer token123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(identity_json()))
            .expect(6)
            .mount(&server)
            .await;

        let client = build_client(&config_for(&server)).unwrap();

        // Concurrent first use must still run a single grant.
        let results =
            futures_util::future::join_all((0..5).map(|_| client.get_identity())).await;
        assert!(results.iter().all(Result::is_ok));

        client.get_identity().await.unwrap();
    }
}

#[cfg(test)]
mod resource_tests {
    use super::*;

    async fn authenticated_server() -> MockServer {
        let server = MockServer::start().await;
        mount_token(&server).await;
        server
    }

    #[tokio::test]
    async fn test_get_accounts() {
        let server = authenticated_server().await;
        mount_get(
            &server,
            "/stet/account",
            json!([account_json(ACCOUNT_A, "fr7630006000011234567890189")]),
        )
        .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let accounts = client.get_accounts().await.unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, ACCOUNT_A);
        assert_eq!(accounts[0].account_type, AccountType::Cash);
        assert_eq!(accounts[0].iban, "FR7630006000011234567890189");
        assert_eq!(accounts[0].currency, "EUR");
    }

    #[tokio::test]
    async fn test_get_accounts_empty_list() {
        let server = authenticated_server().await;
        mount_get(&server, "/stet/account", json!([])).await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let accounts = client.get_accounts().await.unwrap();

        assert!(accounts.is_empty());
    }

    #[tokio::test]
    async fn test_get_account_by_id() {
        let server = authenticated_server().await;
        mount_get(
            &server,
            &format!("/stet/account/{}", ACCOUNT_B),
            account_json(ACCOUNT_B, "DE89370400440532013000"),
        )
        .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let account = client.get_account(ACCOUNT_B).await.unwrap();

        assert_eq!(account.id, ACCOUNT_B);
    }

    #[tokio::test]
    async fn test_get_failure_reports_path() {
        let server = authenticated_server().await;
        Mock::given(method("GET"))
            .and(path("/stet/account/acct_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let err = client.get_account("acct_missing").await.unwrap_err();

        match err {
            Dsp2Error::RequestError {
                method,
                path,
                cause: TransportError::Status { status, body },
            } => {
                assert_eq!(method, "GET");
                assert_eq!(path, "/stet/account/acct_missing");
                assert_eq!(status.as_u16(), 404);
                assert_eq!(body, "not found");
            }
            other => panic!("expected RequestError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_request_error() {
        let server = authenticated_server().await;
        Mock::given(method("GET"))
            .and(path("/stet/identity"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let err = client.get_identity().await.unwrap_err();

        assert!(matches!(
            err,
            Dsp2Error::RequestError { ref path, cause: TransportError::Json(_), .. }
                if path == "/stet/identity"
        ));
    }

    #[tokio::test]
    async fn test_get_balances() {
        let server = authenticated_server().await;
        mount_get(
            &server,
            &format!("/stet/account/{}/balance", ACCOUNT_A),
            json!([
                balance_json("blnc_Qw7bXkLm3Np9Rs2Tv5Yz8Ac1", 100_000),
                {
                    "id": "blnc_Zz7bXkLm3Np9Rs2Tv5Yz8Ac2",
                    "name": "Expected",
                    "amount": -2500,
                    "currency": null,
                    "type": "XPCD",
                },
            ]),
        )
        .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let balances = client.get_balances(ACCOUNT_A).await.unwrap();

        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].balance_type, BalanceType::ClosingBooked);
        assert_eq!(balances[1].amount, -2500);
        assert_eq!(balances[1].currency, None);
    }

    #[tokio::test]
    async fn test_get_transactions_passes_pagination() {
        let server = authenticated_server().await;
        Mock::given(method("GET"))
            .and(path(format!("/stet/account/{}/transaction", ACCOUNT_A)))
            .and(query_param("page", "3"))
            .and(query_param("count", "25"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                transaction_json("tran_Hj4Kl7Mn0Pq3Rs6Tu9Vw2Xy5", "Salary"),
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let transactions = client
            .get_transactions(ACCOUNT_A, TransactionQuery::new(3, 25))
            .await
            .unwrap();

        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Booked);
        assert_eq!(transactions[0].date_processed, None);
    }

    #[tokio::test]
    async fn test_default_transaction_query() {
        let server = authenticated_server().await;
        Mock::given(method("GET"))
            .and(path(format!("/stet/account/{}/transaction", ACCOUNT_A)))
            .and(query_param("page", "1"))
            .and(query_param("count", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let transactions = client
            .get_transactions(ACCOUNT_A, TransactionQuery::default())
            .await
            .unwrap();

        assert!(transactions.is_empty());
    }

    #[tokio::test]
    async fn test_one_bad_item_fails_whole_list() {
        let server = authenticated_server().await;
        mount_get(
            &server,
            "/stet/account",
            json!([
                account_json(ACCOUNT_A, "FR7630006000011234567890189"),
                account_json(ACCOUNT_B, "INVALID!IBAN!1234"),
            ]),
        )
        .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let err = client.get_accounts().await.unwrap_err();

        match err {
            Dsp2Error::ValidationError(validation) => {
                assert!(validation.mentions("[1].iban"), "{}", validation);
                assert!(!validation.mentions("[0].iban"));
            }
            other => panic!("expected ValidationError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_skip_invalid_policy_keeps_good_items() {
        let server = authenticated_server().await;
        mount_get(
            &server,
            "/stet/account",
            json!([
                account_json(ACCOUNT_A, "FR7630006000011234567890189"),
                account_json("acct_short", "FR7630006000011234567890189"),
            ]),
        )
        .await;

        let client = Dsp2Client::connect(&config_for(&server))
            .await
            .unwrap()
            .with_list_policy(ListPolicy::SkipInvalid);
        let accounts = client.get_accounts().await.unwrap();

        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].id, ACCOUNT_A);
    }

    #[tokio::test]
    async fn test_custom_endpoints() {
        let server = authenticated_server().await;
        mount_get(&server, "/v2/me", identity_json()).await;

        let mut config = config_for(&server);
        config.endpoints.identity = "/v2/me".to_string();

        let client = Dsp2Client::connect(&config).await.unwrap();
        assert!(client.get_identity().await.is_ok());
    }
}

#[cfg(test)]
mod aggregate_tests {
    use super::*;

    async fn mount_account_resources(server: &MockServer, account_id: &str, suffix: char) {
        let balance_id = format!("blnc_{}", suffix.to_string().repeat(24));
        let transaction_id = format!("tran_{}", suffix.to_string().repeat(24));

        mount_get(
            server,
            &format!("/stet/account/{}/balance", account_id),
            json!([balance_json(&balance_id, 4200)]),
        )
        .await;

        Mock::given(method("GET"))
            .and(path(format!("/stet/account/{}/transaction", account_id)))
            .and(query_param("page", "1"))
            .and(query_param("count", "5"))
            .and(header("authorization", "Bearer token123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                transaction_json(&transaction_id, &format!("Payment {}", suffix)),
            ])))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_full_user_data_nests_per_account() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_get(&server, "/stet/identity", identity_json()).await;
        mount_get(
            &server,
            "/stet/account",
            json!([
                account_json(ACCOUNT_A, "FR7630006000011234567890189"),
                account_json(ACCOUNT_B, "DE89370400440532013000"),
            ]),
        )
        .await;
        mount_account_resources(&server, ACCOUNT_A, 'a').await;
        mount_account_resources(&server, ACCOUNT_B, 'b').await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let data = client.get_full_user_data(5).await.unwrap();

        assert_eq!(data.identity.first_name, "Alice");
        assert_eq!(data.accounts.len(), 2);

        assert_eq!(data.accounts[0].account.id, ACCOUNT_A);
        assert_eq!(data.accounts[0].balances[0].id, format!("blnc_{}", "a".repeat(24)));
        assert_eq!(data.accounts[0].transactions[0].label, "Payment a");

        assert_eq!(data.accounts[1].account.id, ACCOUNT_B);
        assert_eq!(data.accounts[1].balances[0].id, format!("blnc_{}", "b".repeat(24)));
        assert_eq!(data.accounts[1].transactions[0].label, "Payment b");

        assert_eq!(get_requests(&server).await, 6);

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["accounts"][1]["iban"], "DE89370400440532013000");
        assert_eq!(json["accounts"][1]["transactions"][0]["crdt_dbit_indicator"], "CRDT");
    }

    #[tokio::test]
    async fn test_full_user_data_aborts_on_any_failure() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_get(&server, "/stet/identity", identity_json()).await;
        mount_get(
            &server,
            "/stet/account",
            json!([
                account_json(ACCOUNT_A, "FR7630006000011234567890189"),
                account_json(ACCOUNT_B, "DE89370400440532013000"),
            ]),
        )
        .await;
        // No call-count expectations on the sibling account: its requests may be
        // dropped before they are sent once the failure is seen.
        Mock::given(method("GET"))
            .and(path(format!("/stet/account/{}/balance", ACCOUNT_A)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/stet/account/{}/transaction", ACCOUNT_A)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/stet/account/{}/balance", ACCOUNT_B)))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/stet/account/{}/transaction", ACCOUNT_B)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let err = client.get_full_user_data(5).await.unwrap_err();

        assert!(matches!(
            err,
            Dsp2Error::RequestError { ref path, .. } if path == &format!("/stet/account/{}/balance", ACCOUNT_B)
        ));
    }

    #[tokio::test]
    async fn test_full_user_data_without_accounts() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        mount_get(&server, "/stet/identity", identity_json()).await;
        mount_get(&server, "/stet/account", json!([])).await;

        let client = Dsp2Client::connect(&config_for(&server)).await.unwrap();
        let data = client.get_full_user_data(10).await.unwrap();

        assert!(data.accounts.is_empty());
        assert_eq!(get_requests(&server).await, 2);
    }
}
