//! End-to-end tests of `RequestAdapter` over `HyperClient`, using wiremock.

use assert2::{check, let_assert};
use grapnel::middleware::{FollowRedirectLayer, LoggingLayer, RedirectOptions};
use grapnel::url::Url;
use grapnel::{
    AccessTokenProvider, AnonymousAuthenticationProvider, ApiError, AuthContext,
    BearerTokenAuthenticationProvider, Error, ErrorMapping, HyperClient, Method, Parsable,
    ParseNode, RequestAdapter, RequestContent, RequestInformation, Result,
};
use serde::Serialize;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

const CHALLENGE: &str = r#"Bearer authorization_uri="https://login.example.com", error="insufficient_claims", claims="eyJhY2Nlc3NfdG9rZW4iOnt9fQ==""#;

#[derive(Debug, PartialEq, Eq)]
struct User {
    id: String,
    name: Option<String>,
}

impl Parsable for User {
    fn from_parse_node(node: &dyn ParseNode) -> Result<Self> {
        let id = node
            .child_string("id")?
            .ok_or_else(|| Error::deserialization(node.path(), "missing id"))?;
        Ok(Self {
            id,
            name: node.child_string("name")?,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
struct NotFound {
    resource: String,
}

#[derive(Debug, PartialEq, Eq)]
struct ServerError {
    code: String,
}

fn error_mapping() -> ErrorMapping {
    ErrorMapping::new()
        .with("404", |node: &dyn ParseNode| {
            let message = node.child_string("message")?.unwrap_or_default();
            let resource = node.child_string("resource")?.unwrap_or_default();
            Ok(ApiError::new(message).with_details(NotFound { resource }))
        })
        .with("4XX", |node: &dyn ParseNode| {
            Ok(ApiError::new(node.child_string("message")?.unwrap_or_default()))
        })
        .with("5XX", |node: &dyn ParseNode| {
            let code = node.child_string("code")?.unwrap_or_default();
            Ok(ApiError::new("server error").with_details(ServerError { code }))
        })
}

fn anonymous(server: &MockServer) -> RequestAdapter<AnonymousAuthenticationProvider, HyperClient> {
    RequestAdapter::builder(
        AnonymousAuthenticationProvider,
        HyperClient::builder().layer(LoggingLayer::debug()).build(),
    )
    .base_url(server.uri())
    .build()
}

fn get_user(id: &str) -> RequestInformation {
    let mut request = RequestInformation::new(Method::Get, "{+baseurl}/users/{id}");
    request.path_parameter("id", id);
    request
}

#[tokio::test]
async fn object_from_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"id":"1","name":"Alice"}"#,
            "application/json; charset=utf-8",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let user = anonymous(&server)
        .send_object(get_user("1"), User::from_parse_node, None, None)
        .await
        .expect("user");

    check!(
        user == Some(User {
            id: "1".to_string(),
            name: Some("Alice".to_string()),
        })
    );
}

#[tokio::test]
async fn collection_from_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"[{"id":"1"},{"id":"2"}]"#, "application/json"),
        )
        .mount(&server)
        .await;

    let request = RequestInformation::new(Method::Get, "{+baseurl}/users");
    let users = anonymous(&server)
        .send_collection(request, User::from_parse_node, None, None)
        .await
        .expect("users");

    let_assert!(Some(users) = users);
    let ids: Vec<_> = users.iter().map(|user| user.id.as_str()).collect();
    check!(ids == ["1", "2"]);
}

#[tokio::test]
async fn json_content_is_sent() {
    #[derive(Serialize)]
    struct NewUser<'a> {
        name: &'a str,
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({ "name": "Bob" })))
        .respond_with(
            ResponseTemplate::new(201).set_body_raw(r#"{"id":"7","name":"Bob"}"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut request = RequestInformation::new(Method::Post, "{+baseurl}/users");
    request
        .set_json_content(&NewUser { name: "Bob" })
        .expect("json content");
    let user = anonymous(&server)
        .send_object(request, User::from_parse_node, None, None)
        .await
        .expect("created");

    check!(user.map(|u| u.id) == Some("7".to_string()));
}

#[tokio::test]
async fn primitives_from_text_and_json() {
    let server = MockServer::start().await;
    Mock::given(path("/count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("42"))
        .mount(&server)
        .await;
    Mock::given(path("/tags"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"["a",null,"b"]"#, "application/json"),
        )
        .mount(&server)
        .await;

    let adapter = anonymous(&server);
    let count = adapter
        .send_primitive::<i64>(
            RequestInformation::new(Method::Get, "{+baseurl}/count"),
            None,
            None,
        )
        .await
        .expect("count");
    let tags = adapter
        .send_primitive_collection::<String>(
            RequestInformation::new(Method::Get, "{+baseurl}/tags"),
            None,
            None,
        )
        .await
        .expect("tags");

    check!(count == Some(42));
    check!(tags == Some(vec!["a".to_string(), "b".to_string()]));
}

#[tokio::test]
async fn no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let adapter = anonymous(&server);
    let mut delete = RequestInformation::new(Method::Delete, "{+baseurl}/users/{id}");
    delete.path_parameter("id", "1");
    adapter
        .send_no_content(delete, None, None)
        .await
        .expect("deleted");

    let mut delete = RequestInformation::new(Method::Delete, "{+baseurl}/users/{id}");
    delete.path_parameter("id", "1");
    let user = adapter
        .send_object(delete, User::from_parse_node, None, None)
        .await
        .expect("no content");
    check!(user == None);
}

#[tokio::test]
async fn raw_stream() {
    let server = MockServer::start().await;
    Mock::given(path("/files/report"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"binary-report".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let body = anonymous(&server)
        .send_stream(
            RequestInformation::new(Method::Get, "{+baseurl}/files/report"),
            None,
            None,
        )
        .await
        .expect("stream");

    let_assert!(Some(body) = body);
    let content = body.bytes().await.expect("content");
    check!(content.as_ref() == b"binary-report");
}

#[tokio::test]
async fn exact_code_mapping() {
    let server = MockServer::start().await;
    Mock::given(path("/users/9"))
        .respond_with(ResponseTemplate::new(404).set_body_raw(
            r#"{"message":"missing","resource":"users/9"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let err = anonymous(&server)
        .send_object(get_user("9"), User::from_parse_node, None, Some(&error_mapping()))
        .await
        .expect_err("not found");

    let_assert!(Some(api) = err.api_error());
    check!(api.message() == "missing");
    check!(api.status() == Some(404));
    check!(
        api.details::<NotFound>()
            == Some(&NotFound {
                resource: "users/9".to_string()
            })
    );
}

#[tokio::test]
async fn client_error_wildcard() {
    let server = MockServer::start().await;
    Mock::given(path("/users/1"))
        .respond_with(
            ResponseTemplate::new(409).set_body_raw(r#"{"message":"conflict"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let err = anonymous(&server)
        .send_object(get_user("1"), User::from_parse_node, None, Some(&error_mapping()))
        .await
        .expect_err("conflict");

    check!(err.is_client_error());
    let_assert!(Some(api) = err.api_error());
    check!(api.message() == "conflict");
    check!(api.details::<NotFound>() == None);
}

#[tokio::test]
async fn server_error_wildcard() {
    let server = MockServer::start().await;
    Mock::given(path("/users/1"))
        .respond_with(
            ResponseTemplate::new(503)
                .insert_header("retry-after", "5")
                .set_body_raw(r#"{"code":"busy"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let err = anonymous(&server)
        .send_object(get_user("1"), User::from_parse_node, None, Some(&error_mapping()))
        .await
        .expect_err("unavailable");

    check!(err.is_server_error());
    let_assert!(Some(api) = err.api_error());
    check!(api.details::<ServerError>().map(|e| e.code.as_str()) == Some("busy"));
    check!(api.headers().get("retry-after").is_some());
}

#[tokio::test]
async fn unmapped_status() {
    let server = MockServer::start().await;
    Mock::given(path("/users/1"))
        .respond_with(ResponseTemplate::new(418))
        .mount(&server)
        .await;

    let err = anonymous(&server)
        .send_object(get_user("1"), User::from_parse_node, None, None)
        .await
        .expect_err("teapot");

    let_assert!(Error::UnexpectedStatus { status: 418 } = err);
}

#[tokio::test]
async fn missing_content_type_is_a_payload_error() {
    let server = MockServer::start().await;
    Mock::given(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(br#"{"id":"1"}"#.to_vec()))
        .mount(&server)
        .await;

    let err = anonymous(&server)
        .send_object(get_user("1"), User::from_parse_node, None, None)
        .await
        .expect_err("no content type");

    let_assert!(Error::PayloadRead(cause) = err);
    let_assert!(Error::MissingContentType = *cause);
}

// ============================================================================
// Claims challenge
// ============================================================================

/// Hands out a stronger token once claims are requested.
struct ClaimsAwareTokens;

impl AccessTokenProvider for ClaimsAwareTokens {
    async fn get_authorization_token(&self, _uri: &Url, context: &AuthContext) -> Result<String> {
        Ok(match context.claims() {
            Some(_) => "strong".to_string(),
            None => "weak".to_string(),
        })
    }
}

fn bearer(
    server: &MockServer,
) -> RequestAdapter<BearerTokenAuthenticationProvider<ClaimsAwareTokens>, HyperClient> {
    RequestAdapter::builder(
        BearerTokenAuthenticationProvider::new(ClaimsAwareTokens),
        HyperClient::new(),
    )
    .base_url(server.uri())
    .build()
}

async fn mount_challenge(server: &MockServer, http_method: &str, expected_challenges: u64) {
    Mock::given(method(http_method))
        .and(header("authorization", "Bearer weak"))
        .respond_with(ResponseTemplate::new(401).insert_header("www-authenticate", CHALLENGE))
        .expect(expected_challenges)
        .mount(server)
        .await;
}

#[tokio::test]
async fn claims_challenge_is_answered_once() {
    let server = MockServer::start().await;
    mount_challenge(&server, "GET", 1).await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer strong"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"id":"1"}"#, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let user = bearer(&server)
        .send_object(get_user("1"), User::from_parse_node, None, None)
        .await
        .expect("user after claims");

    check!(user.map(|u| u.id) == Some("1".to_string()));
}

#[tokio::test]
async fn repeated_challenge_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).insert_header("www-authenticate", CHALLENGE))
        .expect(2)
        .mount(&server)
        .await;

    let err = bearer(&server)
        .send_object(get_user("1"), User::from_parse_node, None, None)
        .await
        .expect_err("still unauthorized");

    check!(err.status() == Some(401));
}

#[tokio::test]
async fn buffered_content_is_replayed() {
    let server = MockServer::start().await;
    mount_challenge(&server, "PUT", 1).await;
    Mock::given(method("PUT"))
        .and(header("authorization", "Bearer strong"))
        .and(body_json(serde_json::json!({ "name": "Carol" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut update = RequestInformation::new(Method::Put, "{+baseurl}/users/{id}");
    update.path_parameter("id", "3");
    update
        .set_json_content(&serde_json::json!({ "name": "Carol" }))
        .expect("json content");

    bearer(&server)
        .send_no_content(update, None, None)
        .await
        .expect("updated after claims");
}

#[tokio::test]
async fn streaming_content_is_not_replayed() {
    let server = MockServer::start().await;
    mount_challenge(&server, "POST", 1).await;

    let mut request = RequestInformation::new(Method::Post, "{+baseurl}/upload");
    request
        .set_content(
            RequestContent::streaming(futures_util::stream::iter(vec![Ok(
                bytes::Bytes::from_static(b"chunk"),
            )])),
            "application/octet-stream",
        )
        .expect("content");

    let err = bearer(&server)
        .send_no_content(request, None, None)
        .await
        .expect_err("unauthorized");

    check!(err.status() == Some(401));
}

// ============================================================================
// Redirects
// ============================================================================

fn following(
    server: &MockServer,
) -> RequestAdapter<BearerTokenAuthenticationProvider<ClaimsAwareTokens>, HyperClient> {
    RequestAdapter::builder(
        BearerTokenAuthenticationProvider::new(ClaimsAwareTokens),
        HyperClient::builder().layer(FollowRedirectLayer::new()).build(),
    )
    .base_url(server.uri())
    .build()
}

fn user_json(id: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(format!(r#"{{"id":"{id}"}}"#), "application/json")
}

#[tokio::test]
async fn same_host_redirect_keeps_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/v2/users/1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/users/1"))
        .and(header("authorization", "Bearer weak"))
        .respond_with(user_json("1"))
        .expect(1)
        .mount(&server)
        .await;

    let user = following(&server)
        .send_object(get_user("1"), User::from_parse_node, None, None)
        .await
        .expect("user after redirect");

    check!(user.map(|u| u.id) == Some("1".to_string()));
}

#[tokio::test]
async fn cross_host_redirect_drops_authorization() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{}/mirror/users/1", other.uri())),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mirror/users/1"))
        .respond_with(user_json("1"))
        .expect(1)
        .mount(&other)
        .await;

    let user = following(&server)
        .send_object(get_user("1"), User::from_parse_node, None, None)
        .await
        .expect("user after redirect");
    check!(user.map(|u| u.id) == Some("1".to_string()));

    let_assert!(Some(received) = other.received_requests().await);
    let_assert!([redirected] = received.as_slice());
    check!(redirected.headers.get("authorization").is_none());
}

#[tokio::test]
async fn see_other_turns_into_get() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(303).insert_header("location", "/users/7"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/7"))
        .respond_with(user_json("7"))
        .expect(1)
        .mount(&server)
        .await;

    let mut request = RequestInformation::new(Method::Post, "{+baseurl}/users");
    request
        .set_json_content(&serde_json::json!({ "name": "Dan" }))
        .expect("json content");
    let user = following(&server)
        .send_object(request, User::from_parse_node, None, None)
        .await
        .expect("created user");

    check!(user.map(|u| u.id) == Some("7".to_string()));
}

#[tokio::test]
async fn redirect_option_limits_hops() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/old/users/1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/old/users/1"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new/users/1"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new/users/1"))
        .respond_with(user_json("1"))
        .expect(0)
        .mount(&server)
        .await;

    let mut request = get_user("1");
    request.add_option(RedirectOptions::with_max_redirects(1));
    let err = following(&server)
        .send_object(request, User::from_parse_node, None, None)
        .await
        .expect_err("limit reached");
    check!(err.status() == Some(301));

    let mut request = get_user("1");
    request.add_option(RedirectOptions::disabled());
    let err = following(&server)
        .send_object(request, User::from_parse_node, None, None)
        .await
        .expect_err("not followed");
    check!(err.status() == Some(301));
}
