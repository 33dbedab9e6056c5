use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use apiloom_client::{
    connection_from_slice, ApiConfig, ConnectionArgs, Endpoint, HttpApi, Resource,
};
use apiloom_http::ReqwestTransport;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
struct Salad {
    spicy: bool,
}

fn salads(server: &MockServer) -> Resource {
    let api = HttpApi::with_transport(
        ApiConfig::new(server.uri(), "/v1"),
        ReqwestTransport::with_default_timeout().unwrap(),
    );
    Resource::new(api, "salads")
}

#[tokio::test]
async fn test_function_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/bowls/7/salad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"spicy": false}})))
        .expect(1)
        .mount(&server)
        .await;

    let api = salads(&server).api().clone();
    let resource = Resource::new(
        api,
        Endpoint::dynamic(|id| format!("bowls/{}/salad", id.unwrap_or("0"))),
    );

    let salad: Salad = resource.get_as(Some("7")).await.unwrap();
    assert_eq!(salad, Salad { spicy: false });
}

#[tokio::test]
async fn test_get() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/salads/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"spicy": true}})))
        .expect(1)
        .mount(&server)
        .await;

    let resource = salads(&server);
    assert_eq!(resource.get(Some("5")).await.unwrap(), json!({"spicy": true}));
    // Served from the session cache.
    assert_eq!(resource.get(Some("5")).await.unwrap(), json!({"spicy": true}));
}

#[tokio::test]
async fn test_get_list_connection() {
    let server = MockServer::start().await;
    let data = json!([{"spicy": true}, {"spicy": true}, {"spicy": true}]);

    Mock::given(method("GET"))
        .and(path("/v1/salads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": data})))
        .expect(1)
        .mount(&server)
        .await;

    let resource = salads(&server);
    let list = resource.get(None).await.unwrap();
    assert_eq!(list, data);

    let connection = resource.connection(ConnectionArgs::first(2)).await.unwrap();
    let items: Vec<Value> = serde_json::from_value(data).unwrap();
    assert_eq!(connection, connection_from_slice(&items, &ConnectionArgs::first(2)));
    assert!(connection.page_info.has_next_page);
}

#[tokio::test]
async fn test_create_update_set() {
    let server = MockServer::start().await;
    let salad = Salad { spicy: true };

    Mock::given(method("POST"))
        .and(path("/v1/salads"))
        .and(body_json(&salad))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": salad})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/v1/salads/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": salad})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/v1/salads/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": salad})))
        .expect(1)
        .mount(&server)
        .await;

    let resource = salads(&server);
    let expected = json!({"spicy": true});

    assert_eq!(resource.create(&salad).await.unwrap(), expected);
    assert_eq!(resource.update("5", &salad).await.unwrap(), expected);
    assert_eq!(resource.set("5", &salad).await.unwrap(), expected);
}

#[tokio::test]
async fn test_delete() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/salads/5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let resource = salads(&server);
    assert_eq!(resource.delete("5").await.unwrap(), Value::Null);
}

#[tokio::test]
async fn test_write_errors_carry_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/salads"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({"errors": ["spicy is required"]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resource = salads(&server);
    let err = resource.create(&json!({})).await.unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert!(err.to_string().contains("spicy is required"));
}

#[tokio::test]
async fn test_resource_loader() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/salads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"bowlId": 1, "spicy": true}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let loader = salads(&server).create_arg_loader("bowlId");
    let salads_in_bowl = loader.load("1").await.unwrap().unwrap();
    assert_eq!(salads_in_bowl.len(), 1);
    assert_eq!(loader.resource_path(), "salads");
}
