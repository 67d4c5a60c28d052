use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_flaky, Contact};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- list ---

#[tokio::test]
async fn list_contacts_empty_envelope() {
    let resp = app().oneshot(get_request("/contacts")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["results"], serde_json::json!([]));
    assert_eq!(envelope["next"], Value::Null);
    assert_eq!(envelope["count"], 0);
}

// --- create ---

#[tokio::test]
async fn create_contact_returns_201() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/contacts",
            r#"{"name":"Ada","email":"ada@example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let contact: Contact = body_json(resp).await;
    assert_eq!(contact.id, 1);
    assert_eq!(contact.name, "Ada");
    assert!(contact.active);
}

#[tokio::test]
async fn create_contact_without_name_returns_422_with_field_errors() {
    let resp = app()
        .oneshot(json_request("POST", "/contacts", r#"{"email":"x@y.z"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["errors"]["name"][0], "must not be empty");
}

// --- get ---

#[tokio::test]
async fn get_contact_not_found() {
    let resp = app().oneshot(get_request("/contacts/999")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- flaky ---

#[tokio::test]
async fn flaky_route_fails_then_recovers() {
    use tower::Service;

    let mut app = app_with_flaky(2).into_service();

    for _ in 0..2 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(get_request("/flaky/contacts"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/flaky/contacts"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/contacts",
            r#"{"name":"Grace","age":45}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Contact = body_json(resp).await;
    let id = created.id;

    // list carries the envelope with one record
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/contacts"))
        .await
        .unwrap();
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["count"], 1);
    assert_eq!(envelope["results"][0]["name"], "Grace");

    // patch merges and null clears
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PATCH",
            &format!("/contacts/{id}"),
            r#"{"email":"grace@example.com"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let patched: Contact = body_json(resp).await;
    assert_eq!(patched.email.as_deref(), Some("grace@example.com"));
    assert_eq!(patched.age, Some(45));

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PATCH",
            &format!("/contacts/{id}"),
            r#"{"email":null}"#,
        ))
        .await
        .unwrap();
    let cleared: Contact = body_json(resp).await;
    assert!(cleared.email.is_none());
    assert_eq!(cleared.age, Some(45));

    // replace resets omitted optionals
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/contacts/{id}"),
            r#"{"name":"Grace Hopper"}"#,
        ))
        .await
        .unwrap();
    let replaced: Contact = body_json(resp).await;
    assert_eq!(replaced.name, "Grace Hopper");
    assert!(replaced.age.is_none());

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(&format!("/contacts/{id}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // gone
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request(&format!("/contacts/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- pagination ---

#[tokio::test]
async fn list_paginates_with_next_link() {
    use tower::Service;

    let mut app = app().into_service();

    for i in 0..5 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request(
                "POST",
                "/contacts",
                &format!(r#"{{"name":"c{i}"}}"#),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/contacts?limit=2"))
        .await
        .unwrap();
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["results"].as_array().unwrap().len(), 2);
    assert_eq!(envelope["count"], 5);
    assert_eq!(envelope["next"], "/contacts?offset=2&limit=2");

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/contacts?offset=4&limit=2"))
        .await
        .unwrap();
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["results"].as_array().unwrap().len(), 1);
    assert_eq!(envelope["next"], Value::Null);
}

// --- bulk delete ---

#[tokio::test]
async fn bulk_delete_by_id_set() {
    use tower::Service;

    let mut app = app().into_service();

    for name in ["a", "b", "c"] {
        ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request(
                "POST",
                "/contacts",
                &format!(r#"{{"name":"{name}"}}"#),
            ))
            .await
            .unwrap();
    }

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("DELETE")
                .uri("/contacts?id__in=1%2C3")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/contacts"))
        .await
        .unwrap();
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["count"], 1);
    assert_eq!(envelope["results"][0]["name"], "b");
}
