//! End-to-end: REST surface -> aggregation -> bus -> embedded responders.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use kennel_core::{Owner, PageRequest, Pet, PetColor};
use kennel_gateway::{
    EmbeddedServices, Gateway, GatewayConfig, HttpConfig, HttpModule, InMemoryBus, MessageBus,
    RemoteError,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct Stack {
    gateway: Gateway,
    services: EmbeddedServices,
    router: Router,
}

async fn stack() -> Stack {
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
    let config = GatewayConfig::default();
    let services = EmbeddedServices::start(Arc::clone(&bus), &config.owner, &config.pet)
        .await
        .unwrap();
    let gateway = Gateway::builder(bus)
        .config(config)
        .request_timeout(Duration::from_secs(5))
        .start()
        .await
        .unwrap();
    let router = HttpModule::new(HttpConfig::default(), gateway.service()).build_router();
    Stack {
        gateway,
        services,
        router,
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn owners_and_pets_round_trip_through_http() {
    let Stack {
        mut gateway,
        mut services,
        router,
    } = stack().await;

    let (status, owner) = send(
        &router,
        Method::POST,
        "/api/owners",
        Some(json!({"name": "Ann", "birthDate": "1980-01-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let owner_id = owner["id"].as_i64().unwrap();

    let (status, pet) = send(
        &router,
        Method::POST,
        "/api/pets",
        Some(json!({
            "name": "Rex",
            "birthDate": "2020-01-01",
            "breed": "beagle",
            "color": "BROWN",
            "tailLength": 12.5,
            "ownerId": owner_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pet["owner"]["name"], "Ann");
    let pet_id = pet["id"].as_i64().unwrap();

    let (status, joined) = send(&router, Method::GET, "/api/owners?page=0&size=10", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["totalElements"], 1);
    assert_eq!(joined["items"][0]["pets"][0]["id"], pet_id);

    let (status, pet) = send(&router, Method::GET, &format!("/api/pets/{pet_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pet["owner"]["id"], owner_id);

    let (status, _) = send(&router, Method::DELETE, &format!("/api/owners/{owner_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(services.owners.store().is_empty());
    assert!(services.pets.store().is_empty());

    let (status, body) = send(&router, Method::GET, &format!("/api/pets/{pet_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");

    assert_eq!(gateway.pending_requests(), 0);
    gateway.shutdown().await;
    services.stop().await;
}

#[tokio::test]
async fn pet_for_unknown_owner_is_rejected_before_create() {
    let stack = stack().await;

    let (status, body) = send(
        &stack.router,
        Method::POST,
        "/api/pets",
        Some(json!({"name": "Rex", "birthDate": "2020-01-01", "ownerId": 77})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Owner with id 77 not found");
    assert!(stack.services.pets.store().is_empty());
}

#[tokio::test]
async fn concurrent_service_calls_resolve_independently() {
    let stack = stack().await;
    let service = stack.gateway.service();

    let mut input = Owner::new("Bob", date(1975, 6, 1));
    input.pets = (0..5)
        .map(|i| {
            let mut pet = Pet::new(format!("pet-{i}"), date(2019, 1, 1));
            pet.color = Some(PetColor::White);
            pet
        })
        .collect();
    let created = service.create_owner_with_pets(input).await.unwrap();
    let owner_id = created.owner.id.unwrap();
    assert_eq!(created.pets.len(), 5);

    let calls: Vec<_> = (0..20)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.owner_with_pets(owner_id).await })
        })
        .collect();
    for call in calls {
        let view = call.await.unwrap().unwrap();
        assert_eq!(view.pets.len(), 5);
    }

    let page = service
        .pets_with_owners(&PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages, 3);
    assert!(page.items.iter().all(|p| p.owner.as_ref().and_then(|o| o.id) == Some(owner_id)));

    let err = service.owner_with_pets(owner_id + 100).await.unwrap_err();
    assert!(matches!(err, RemoteError::NotFound { .. }));
    assert_eq!(stack.gateway.pending_requests(), 0);
}
