use crate::common::test_client;
use rocket::http::{ContentType, Status};

#[test]
fn test_create_city() {
    let client = test_client();
    let res = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"Hamburg"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::Ok);
    let body: serde_json::Value = res.into_json().unwrap();
    assert_eq!(body["name"], "Hamburg");
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[test]
fn test_create_city_is_idempotent() {
    let client = test_client();
    let first: serde_json::Value = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"Hamburg"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    let second: serde_json::Value = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"Hamburg"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(first["id"], second["id"]);

    let cities: Vec<serde_json::Value> =
        client.get("/cities").dispatch().into_json().unwrap();
    assert_eq!(cities.len(), 1);
}

#[test]
fn test_create_city_empty_name_is_400() {
    let client = test_client();
    let res = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"   "}"#)
        .dispatch();
    assert_eq!(res.status(), Status::BadRequest);
}

#[test]
fn test_list_cities_sorted_by_name() {
    let client = test_client();
    for name in ["Oslo", "Berlin", "Madrid"] {
        client
            .post("/cities")
            .header(ContentType::JSON)
            .body(format!(r#"{{"name":"{name}"}}"#))
            .dispatch();
    }
    let cities: Vec<serde_json::Value> =
        client.get("/cities").dispatch().into_json().unwrap();
    let names: Vec<&str> = cities.iter().map(|c| c["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Berlin", "Madrid", "Oslo"]);
}

#[test]
fn test_create_room_requires_existing_city() {
    let client = test_client();
    let res = client
        .post("/meeting-rooms")
        .header(ContentType::JSON)
        .body(r#"{"name":"Aquarium","city_id":"nope"}"#)
        .dispatch();
    assert_eq!(res.status(), Status::NotFound);
}

#[test]
fn test_create_room_unique_per_city() {
    let client = test_client();
    let city: serde_json::Value = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"Hamburg"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    let city_id = city["id"].as_str().unwrap();

    let body = format!(r#"{{"name":"Aquarium","city_id":"{city_id}"}}"#);
    let first: serde_json::Value = client
        .post("/meeting-rooms")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch()
        .into_json()
        .unwrap();
    let second: serde_json::Value = client
        .post("/meeting-rooms")
        .header(ContentType::JSON)
        .body(&body)
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(first["id"], second["id"]);

    // Same room name in a different city is a separate room
    let other: serde_json::Value = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"Oslo"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    let third: serde_json::Value = client
        .post("/meeting-rooms")
        .header(ContentType::JSON)
        .body(format!(
            r#"{{"name":"Aquarium","city_id":"{}"}}"#,
            other["id"].as_str().unwrap()
        ))
        .dispatch()
        .into_json()
        .unwrap();
    assert_ne!(first["id"], third["id"]);
}

#[test]
fn test_list_rooms_filtered_by_city() {
    let client = test_client();
    let hamburg: serde_json::Value = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"Hamburg"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    let oslo: serde_json::Value = client
        .post("/cities")
        .header(ContentType::JSON)
        .body(r#"{"name":"Oslo"}"#)
        .dispatch()
        .into_json()
        .unwrap();
    for (name, city) in [("Aquarium", &hamburg), ("Bridge", &hamburg), ("Fjord", &oslo)] {
        client
            .post("/meeting-rooms")
            .header(ContentType::JSON)
            .body(format!(
                r#"{{"name":"{name}","city_id":"{}"}}"#,
                city["id"].as_str().unwrap()
            ))
            .dispatch();
    }

    let all: Vec<serde_json::Value> =
        client.get("/meeting-rooms").dispatch().into_json().unwrap();
    assert_eq!(all.len(), 3);

    let filtered: Vec<serde_json::Value> = client
        .get(format!(
            "/meeting-rooms?city_id={}",
            hamburg["id"].as_str().unwrap()
        ))
        .dispatch()
        .into_json()
        .unwrap();
    assert_eq!(filtered.len(), 2);
}
