use crate::db::Db;
use crate::models::{City, CreateCity, CreateMeetingRoom, MeetingRoom};
use crate::repos::locations;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get, post};

type RouteError = (Status, Json<serde_json::Value>);

fn internal(e: rusqlite::Error) -> RouteError {
    (
        Status::InternalServerError,
        Json(serde_json::json!({"error": e.to_string()})),
    )
}

#[post("/cities", format = "json", data = "<body>")]
pub fn create_city(db: &State<Db>, body: Json<CreateCity>) -> Result<Json<City>, RouteError> {
    let name = body.name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err((
            Status::BadRequest,
            Json(serde_json::json!({"error": "City name must be 1-100 characters"})),
        ));
    }
    let conn = db.conn();
    let city = locations::get_or_create_city(&conn, name).map_err(internal)?;
    Ok(Json(city))
}

#[get("/cities")]
pub fn list_cities(db: &State<Db>) -> Result<Json<Vec<City>>, RouteError> {
    let conn = db.conn();
    let cities = locations::list_cities(&conn).map_err(internal)?;
    Ok(Json(cities))
}

#[post("/meeting-rooms", format = "json", data = "<body>")]
pub fn create_meeting_room(
    db: &State<Db>,
    body: Json<CreateMeetingRoom>,
) -> Result<Json<MeetingRoom>, RouteError> {
    let name = body.name.trim();
    if name.is_empty() || name.len() > 100 {
        return Err((
            Status::BadRequest,
            Json(serde_json::json!({"error": "Room name must be 1-100 characters"})),
        ));
    }
    let conn = db.conn();
    if locations::get_city(&conn, &body.city_id)
        .map_err(internal)?
        .is_none()
    {
        return Err((
            Status::NotFound,
            Json(serde_json::json!({"error": format!("City '{}' not found", body.city_id)})),
        ));
    }
    let room = locations::get_or_create_room(&conn, name, &body.city_id).map_err(internal)?;
    Ok(Json(room))
}

#[get("/meeting-rooms?<city_id>")]
pub fn list_meeting_rooms(
    db: &State<Db>,
    city_id: Option<&str>,
) -> Result<Json<Vec<MeetingRoom>>, RouteError> {
    let conn = db.conn();
    let rooms = locations::list_rooms(&conn, city_id).map_err(internal)?;
    Ok(Json(rooms))
}
