use crate::db::Db;
use crate::models::MeetingListResponse;
use crate::repos;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{State, get};

#[get("/meetings?<page>")]
pub fn list_meetings(
    db: &State<Db>,
    page: Option<i64>,
) -> Result<Json<MeetingListResponse>, (Status, Json<serde_json::Value>)> {
    let page = page.unwrap_or(1).max(1);
    let conn = db.conn();
    let (items, total) = crate::meetings::list_meetings(&conn, page).map_err(|e| {
        (
            Status::InternalServerError,
            Json(serde_json::json!({"error": e.to_string()})),
        )
    })?;
    Ok(Json(MeetingListResponse {
        items,
        total,
        page,
        page_size: repos::meetings::PAGE_SIZE,
    }))
}

#[get("/meetings/<meeting_id>")]
pub fn get_meeting(
    db: &State<Db>,
    meeting_id: &str,
) -> Result<Json<serde_json::Value>, (Status, Json<serde_json::Value>)> {
    let conn = db.conn();
    let internal = |e: rusqlite::Error| {
        (
            Status::InternalServerError,
            Json(serde_json::json!({"error": e.to_string()})),
        )
    };

    let Some(meeting) = repos::meetings::get_by_id(&conn, meeting_id).map_err(internal)? else {
        return Err((
            Status::NotFound,
            Json(serde_json::json!({"error": format!("Meeting '{meeting_id}' not found")})),
        ));
    };

    let participants =
        repos::participants::list_with_engagement(&conn, &meeting.id).map_err(internal)?;
    let (city_name, room_name) =
        repos::meetings::context_names(&conn, &meeting).map_err(internal)?;
    let summary = repos::summaries::get(&conn, &meeting.id).map_err(internal)?;

    let mut body = serde_json::json!({
        "meeting": meeting,
        "participants": participants,
    });
    if let Some(city) = city_name {
        body["city_name"] = serde_json::Value::String(city);
    }
    if let Some(room) = room_name {
        body["meeting_room_name"] = serde_json::Value::String(room);
    }
    if let Some(summary) = summary {
        body["summary"] = serde_json::to_value(summary).unwrap_or_default();
    }
    Ok(Json(body))
}
