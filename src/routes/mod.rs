// Route module decomposition — each domain area in its own file.
// Route functions live in submodules; catchers are shared here.

mod locations;
mod meetings;
mod system;
mod visits;

pub use locations::{create_city, create_meeting_room, list_cities, list_meeting_rooms};
pub use meetings::{get_meeting, list_meetings};
pub use system::{health, stats};
pub use visits::visit;

use rocket::serde::json::Json;

#[rocket::catch(404)]
pub fn not_found() -> Json<serde_json::Value> {
    Json(serde_json::json!({"error": "Not found"}))
}
