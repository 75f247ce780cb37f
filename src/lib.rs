pub mod broadcaster;
pub mod channels;
pub mod db;
pub mod engagement;
pub mod meetings;
pub mod models;
pub mod repos;
pub mod routes;
pub mod summary;
pub mod teams;
pub mod timeutil;
pub mod ws;

use channels::ChannelHub;
use db::Db;
use rocket_cors::CorsOptions;
use std::env;

/// Resolve the SQLite path from `DATABASE_URL` (optional `sqlite://` prefix).
fn database_path() -> String {
    env::var("DATABASE_URL")
        .map(|url| url.trim_start_matches("sqlite://").to_string())
        .unwrap_or_else(|_| "data/engagement.db".to_string())
}

pub fn rocket() -> rocket::Rocket<rocket::Build> {
    rocket_with_db(&database_path())
}

pub fn rocket_with_db(db_path: &str) -> rocket::Rocket<rocket::Build> {
    // Ensure data directory exists
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let db = Db::new(db_path);
    let hub = ChannelHub::new();

    let cors = CorsOptions::default()
        .to_cors()
        .expect("Failed to create CORS");

    let broadcaster_db_path = db_path.to_string();
    let broadcaster_hub = hub.clone();

    rocket::build()
        .manage(db)
        .manage(hub)
        .attach(cors)
        .register("/", rocket::catchers![routes::not_found])
        .mount(
            "/",
            rocket::routes![
                routes::health,
                routes::stats,
                routes::visit,
                routes::list_meetings,
                routes::get_meeting,
                routes::create_city,
                routes::list_cities,
                routes::create_meeting_room,
                routes::list_meeting_rooms,
                ws::meeting_stream,
            ],
        )
        .attach(rocket::fairing::AdHoc::on_liftoff(
            "Engagement Broadcaster",
            move |_rocket| {
                Box::pin(async move {
                    let interval = broadcaster::interval_from_env();
                    broadcaster::spawn_broadcast_task(
                        broadcaster_db_path,
                        broadcaster_hub,
                        interval,
                    );
                    println!("📣 Engagement broadcaster started (every {interval}s)");
                })
            },
        ))
}
