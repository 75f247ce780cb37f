use crate::models::{City, MeetingRoom};
use crate::timeutil::isoformat_utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

fn city_from_row(row: &Row<'_>) -> rusqlite::Result<City> {
    Ok(City {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn room_from_row(row: &Row<'_>) -> rusqlite::Result<MeetingRoom> {
    Ok(MeetingRoom {
        id: row.get(0)?,
        name: row.get(1)?,
        city_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn get_city(conn: &Connection, city_id: &str) -> rusqlite::Result<Option<City>> {
    conn.query_row(
        "SELECT id, name, created_at FROM cities WHERE id = ?1",
        params![city_id],
        city_from_row,
    )
    .optional()
}

/// Idempotent create: an existing city with the same name is returned as-is.
pub fn get_or_create_city(conn: &Connection, name: &str) -> rusqlite::Result<City> {
    if let Some(existing) = conn
        .query_row(
            "SELECT id, name, created_at FROM cities WHERE name = ?1",
            params![name],
            city_from_row,
        )
        .optional()?
    {
        return Ok(existing);
    }
    let city = City {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        created_at: isoformat_utc(chrono::Utc::now()),
    };
    conn.execute(
        "INSERT INTO cities (id, name, created_at) VALUES (?1, ?2, ?3)",
        params![&city.id, &city.name, &city.created_at],
    )?;
    Ok(city)
}

pub fn list_cities(conn: &Connection) -> rusqlite::Result<Vec<City>> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM cities ORDER BY name")?;
    let cities = stmt
        .query_map([], city_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cities)
}

pub fn get_room(conn: &Connection, room_id: &str) -> rusqlite::Result<Option<MeetingRoom>> {
    conn.query_row(
        "SELECT id, name, city_id, created_at FROM meeting_rooms WHERE id = ?1",
        params![room_id],
        room_from_row,
    )
    .optional()
}

/// Idempotent on `(name, city_id)`.
pub fn get_or_create_room(
    conn: &Connection,
    name: &str,
    city_id: &str,
) -> rusqlite::Result<MeetingRoom> {
    if let Some(existing) = conn
        .query_row(
            "SELECT id, name, city_id, created_at FROM meeting_rooms
             WHERE name = ?1 AND city_id = ?2",
            params![name, city_id],
            room_from_row,
        )
        .optional()?
    {
        return Ok(existing);
    }
    let room = MeetingRoom {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        city_id: city_id.to_string(),
        created_at: isoformat_utc(chrono::Utc::now()),
    };
    conn.execute(
        "INSERT INTO meeting_rooms (id, name, city_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![&room.id, &room.name, &room.city_id, &room.created_at],
    )?;
    Ok(room)
}

pub fn list_rooms(conn: &Connection, city_id: Option<&str>) -> rusqlite::Result<Vec<MeetingRoom>> {
    let mut rooms = Vec::new();
    match city_id {
        Some(city) => {
            let mut stmt = conn.prepare(
                "SELECT id, name, city_id, created_at FROM meeting_rooms
                 WHERE city_id = ?1 ORDER BY name",
            )?;
            for room in stmt.query_map(params![city], room_from_row)? {
                rooms.push(room?);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT id, name, city_id, created_at FROM meeting_rooms ORDER BY name",
            )?;
            for room in stmt.query_map([], room_from_row)? {
                rooms.push(room?);
            }
        }
    }
    Ok(rooms)
}
