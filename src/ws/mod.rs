//! WebSocket endpoint and connection lifecycle.
//!
//! Each connection runs one cooperative loop multiplexing three concerns:
//! inbound client frames (routed to the message services), the meeting's
//! pub/sub channel (fanned out to the socket), and the meeting-end timer
//! (first connection to fire persists the summary and broadcasts the
//! terminal `meeting_ended`). Disconnecting runs the leave service and
//! releases the channel subscription.

pub mod protocol;
pub mod services;

use crate::channels::ChannelHub;
use crate::db::Db;
use crate::repos;
use crate::summary;
use chrono::Utc;
use rocket::futures::{SinkExt, StreamExt};
use rocket::{State, get};
use rocket_ws as ws;
use services::WsContext;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Duration, Instant, sleep_until};

/// Grace period between broadcasting `meeting_ended` and closing sockets, so
/// the terminal message drains to every subscriber first.
const END_DRAIN_MS: u64 = 200;

fn close_frame(code: u16, reason: &'static str) -> ws::Message {
    ws::Message::Close(Some(ws::frame::CloseFrame {
        code: code.into(),
        reason: reason.into(),
    }))
}

#[get("/ws/meetings/<meeting_id>")]
pub fn meeting_stream(
    ws: ws::WebSocket,
    meeting_id: String,
    db: &State<Db>,
    hub: &State<ChannelHub>,
) -> ws::Channel<'static> {
    let db = db.inner().clone();
    let hub = hub.inner().clone();

    ws.channel(move |mut stream| {
        Box::pin(async move {
            // 1. Load the meeting; unknown ids close with 4404
            let meeting = repos::meetings::get_by_id(&db.conn(), &meeting_id).unwrap_or(None);
            let Some(meeting) = meeting else {
                let _ = stream
                    .send(ws::Message::Text(protocol::error_message(
                        "Meeting not found",
                    )))
                    .await;
                let _ = stream.send(close_frame(4404, "Meeting not found")).await;
                return Ok(());
            };

            // 2. Timing check
            let now = Utc::now();
            if meeting.has_ended(now) {
                let payload = summary::ended_payload_for_reconnect(&db.conn(), &meeting)
                    .unwrap_or_else(|_| {
                        protocol::meeting_ended(crate::timeutil::isoformat_utc(meeting.end_ts))
                    });
                let _ = stream.send(ws::Message::Text(payload)).await;
                let _ = stream.send(close_frame(1000, "Meeting ended")).await;
                return Ok(());
            }
            if !meeting.has_started(now) {
                let (city, room) = repos::meetings::context_names(&db.conn(), &meeting)
                    .unwrap_or((None, None));
                let countdown = protocol::meeting_countdown(&meeting, now, city, room);
                let _ = stream.send(ws::Message::Text(countdown)).await;
                // Connection stays open; the broadcaster announces the start
            }

            // 3. Subscribe to the meeting channel and arm the end watcher
            let mut channel_rx = hub.subscribe(&meeting.id);
            let remaining = (meeting.end_ts - now).num_milliseconds().max(0) as u64;
            let end_timer = sleep_until(Instant::now() + Duration::from_millis(remaining));
            tokio::pin!(end_timer);
            let mut ended = false;

            let mut ctx = WsContext::new(meeting);

            // 4. Cooperative receive/fan-out/watch loop
            loop {
                tokio::select! {
                    frame = stream.next() => {
                        match frame {
                            Some(Ok(ws::Message::Text(text))) => {
                                if let Some(reply) = services::route_text(&text, &db, &hub, &mut ctx) {
                                    if stream.send(ws::Message::Text(reply)).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Some(Ok(ws::Message::Close(_))) | None => break,
                            Some(Ok(_)) => {} // binary/ping/pong frames are ignored
                            Some(Err(_)) => break,
                        }
                    }
                    published = channel_rx.recv() => {
                        match published {
                            Ok(payload) => {
                                if stream.send(ws::Message::Text(payload)).await.is_err() {
                                    break;
                                }
                            }
                            Err(RecvError::Lagged(missed)) => {
                                eprintln!(
                                    "⚠️ Slow subscriber on meeting {}: dropped {missed} messages",
                                    ctx.meeting.id
                                );
                            }
                            Err(RecvError::Closed) => break,
                        }
                    }
                    () = &mut end_timer => {
                        if !ended {
                            ended = true;
                            // First watcher to fire computes and persists the
                            // summary; the rest reuse the stored row.
                            match summary::finalize_meeting(&db.conn(), &ctx.meeting) {
                                Ok(payload) => hub.publish(&ctx.meeting.id, payload),
                                Err(e) => eprintln!(
                                    "⚠️ Summary for meeting {} failed: {e}",
                                    ctx.meeting.id
                                ),
                            }
                            // Let the broadcast drain before closing
                            end_timer
                                .as_mut()
                                .reset(Instant::now() + Duration::from_millis(END_DRAIN_MS));
                        } else {
                            let _ = stream.send(close_frame(1000, "Meeting ended")).await;
                            break;
                        }
                    }
                }
            }

            // 5. Cleanup: leave service + subscription release
            services::handle_leave(&db, &hub, &ctx);
            drop(channel_rx);
            hub.prune(&ctx.meeting.id);
            Ok(())
        })
    })
}
