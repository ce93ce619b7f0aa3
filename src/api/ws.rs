//! `WS /connect`: per-socket signaling session.
//!
//! One [`WsSession`] actor runs per accepted socket. Its first text frame
//! must be a `connect-request`; afterwards two pumps run until either side
//! goes away: the room's fetch stream is forwarded to the socket, and
//! inbound frames are parsed and relayed through the room.

use std::sync::Arc;

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web::{
    web::{Data, Payload},
    Error, HttpRequest, HttpResponse,
};
use actix_web_actors::ws;

use crate::{
    api::AppContext,
    prelude::*,
    proto::{Envelope, User},
    signalling::{Room, RoomError, RoomRepository},
};

/// Handles HTTP upgrade request trying to perform handshake and establish
/// [WebSocket] connection.
///
/// # Errors
///
/// Errors if handshake fails for any underlying reason.
///
/// [WebSocket]: https://en.wikipedia.org/wiki/WebSocket
#[allow(clippy::unused_async)]
pub async fn create_ws(
    request: HttpRequest,
    state: Data<AppContext>,
    payload: Payload,
) -> Result<HttpResponse, Error> {
    ws::start(WsSession::new(state.rooms.clone()), &request, payload)
}

/// Progress of a [`WsSession`] through its protocol.
enum State {
    /// Socket is accepted; the `connect-request` frame hasn't arrived yet.
    AwaitingHandshake,

    /// Handshake succeeded; the peer is a member of `room`.
    Open { user: User, room: Arc<Room> },
}

/// [WebSocket] connection of one signaling peer.
///
/// [WebSocket]: https://en.wikipedia.org/wiki/WebSocket
pub struct WsSession {
    /// Registry the handshake resolves room codes against.
    rooms: RoomRepository,

    /// Protocol state of this socket.
    state: State,
}

impl WsSession {
    fn new(rooms: RoomRepository) -> Self {
        Self { rooms, state: State::AwaitingHandshake }
    }

    /// Performs the connect handshake on the first text frame.
    ///
    /// A frame that isn't a well-formed `connect-request` closes the
    /// socket, as does an exhausted avatar pool (without any response
    /// frame). On success the `connect-response` goes out first and then
    /// the room's fetch stream is attached as the outbound pump.
    fn handshake(&mut self, raw: &str, ctx: &mut <Self as Actor>::Context) {
        let code = match serde_json::from_str::<Envelope>(raw) {
            Ok(Envelope::ConnectRequest { code }) => code,
            _ => {
                debug!("Malformed handshake frame, closing the socket");
                ctx.stop();
                return;
            }
        };
        let room = self.rooms.get_room(&code);
        let (user, other_users) = match room.connect() {
            Ok(admitted) => admitted,
            Err(RoomError::NotEnoughResources) => {
                info!(
                    "[room {}] out of avatars, rejecting the connection",
                    room.code(),
                );
                ctx.close(None);
                ctx.stop();
                return;
            }
            Err(err) => {
                error!("[room {}] handshake failed: {}", room.code(), err);
                ctx.close(None);
                ctx.stop();
                return;
            }
        };
        match room.fetch(&user.id) {
            Ok(outbound) => {
                ctx.text(
                    serde_json::to_string(&Envelope::ConnectResponse {
                        user: user.clone(),
                        other_users,
                    })
                    .unwrap(),
                );
                ctx.add_stream(outbound);
                self.state = State::Open { user, room };
            }
            Err(err) => {
                error!("[room {}] {}", room.code(), err);
                room.disconnect(&user.id);
                ctx.close(None);
                ctx.stop();
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, _: &mut Self::Context) {
        debug!("Signaling socket accepted");
    }

    /// Leaves the room on the way out. `disconnect` is idempotent, so it
    /// doesn't matter which teardown path got here first.
    fn stopped(&mut self, _: &mut Self::Context) {
        if let State::Open { user, room } = &self.state {
            room.disconnect(&user.id);
        }
    }
}

/// Outbound pump: envelopes fetched from the user's room queue.
impl StreamHandler<Envelope> for WsSession {
    fn handle(&mut self, envelope: Envelope, ctx: &mut Self::Context) {
        ctx.text(serde_json::to_string(&envelope).unwrap());
    }

    /// The queue delivered its end-of-stream sentinel (or the user was
    /// removed), so this socket has nothing left to say.
    fn finished(&mut self, ctx: &mut Self::Context) {
        ctx.close(None);
        ctx.stop();
    }
}

/// Inbound pump: frames received from the peer.
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(
        &mut self,
        msg: Result<ws::Message, ws::ProtocolError>,
        ctx: &mut Self::Context,
    ) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(err) => {
                debug!("WS protocol error: {}", err);
                ctx.stop();
                return;
            }
        };
        match msg {
            ws::Message::Text(text) => match &self.state {
                State::AwaitingHandshake => self.handshake(&text, ctx),
                State::Open { user, room } => {
                    // The payload's `from_user` is ignored: the sender is
                    // always the authenticated user of this socket.
                    let relayed = match serde_json::from_str::<Envelope>(&text)
                    {
                        Ok(Envelope::Offer { to_user, session, .. }) => {
                            room.make_offer(&user.id, &to_user, session)
                        }
                        Ok(Envelope::Answer { to_user, session, .. }) => {
                            room.make_answer(&user.id, &to_user, session)
                        }
                        _ => Ok(()),
                    };
                    if let Err(err) = relayed {
                        info!(
                            "[room {}] dropped a signaling frame: {}",
                            room.code(),
                            err,
                        );
                    }
                }
            },
            ws::Message::Ping(ping) => {
                ctx.pong(&ping);
            }
            ws::Message::Pong(_) => {}
            ws::Message::Close(reason) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => debug!("Unsupported client message: {:?}", msg),
        }
    }
}
