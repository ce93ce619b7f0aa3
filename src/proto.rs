//! Wire protocol of the signaling websocket and the data model shared by
//! all of its frames.
//!
//! Every frame is one JSON object whose `type` field discriminates the
//! [`Envelope`] variant. Field names are part of the public contract and
//! must not change.

use std::fmt;

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// ID of a [`User`].
///
/// Opaque, globally unique, collision-resistant: 128 random bits encoded
/// as 32 lowercase hex characters.
#[derive(
    Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
pub struct UserId(pub String);

/// Single emoji, identified by its hex codepoint (e.g. `"1F600"`).
///
/// Equality is by `id`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Emoji {
    /// Hex codepoint string of this emoji.
    pub id: String,
}

impl fmt::Display for Emoji {
    /// Renders the actual character when `id` is a valid codepoint, and
    /// the raw hex string otherwise.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match u32::from_str_radix(&self.id, 16)
            .ok()
            .and_then(char::from_u32)
        {
            Some(c) => write!(f, "{}", c),
            None => write!(f, "{}", self.id),
        }
    }
}

/// One element of a room [`Code`].
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CodeEntry {
    /// Emoji shown on this entry.
    pub emoji: Emoji,
}

/// Public name of a room: an ordered sequence of emoji entries.
///
/// Two codes are equal iff their entry sequences are equal element-wise in
/// order, which is exactly what the derived `Hash`/`Eq` provide, so a
/// [`Code`] can key the room registry directly.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Code {
    /// Entries of this code, in order.
    pub entries: Vec<CodeEntry>,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            write!(f, "{}", entry.emoji)?;
        }
        Ok(())
    }
}

/// Emoji avatar assigned to a [`User`], unique within its room.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Avatar {
    /// Emoji of this avatar.
    pub emoji: Emoji,
}

/// Member of a room. Immutable after creation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct User {
    /// Unique ID of this user.
    pub id: UserId,

    /// Avatar assigned to this user by the room.
    pub avatar: Avatar,
}

/// Opaque container of an SDP blob.
///
/// The server never inspects or mutates the `description`; it is relayed
/// between peers as-is.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Session {
    /// SDP payload of this session.
    pub description: String,
}

/// Signaling frame exchanged over the `/connect` websocket.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Envelope {
    /// First frame of a connection: client asks to join the room named by
    /// `code`.
    ConnectRequest {
        /// Code of the room to join.
        code: Code,
    },

    /// Reply to [`Envelope::ConnectRequest`]: the newcomer's identity and
    /// the members that were present before them.
    ConnectResponse {
        /// Identity assigned to the newcomer.
        user: User,

        /// Members of the room at join time, newcomer excluded.
        other_users: Vec<User>,
    },

    /// Fanned out to every member except the newcomer when a user joins.
    Connected {
        /// The user that joined.
        user: User,
    },

    /// Fanned out to every remaining member when a user leaves.
    Disconnected {
        /// ID of the user that left.
        user: UserId,
    },

    /// SDP offer relayed from `from_user` to `to_user`.
    Offer {
        /// Sender of the offer. On ingress this field is ignored and
        /// rewritten to the authenticated user of the socket.
        from_user: UserId,

        /// Target of the offer.
        to_user: UserId,

        /// Opaque SDP blob.
        session: Session,
    },

    /// SDP answer relayed from `from_user` to `to_user`.
    Answer {
        /// Sender of the answer. Rewritten on ingress like
        /// [`Envelope::Offer::from_user`].
        from_user: UserId,

        /// Target of the answer.
        to_user: UserId,

        /// Opaque SDP blob.
        session: Session,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    fn code(ids: &[&str]) -> Code {
        Code {
            entries: ids
                .iter()
                .map(|id| CodeEntry {
                    emoji: Emoji { id: (*id).to_owned() },
                })
                .collect(),
        }
    }

    fn user(id: &str, emoji: &str) -> User {
        User {
            id: UserId(id.to_owned()),
            avatar: Avatar {
                emoji: Emoji { id: emoji.to_owned() },
            },
        }
    }

    #[test]
    fn connect_request() {
        let envelope = Envelope::ConnectRequest { code: code(&["1F600"]) };
        let envelope_str = "{\
            \"type\":\"connect-request\",\
            \"code\":{\"entries\":[{\"emoji\":{\"id\":\"1F600\"}}]}\
        }";

        assert_eq!(envelope_str, serde_json::to_string(&envelope).unwrap());
        assert_eq!(
            envelope,
            serde_json::from_str(envelope_str).unwrap(),
        );
    }

    #[test]
    fn connect_response() {
        let envelope = Envelope::ConnectResponse {
            user: user("00ff", "1F600"),
            other_users: vec![user("ff00", "1F601")],
        };
        let envelope_str = "{\
            \"type\":\"connect-response\",\
            \"user\":{\
                \"id\":\"00ff\",\
                \"avatar\":{\"emoji\":{\"id\":\"1F600\"}}\
            },\
            \"other_users\":[{\
                \"id\":\"ff00\",\
                \"avatar\":{\"emoji\":{\"id\":\"1F601\"}}\
            }]\
        }";

        assert_eq!(envelope_str, serde_json::to_string(&envelope).unwrap());
        assert_eq!(
            envelope,
            serde_json::from_str(envelope_str).unwrap(),
        );
    }

    #[test]
    fn connected() {
        let envelope = Envelope::Connected { user: user("00ff", "1F600") };
        let envelope_str = "{\
            \"type\":\"connected\",\
            \"user\":{\
                \"id\":\"00ff\",\
                \"avatar\":{\"emoji\":{\"id\":\"1F600\"}}\
            }\
        }";

        assert_eq!(envelope_str, serde_json::to_string(&envelope).unwrap());
        assert_eq!(
            envelope,
            serde_json::from_str(envelope_str).unwrap(),
        );
    }

    #[test]
    fn disconnected() {
        let envelope =
            Envelope::Disconnected { user: UserId("00ff".to_owned()) };
        let envelope_str =
            "{\"type\":\"disconnected\",\"user\":\"00ff\"}";

        assert_eq!(envelope_str, serde_json::to_string(&envelope).unwrap());
        assert_eq!(
            envelope,
            serde_json::from_str(envelope_str).unwrap(),
        );
    }

    #[test]
    fn offer_and_answer() {
        let envelope = Envelope::Offer {
            from_user: UserId("aa".to_owned()),
            to_user: UserId("bb".to_owned()),
            session: Session { description: "sdp-offer".to_owned() },
        };
        let envelope_str = "{\
            \"type\":\"offer\",\
            \"from_user\":\"aa\",\
            \"to_user\":\"bb\",\
            \"session\":{\"description\":\"sdp-offer\"}\
        }";

        assert_eq!(envelope_str, serde_json::to_string(&envelope).unwrap());
        assert_eq!(
            envelope,
            serde_json::from_str(envelope_str).unwrap(),
        );

        let envelope = Envelope::Answer {
            from_user: UserId("bb".to_owned()),
            to_user: UserId("aa".to_owned()),
            session: Session { description: "sdp-answer".to_owned() },
        };
        let envelope_str = "{\
            \"type\":\"answer\",\
            \"from_user\":\"bb\",\
            \"to_user\":\"aa\",\
            \"session\":{\"description\":\"sdp-answer\"}\
        }";

        assert_eq!(envelope_str, serde_json::to_string(&envelope).unwrap());
        assert_eq!(
            envelope,
            serde_json::from_str(envelope_str).unwrap(),
        );
    }

    #[test]
    fn unknown_type_is_rejected() {
        let raw = "{\"type\":\"press\",\"data\":{\"note\":60}}";

        assert!(serde_json::from_str::<Envelope>(raw).is_err());
    }

    #[test]
    fn codes_compare_element_wise() {
        assert_eq!(code(&["1F600", "1F601"]), code(&["1F600", "1F601"]));
        assert_ne!(code(&["1F600", "1F601"]), code(&["1F601", "1F600"]));
    }

    #[test]
    fn emoji_displays_as_character() {
        assert_eq!("\u{1F600}", Emoji { id: "1F600".to_owned() }.to_string());
        assert_eq!("bogus", Emoji { id: "bogus".to_owned() }.to_string());
    }
}
