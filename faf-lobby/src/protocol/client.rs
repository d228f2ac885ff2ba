//! 客户端发给服务器的消息

use std::fmt;

use serde::{Deserialize, Serialize};

pub use game::*;
pub use login::*;

use super::codec::{self, Empty, Error};

pub mod game;
pub mod login;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientMessageType {
    AskSession,
    Login,
    Pong,
    HostGame,
    JoinGame,
    Social,
}

impl ClientMessageType {
    pub const ALL: [ClientMessageType; 6] = [
        ClientMessageType::AskSession,
        ClientMessageType::Login,
        ClientMessageType::Pong,
        ClientMessageType::HostGame,
        ClientMessageType::JoinGame,
        ClientMessageType::Social,
    ];

    /// `command` 字段的取值
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientMessageType::AskSession => "ask_session",
            ClientMessageType::Login => "hello",
            ClientMessageType::Pong => "pong",
            ClientMessageType::HostGame => "game_host",
            ClientMessageType::JoinGame => "game_join",
            ClientMessageType::Social => "social",
        }
    }
}

impl TryFrom<&str> for ClientMessageType {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ClientMessageType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| Error::UnknownMessageType(value.to_owned()))
    }
}

impl fmt::Display for ClientMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    AskSession,
    Login(Login),
    Pong,
    HostGame(HostGame),
    JoinGame(JoinGame),
    Social(SocialUpdate),
}

impl ClientMessage {
    pub fn encode(&self) -> Result<String, Error> {
        let command = self.message_type().as_str();
        match self {
            ClientMessage::AskSession | ClientMessage::Pong => codec::encode(command, &Empty {}),
            ClientMessage::Login(m) => codec::encode(command, m),
            ClientMessage::HostGame(m) => codec::encode(command, m),
            ClientMessage::JoinGame(m) => codec::encode(command, m),
            ClientMessage::Social(m) => codec::encode(command, m),
        }
    }

    pub fn decode(json: &str) -> Result<Self, Error> {
        let (command, body) = codec::split(json)?;
        let message = match ClientMessageType::try_from(command.as_str())? {
            ClientMessageType::AskSession => ClientMessage::AskSession,
            ClientMessageType::Login => ClientMessage::Login(codec::body(body)?),
            ClientMessageType::Pong => ClientMessage::Pong,
            ClientMessageType::HostGame => ClientMessage::HostGame(codec::body(body)?),
            ClientMessageType::JoinGame => ClientMessage::JoinGame(codec::body(body)?),
            ClientMessageType::Social => ClientMessage::Social(codec::body(body)?),
        };

        Ok(message)
    }

    #[inline]
    pub fn message_type(&self) -> ClientMessageType {
        match self {
            ClientMessage::AskSession => ClientMessageType::AskSession,
            ClientMessage::Login(_) => ClientMessageType::Login,
            ClientMessage::Pong => ClientMessageType::Pong,
            ClientMessage::HostGame(_) => ClientMessageType::HostGame,
            ClientMessage::JoinGame(_) => ClientMessageType::JoinGame,
            ClientMessage::Social(_) => ClientMessageType::Social,
        }
    }
}

/// 更新好友和黑名单
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friends: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foes: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use crate::protocol::GameAccess;

    use super::*;

    #[test]
    fn every_message_round_trips() {
        let messages = vec![
            ClientMessage::AskSession,
            ClientMessage::Pong,
            ClientMessage::Login(Login {
                login: "junit".into(),
                password: "password".into(),
                session: "456".into(),
                unique_id: "encrypteduidstring".into(),
                version: 0,
                user_agent: "downlords-faf-client".into(),
            }),
            ClientMessage::HostGame(HostGame {
                title: "Team game".into(),
                mapname: "scmp_009".into(),
                featured_mod: "faf".into(),
                access: GameAccess::Password,
                password: Some("secret".into()),
                version: 3,
            }),
            ClientMessage::JoinGame(JoinGame {
                uid: 42,
                password: None,
                gameport: 6112,
            }),
            ClientMessage::Social(SocialUpdate {
                friends: Some(vec!["alice".into()]),
                foes: None,
            }),
        ];

        for message in messages {
            let json = message.encode().unwrap();
            assert_eq!(ClientMessage::decode(&json).unwrap(), message, "{}", json);
        }
    }

    #[test]
    fn host_game_uses_wire_field_names() {
        let json = ClientMessage::HostGame(HostGame {
            title: "Team game".into(),
            mapname: "scmp_009".into(),
            featured_mod: "faf".into(),
            access: GameAccess::Public,
            password: None,
            version: 3,
        })
        .encode()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "command": "game_host",
                "title": "Team game",
                "mapname": "scmp_009",
                "mod": "faf",
                "access": "public",
                "version": 3,
            })
        );
    }

    #[test]
    fn ask_session_has_only_the_command() {
        let json = ClientMessage::AskSession.encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, serde_json::json!({ "command": "ask_session" }));
    }

    #[test]
    fn every_type_round_trips_through_its_wire_name() {
        for kind in ClientMessageType::ALL {
            assert_eq!(ClientMessageType::try_from(kind.as_str()).unwrap(), kind);
        }
        assert!(matches!(
            ClientMessageType::try_from("ASK_SESSION"),
            Err(Error::UnknownMessageType(_))
        ));
    }
}
