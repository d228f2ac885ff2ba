//! 服务器发给客户端的消息

use std::fmt;

use serde::{Deserialize, Serialize};

pub use game::*;
pub use player::*;
pub use welcome::*;

use super::codec::{self, Empty, Error};

pub mod game;
pub mod player;
pub mod welcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerMessageType {
    Welcome,
    GameTypeInfo,
    GameInfo,
    PlayerInfo,
    GameLaunch,
    Social,
    Notice,
    AuthenticationFailed,
    Ping,
}

impl ServerMessageType {
    pub const ALL: [ServerMessageType; 9] = [
        ServerMessageType::Welcome,
        ServerMessageType::GameTypeInfo,
        ServerMessageType::GameInfo,
        ServerMessageType::PlayerInfo,
        ServerMessageType::GameLaunch,
        ServerMessageType::Social,
        ServerMessageType::Notice,
        ServerMessageType::AuthenticationFailed,
        ServerMessageType::Ping,
    ];

    /// `command` 字段的取值
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerMessageType::Welcome => "welcome",
            ServerMessageType::GameTypeInfo => "mod_info",
            ServerMessageType::GameInfo => "game_info",
            ServerMessageType::PlayerInfo => "player_info",
            ServerMessageType::GameLaunch => "game_launch",
            ServerMessageType::Social => "social",
            ServerMessageType::Notice => "notice",
            ServerMessageType::AuthenticationFailed => "authentication_failed",
            ServerMessageType::Ping => "ping",
        }
    }
}

impl TryFrom<&str> for ServerMessageType {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ServerMessageType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| Error::UnknownMessageType(value.to_owned()))
    }
}

impl fmt::Display for ServerMessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Welcome(Welcome),
    GameTypeInfo(GameTypeInfo),
    GameInfo(GameInfo),
    PlayerInfo(PlayerInfo),
    GameLaunch(GameLaunch),
    Social(Social),
    Notice(Notice),
    AuthenticationFailed(AuthenticationFailed),
    Ping,
}

impl ServerMessage {
    pub fn decode(json: &str) -> Result<Self, Error> {
        let (command, body) = codec::split(json)?;
        let message = match ServerMessageType::try_from(command.as_str())? {
            ServerMessageType::Welcome => ServerMessage::Welcome(codec::body(body)?),
            ServerMessageType::GameTypeInfo => ServerMessage::GameTypeInfo(codec::body(body)?),
            ServerMessageType::GameInfo => ServerMessage::GameInfo(codec::body(body)?),
            ServerMessageType::PlayerInfo => ServerMessage::PlayerInfo(codec::body(body)?),
            ServerMessageType::GameLaunch => ServerMessage::GameLaunch(codec::body(body)?),
            ServerMessageType::Social => ServerMessage::Social(codec::body(body)?),
            ServerMessageType::Notice => ServerMessage::Notice(codec::body(body)?),
            ServerMessageType::AuthenticationFailed => {
                ServerMessage::AuthenticationFailed(codec::body(body)?)
            }
            ServerMessageType::Ping => ServerMessage::Ping,
        };

        Ok(message)
    }

    pub fn encode(&self) -> Result<String, Error> {
        let command = self.message_type().as_str();
        match self {
            ServerMessage::Welcome(m) => codec::encode(command, m),
            ServerMessage::GameTypeInfo(m) => codec::encode(command, m),
            ServerMessage::GameInfo(m) => codec::encode(command, m),
            ServerMessage::PlayerInfo(m) => codec::encode(command, m),
            ServerMessage::GameLaunch(m) => codec::encode(command, m),
            ServerMessage::Social(m) => codec::encode(command, m),
            ServerMessage::Notice(m) => codec::encode(command, m),
            ServerMessage::AuthenticationFailed(m) => codec::encode(command, m),
            ServerMessage::Ping => codec::encode(command, &Empty {}),
        }
    }

    #[inline]
    pub fn message_type(&self) -> ServerMessageType {
        match self {
            ServerMessage::Welcome(_) => ServerMessageType::Welcome,
            ServerMessage::GameTypeInfo(_) => ServerMessageType::GameTypeInfo,
            ServerMessage::GameInfo(_) => ServerMessageType::GameInfo,
            ServerMessage::PlayerInfo(_) => ServerMessageType::PlayerInfo,
            ServerMessage::GameLaunch(_) => ServerMessageType::GameLaunch,
            ServerMessage::Social(_) => ServerMessageType::Social,
            ServerMessage::Notice(_) => ServerMessageType::Notice,
            ServerMessage::AuthenticationFailed(_) => ServerMessageType::AuthenticationFailed,
            ServerMessage::Ping => ServerMessageType::Ping,
        }
    }
}

/// 服务器通知，如维护公告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub style: String,
    pub text: String,
}

/// 登录被拒绝
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationFailed {
    #[serde(default)]
    pub text: String,
}
