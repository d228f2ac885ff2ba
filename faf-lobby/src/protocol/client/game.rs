use serde::{Deserialize, Serialize};

use crate::protocol::GameAccess;

/// 创建一局游戏
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGame {
    pub title: String,
    pub mapname: String,
    #[serde(rename = "mod")]
    pub featured_mod: String,
    pub access: GameAccess,
    /// 仅在 access 为 password 时有效
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// 游戏模式的版本
    pub version: i32,
}

/// 加入一局游戏
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGame {
    pub uid: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// 本地游戏进程监听的端口
    pub gameport: u16,
}
