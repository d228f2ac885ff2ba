//! 协议层
//! 处理消息编解码、登录握手与消息分发，依赖于底层的网络层进行帧读写

use serde::{Deserialize, Serialize};

pub use client::{ClientMessage, ClientMessageType};
pub use router::{Router, Subscription};
pub use server::{ServerMessage, ServerMessageType};
pub use session::{ConnectionState, SessionInfo};

pub mod client;
pub mod codec;
pub(crate) mod router;
pub mod server;
pub mod session;

/// 游戏的加入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameAccess {
    Public,
    Password,
}
