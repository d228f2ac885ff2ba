//! 大厅服务器协议客户端
//!
//! 负责与大厅服务器之间的帧读写、消息编解码、登录握手以及消息分发，
//! 凭证与硬件指纹由使用者通过 [`CredentialsProvider`] 和 [`UidGenerator`] 提供

use std::io;

use async_trait::async_trait;

pub use config::Config;
pub use error::Error;
pub use lobby::LobbyClient;
pub use protocol::{
    ClientMessage, ClientMessageType, ConnectionState, Router, ServerMessage, ServerMessageType,
    SessionInfo, Subscription,
};

pub mod config;
pub mod error;
mod lobby;
pub mod network;
pub mod protocol;

/// 登录凭证
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// 用户名
    pub username: String,
    /// 密码
    pub password: String,
}

/// 提供登录凭证，由使用者实现
#[async_trait]
pub trait CredentialsProvider: Send + Sync + 'static {
    /// 每次连接时调用一次
    async fn credentials(&self) -> Credentials;
}

/// 生成与会话绑定的硬件指纹，由使用者实现
#[async_trait]
pub trait UidGenerator: Send + Sync + 'static {
    /// 收到会话授权后调用一次，seed 为会话 id
    async fn generate(&self, seed: &str, salt: &str) -> io::Result<String>;
}

pub struct StaticCredentials(pub Credentials);

#[async_trait]
impl CredentialsProvider for StaticCredentials {
    async fn credentials(&self) -> Credentials {
        self.0.clone()
    }
}

/// 总是返回同一个指纹
pub struct StaticUid(pub String);

#[async_trait]
impl UidGenerator for StaticUid {
    async fn generate(&self, _seed: &str, _salt: &str) -> io::Result<String> {
        Ok(self.0.clone())
    }
}
