use std::{io, path::Path, time::Duration};

use tokio::{fs, io::AsyncReadExt};

use crate::network::DEFAULT_MAX_FRAME_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Read config file error: {0}")]
    IO(#[from] io::Error),
    #[error("Parse config error: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub lobby: Lobby,
    pub client: Client,
    pub timeouts: Timeouts,
}

/// 大厅服务器地址
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Lobby {
    pub host: String,
    pub port: u16,
    /// 允许接收的最大块长度
    pub max_frame_size: usize,
}

impl Default for Lobby {
    fn default() -> Self {
        Self {
            host: "lobby.faforever.com".into(),
            port: 8001,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// 登录时上报的客户端信息
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Client {
    pub version: i32,
    pub user_agent: String,
    /// 生成硬件指纹时使用的盐
    pub uid_salt: String,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            version: 0,
            user_agent: "downlords-faf-client".into(),
            uid_salt: String::new(),
        }
    }
}

/// 超时设置，单位秒，0 表示不限制
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub handshake_secs: u64,
    pub read_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake_secs: 30,
            read_secs: 0,
        }
    }
}

impl Timeouts {
    pub fn handshake(&self) -> Option<Duration> {
        Some(self.handshake_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn read(&self) -> Option<Duration> {
        Some(self.read_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Config {
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut file = fs::File::open(path).await?;
        let mut s = String::new();
        file.read_to_string(&mut s).await?;

        Self::parse(&s)
    }

    pub fn parse(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str::<Config>(s)?)
    }
}
