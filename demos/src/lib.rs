use std::{io, path::PathBuf};

use async_trait::async_trait;
use clap::Parser;
use faf_lobby::{Config, Credentials, UidGenerator};
use tokio::process::Command;

/// 登录大厅服务器并打印收到的消息
#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct Args {
    /// toml 配置文件
    #[clap(short, long)]
    pub config: Option<PathBuf>,
    #[clap(long)]
    pub host: Option<String>,
    #[clap(long)]
    pub port: Option<u16>,
    #[clap(short, long)]
    pub username: Option<String>,
    #[clap(short, long)]
    pub password: Option<String>,
    /// 生成硬件指纹的可执行文件，参数为会话 id 和盐
    #[clap(long)]
    pub uid_command: Option<PathBuf>,
}

/// 环境变量覆盖，前缀 FAF_
#[derive(Debug, Default, serde::Deserialize)]
pub struct EnvOverrides {
    pub lobby_host: Option<String>,
    pub lobby_port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("FAF_").from_env::<EnvOverrides>()
    }
}

/// 配置文件 < 环境变量 < 命令行
pub fn apply_overrides(cfg: &mut Config, env: &EnvOverrides, args: &Args) {
    if let Some(host) = args.host.as_ref().or(env.lobby_host.as_ref()) {
        cfg.lobby.host = host.clone();
    }
    if let Some(port) = args.port.or(env.lobby_port) {
        cfg.lobby.port = port;
    }
}

pub fn credentials(env: &EnvOverrides, args: &Args) -> Option<Credentials> {
    let username = args.username.as_ref().or(env.username.as_ref())?;
    let password = args.password.as_ref().or(env.password.as_ref())?;
    Some(Credentials {
        username: username.clone(),
        password: password.clone(),
    })
}

/// 调用外部程序生成硬件指纹，未配置时返回固定值
pub struct CommandUid {
    pub command: Option<PathBuf>,
}

#[async_trait]
impl UidGenerator for CommandUid {
    async fn generate(&self, seed: &str, salt: &str) -> io::Result<String> {
        let command = match &self.command {
            Some(command) => command,
            None => return Ok("demo-uid".into()),
        };

        let output = Command::new(command).arg(seed).arg(salt).output().await?;
        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {}", command.display(), output.status),
            ));
        }

        let uid = String::from_utf8(output.stdout)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(uid.trim().to_owned())
    }
}
