use std::io;

use log::debug;

use crate::{config, network::Trailer, Credentials};

use super::{client::Login, ClientMessage, ServerMessage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Login acknowledgement received before session grant")]
    HandshakeOrdering,
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Generate unique id error: {0}")]
    Uid(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// 已发送 ask_session
    AwaitingSession,
    /// 已发送登录请求
    AwaitingLoginAck,
    Connected,
}

/// 登录成功后得到的会话信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// 玩家 id
    pub id: Option<i32>,
    pub session: String,
    pub email: String,
}

/// 握手过程中收到一条消息后需要执行的动作
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Idle,
    /// 收到会话授权，生成硬件指纹后发送登录请求
    Granted { session: String },
    /// 登录完成
    LoggedIn(SessionInfo),
}

/// 一次连接上的登录握手
///
/// connect → ask_session → welcome(session) → hello → welcome(email)
///
/// 只负责状态流转，网络读写由事件循环完成
pub(crate) struct Handshake {
    credentials: Credentials,
    state: ConnectionState,
    /// 会话授权中的玩家 id
    player_id: Option<i32>,
    session: Option<String>,
}

impl Handshake {
    pub(crate) fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: ConnectionState::AwaitingSession,
            player_id: None,
            session: None,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    pub(crate) fn on_message(&mut self, message: &ServerMessage) -> Result<Step, Error> {
        match (self.state, message) {
            (ConnectionState::AwaitingSession, ServerMessage::Welcome(welcome)) => {
                if welcome.is_login_ack() {
                    return Err(Error::HandshakeOrdering);
                }
                match &welcome.session {
                    Some(session) => {
                        self.player_id = welcome.id;
                        self.session = Some(session.clone());
                        self.state = ConnectionState::AwaitingLoginAck;
                        Ok(Step::Granted {
                            session: session.clone(),
                        })
                    }
                    None => {
                        debug!("ignore welcome without session while awaiting session");
                        Ok(Step::Idle)
                    }
                }
            }
            (ConnectionState::AwaitingLoginAck, ServerMessage::Welcome(welcome)) => {
                // 没有 email 的 welcome 不算登录确认，继续等待
                let email = match &welcome.email {
                    Some(email) => email.clone(),
                    None => return Ok(Step::Idle),
                };
                let session = welcome
                    .session
                    .clone()
                    .or_else(|| self.session.clone())
                    .unwrap_or_default();

                self.state = ConnectionState::Connected;
                Ok(Step::LoggedIn(SessionInfo {
                    id: welcome.id.or(self.player_id),
                    session,
                    email,
                }))
            }
            (
                ConnectionState::AwaitingSession | ConnectionState::AwaitingLoginAck,
                ServerMessage::AuthenticationFailed(failed),
            ) => Err(Error::AuthenticationFailed(failed.text.clone())),
            _ => Ok(Step::Idle),
        }
    }

    pub(crate) fn login_message(
        &self,
        unique_id: String,
        client: &config::Client,
    ) -> ClientMessage {
        ClientMessage::Login(Login {
            login: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
            session: self.session.clone().unwrap_or_default(),
            unique_id,
            version: client.version,
            user_agent: client.user_agent.clone(),
        })
    }

    /// 客户端每一帧都附带的用户名和会话 id
    pub(crate) fn trailer(&self) -> Trailer {
        Trailer {
            username: Some(self.credentials.username.clone()),
            session: self.session.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::server::{AuthenticationFailed, Notice, Welcome};

    use super::*;

    fn handshake() -> Handshake {
        Handshake::new(Credentials {
            username: "junit".into(),
            password: "password".into(),
        })
    }

    fn welcome(id: Option<i32>, session: Option<&str>, email: Option<&str>) -> ServerMessage {
        ServerMessage::Welcome(Welcome {
            id,
            session: session.map(Into::into),
            email: email.map(Into::into),
        })
    }

    #[test]
    fn grant_then_ack_merges_session_info() {
        let mut handshake = handshake();
        assert_eq!(handshake.trailer().session, None);

        let step = handshake
            .on_message(&welcome(Some(123), Some("456"), None))
            .unwrap();
        assert_eq!(
            step,
            Step::Granted {
                session: "456".into()
            }
        );
        assert_eq!(handshake.state(), ConnectionState::AwaitingLoginAck);
        assert_eq!(handshake.trailer().session.as_deref(), Some("456"));

        let login =
            handshake.login_message("encrypteduidstring".into(), &config::Client::default());
        assert_eq!(
            login,
            ClientMessage::Login(Login {
                login: "junit".into(),
                password: "password".into(),
                session: "456".into(),
                unique_id: "encrypteduidstring".into(),
                version: 0,
                user_agent: "downlords-faf-client".into(),
            })
        );

        let step = handshake
            .on_message(&welcome(Some(123), None, Some("test@example.com")))
            .unwrap();
        assert_eq!(
            step,
            Step::LoggedIn(SessionInfo {
                id: Some(123),
                session: "456".into(),
                email: "test@example.com".into(),
            })
        );
        assert_eq!(handshake.state(), ConnectionState::Connected);
    }

    #[test]
    fn ack_without_email_keeps_waiting() {
        let mut handshake = handshake();
        handshake
            .on_message(&welcome(None, Some("5678"), None))
            .unwrap();

        let step = handshake.on_message(&welcome(Some(1), None, None)).unwrap();
        assert_eq!(step, Step::Idle);
        assert_eq!(handshake.state(), ConnectionState::AwaitingLoginAck);
    }

    #[test]
    fn ack_before_grant_fails_fast() {
        let mut handshake = handshake();
        assert!(matches!(
            handshake.on_message(&welcome(None, None, Some("junit@example.com"))),
            Err(Error::HandshakeOrdering)
        ));
    }

    #[test]
    fn welcome_without_session_is_ignored_while_awaiting_session() {
        let mut handshake = handshake();
        let step = handshake.on_message(&welcome(Some(1), None, None)).unwrap();
        assert_eq!(step, Step::Idle);
        assert_eq!(handshake.state(), ConnectionState::AwaitingSession);
    }

    #[test]
    fn authentication_failure_aborts_login() {
        let mut handshake = handshake();
        handshake
            .on_message(&welcome(None, Some("5678"), None))
            .unwrap();

        let failed = ServerMessage::AuthenticationFailed(AuthenticationFailed {
            text: "Login not found or password incorrect.".into(),
        });
        match handshake.on_message(&failed) {
            Err(Error::AuthenticationFailed(text)) => {
                assert_eq!(text, "Login not found or password incorrect.")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn messages_after_login_do_not_change_state() {
        let mut handshake = handshake();
        handshake
            .on_message(&welcome(None, Some("5678"), None))
            .unwrap();
        handshake
            .on_message(&welcome(None, None, Some("junit@example.com")))
            .unwrap();

        let notice = ServerMessage::Notice(Notice {
            style: "info".into(),
            text: "hi".into(),
        });
        assert_eq!(handshake.on_message(&notice).unwrap(), Step::Idle);
        assert_eq!(
            handshake
                .on_message(&welcome(None, None, Some("other@example.com")))
                .unwrap(),
            Step::Idle
        );
        assert_eq!(handshake.state(), ConnectionState::Connected);
    }
}
