use serde::{Deserialize, Serialize};

/// `welcome` 消息
///
/// 握手时服务器发送两次：
/// * 会话授权，携带 `session`
/// * 登录确认，携带 `email`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Welcome {
    /// 玩家 id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    /// 会话 id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Welcome {
    pub fn is_session_grant(&self) -> bool {
        self.session.is_some() && self.email.is_none()
    }

    pub fn is_login_ack(&self) -> bool {
        self.email.is_some()
    }
}

#[cfg(test)]
mod tests {
    use crate::protocol::ServerMessage;

    use super::*;

    #[test]
    fn session_grant_parsing_works() {
        let message = ServerMessage::decode(r#"{"command":"welcome","id":123,"session":"456"}"#)
            .unwrap();
        let expected = Welcome {
            id: Some(123),
            session: Some("456".into()),
            email: None,
        };
        assert!(expected.is_session_grant());
        assert_eq!(message, ServerMessage::Welcome(expected));
    }

    #[test]
    fn absent_fields_are_not_written() {
        let json = ServerMessage::Welcome(Welcome {
            email: Some("test@example.com".into()),
            ..Default::default()
        })
        .encode()
        .unwrap();
        assert_eq!(json, r#"{"command":"welcome","email":"test@example.com"}"#);
    }
}
