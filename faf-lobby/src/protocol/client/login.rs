use serde::{Deserialize, Serialize};

/// 登录请求，必须在收到会话授权之后发送
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Login {
    /// 用户名
    pub login: String,
    /// 密码
    pub password: String,
    /// 服务器分配的会话 id
    pub session: String,
    /// 与会话绑定的硬件指纹
    pub unique_id: String,
    /// 客户端版本
    pub version: i32,
    pub user_agent: String,
}

#[cfg(test)]
mod tests {
    use crate::protocol::ClientMessage;

    use super::*;

    #[test]
    fn login_uses_underscore_field_names() {
        let json = ClientMessage::Login(Login {
            login: "junit".into(),
            password: "password".into(),
            session: "456".into(),
            unique_id: "encrypteduidstring".into(),
            version: 0,
            user_agent: "downlords-faf-client".into(),
        })
        .encode()
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "command": "hello",
                "login": "junit",
                "password": "password",
                "session": "456",
                "unique_id": "encrypteduidstring",
                "version": 0,
                "user_agent": "downlords-faf-client",
            })
        );
    }
}
