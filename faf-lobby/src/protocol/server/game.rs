use serde::{Deserialize, Serialize};

use crate::protocol::GameAccess;

/// 可选的游戏类型（featured mod）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTypeInfo {
    pub name: String,
    pub fullname: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub options: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Open,
    Playing,
    Closed,
}

/// 大厅中一局游戏的状态变化
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    pub uid: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub host: String,
    pub access: GameAccess,
    #[serde(default)]
    pub mapname: String,
    #[serde(default)]
    pub featured_mod: String,
    #[serde(default)]
    pub num_players: u32,
    #[serde(default)]
    pub max_players: u32,
    pub state: GameState,
}

/// 通知客户端启动游戏进程
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLaunch {
    pub uid: u32,
    #[serde(rename = "mod")]
    pub featured_mod: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use crate::protocol::ServerMessage;

    use super::*;

    #[test]
    fn game_type_info_keeps_field_order_and_types() {
        let json = r#"{"command":"mod_info","name":"test","fullname":"Test game type",
            "desc":"Game type description","icon":"what","options":[true,false,true]}"#;
        let message = ServerMessage::decode(json).unwrap();
        assert_eq!(
            message,
            ServerMessage::GameTypeInfo(GameTypeInfo {
                name: "test".into(),
                fullname: "Test game type".into(),
                description: "Game type description".into(),
                icon: "what".into(),
                options: vec![true, false, true],
            })
        );

        // 内存中叫 description，线上仍然是 desc
        let encoded = message.encode().unwrap();
        assert!(encoded.contains(r#""desc":"Game type description""#));
        assert!(!encoded.contains("description\""));
    }

    #[test]
    fn game_info_parsing_works() {
        let json = r#"{"command":"game_info","uid":42,"title":"1v1 only","host":"junit",
            "access":"password","mapname":"scmp_007","featured_mod":"faf",
            "num_players":1,"max_players":2,"state":"open"}"#;
        match ServerMessage::decode(json).unwrap() {
            ServerMessage::GameInfo(info) => {
                assert_eq!(info.uid, 42);
                assert_eq!(info.access, GameAccess::Password);
                assert_eq!(info.state, GameState::Open);
                assert_eq!(info.max_players, 2);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn game_launch_uses_mod_on_the_wire() {
        let json = r#"{"command":"game_launch","uid":7,"mod":"faf","args":["/ratingcolor","d8d8d8d8"]}"#;
        assert_eq!(
            ServerMessage::decode(json).unwrap(),
            ServerMessage::GameLaunch(GameLaunch {
                uid: 7,
                featured_mod: "faf".into(),
                args: vec!["/ratingcolor".into(), "d8d8d8d8".into()],
            })
        );
    }
}
