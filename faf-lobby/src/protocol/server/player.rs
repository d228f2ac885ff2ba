use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_mean: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_deviation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_games: Option<u32>,
}

/// 好友、黑名单以及需要自动加入的聊天频道
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Social {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friends: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autojoin: Option<Vec<String>>,
}
