//! json 消息编解码
//!
//! 两个方向的消息都是一个 json 对象，`command` 字段决定其余字段的结构，
//! 字段名统一使用小写加下划线

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

/// 区分消息类型的字段
pub const DISCRIMINATOR: &str = "command";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),
    #[error("Missing message discriminator")]
    MissingDiscriminator,
    #[error("Malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Serialize message error: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Message body is not a json object")]
    NotAnObject,
}

/// 没有字段的消息体
#[derive(Debug, Serialize)]
pub(crate) struct Empty {}

/// 拆出 `command` 字段和剩余的消息体
pub(crate) fn split(json: &str) -> Result<(String, Value), Error> {
    let value = serde_json::from_str::<Value>(json).map_err(Error::Malformed)?;
    let mut body = match value {
        Value::Object(map) => map,
        _ => return Err(Error::NotAnObject),
    };

    match body.remove(DISCRIMINATOR) {
        Some(Value::String(command)) => Ok((command, Value::Object(body))),
        _ => Err(Error::MissingDiscriminator),
    }
}

pub(crate) fn body<T: DeserializeOwned>(body: Value) -> Result<T, Error> {
    serde_json::from_value(body).map_err(Error::Malformed)
}

/// 序列化消息体，并写入 `command` 字段
pub(crate) fn encode<T: Serialize>(command: &str, body: &T) -> Result<String, Error> {
    let body = match serde_json::to_value(body).map_err(Error::Serialize)? {
        Value::Object(map) => map,
        _ => return Err(Error::NotAnObject),
    };

    let mut message = Map::with_capacity(body.len() + 1);
    message.insert(DISCRIMINATOR.to_owned(), Value::String(command.to_owned()));
    message.extend(body);

    serde_json::to_string(&Value::Object(message)).map_err(Error::Serialize)
}
