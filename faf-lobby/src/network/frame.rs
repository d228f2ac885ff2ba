//! 帧编解码
//!
//! 帧格式沿用 QDataStream：
//! * `int32` 块长度（大端），表示后续字节数
//! * 若干 QString：`u32` 字节长度（大端）+ UTF-16BE 编码单元，长度为 `0xFFFFFFFF` 时表示空字符串
//!
//! 第一个 QString 为 json 负载，之后可能跟随用户名与会话 id 两个附加字段

use bytes::{Buf, BufMut, Bytes, BytesMut};

/// 默认允许的最大块长度
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// 块长度头的字节数
const HEADER_LEN: usize = 4;

/// 空 QString 的长度标记
const NULL_STRING: u32 = 0xFFFF_FFFF;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("At least {0} more bytes required")]
    InsufficientBytes(usize),
    #[error("Malformed frame")]
    MalformedFrame,
    #[error("Malformed UTF-16 string")]
    MalformedString,
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),
}

/// 一个完整的帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// json 负载
    pub payload: String,
    /// 附加字段，客户端发出的帧总是携带
    pub trailer: Option<Trailer>,
}

/// json 之后的附加字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trailer {
    pub username: Option<String>,
    pub session: Option<String>,
}

impl Frame {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            trailer: None,
        }
    }

    pub fn with_trailer(mut self, trailer: Trailer) -> Self {
        self.trailer = Some(trailer);
        self
    }

    /// 从缓冲区读取一个帧
    ///
    /// 数据不足时返回 [`Error::InsufficientBytes`]，缓冲区保持不变；
    /// 成功时整个块（包括多余的字节）都会从缓冲区中移除
    pub fn read_from(stream: &mut BytesMut, max_frame_size: usize) -> Result<Self, Error> {
        let stream_len = stream.len();
        if stream_len < HEADER_LEN {
            return Err(Error::InsufficientBytes(HEADER_LEN - stream_len));
        }

        let block_size = (&stream[..HEADER_LEN]).get_i32();
        if block_size < 0 {
            return Err(Error::MalformedFrame);
        }
        let block_size = block_size as usize;
        if block_size > max_frame_size {
            return Err(Error::FrameTooLarge(block_size));
        }

        let frame_len = HEADER_LEN + block_size;
        if stream_len < frame_len {
            return Err(Error::InsufficientBytes(frame_len - stream_len));
        }

        // split_to 会更新 stream，后续帧的对齐不受本帧内容影响
        let mut block = stream.split_to(frame_len).freeze();
        block.advance(HEADER_LEN);

        let payload = read_string(&mut block)?.ok_or(Error::MalformedFrame)?;
        let trailer = if block.has_remaining() {
            let username = read_string(&mut block)?;
            let session = if block.has_remaining() {
                read_string(&mut block)?
            } else {
                None
            };
            Some(Trailer { username, session })
        } else {
            None
        };

        if block.has_remaining() {
            log::warn!(
                "discard {} unknown trailing bytes in frame",
                block.remaining()
            );
        }

        Ok(Self { payload, trailer })
    }

    pub fn write(&self, stream: &mut BytesMut) -> Result<(), Error> {
        let block_size = self.len();
        if block_size > i32::MAX as usize {
            return Err(Error::FrameTooLarge(block_size));
        }

        stream.reserve(HEADER_LEN + block_size);
        stream.put_i32(block_size as i32);
        write_string(stream, Some(&self.payload));
        if let Some(trailer) = &self.trailer {
            write_string(stream, trailer.username.as_deref());
            write_string(stream, trailer.session.as_deref());
        }
        Ok(())
    }

    /// 块长度，不包含长度头本身
    pub fn len(&self) -> usize {
        let trailer_len = match &self.trailer {
            Some(trailer) => {
                string_len(trailer.username.as_deref()) + string_len(trailer.session.as_deref())
            }
            None => 0,
        };
        string_len(Some(&self.payload)) + trailer_len
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty() && self.trailer.is_none()
    }
}

fn read_string(stream: &mut Bytes) -> Result<Option<String>, Error> {
    if stream.remaining() < 4 {
        return Err(Error::MalformedFrame);
    }

    let len = stream.get_u32();
    if len == NULL_STRING {
        return Ok(None);
    }

    let len = len as usize;
    if len % 2 != 0 {
        return Err(Error::MalformedString);
    }
    // 字符串不能越过块的边界
    if len > stream.remaining() {
        return Err(Error::MalformedFrame);
    }

    let units = stream
        .split_to(len)
        .chunks_exact(2)
        .map(|unit| u16::from_be_bytes([unit[0], unit[1]]))
        .collect::<Vec<u16>>();

    String::from_utf16(&units)
        .map(Some)
        .map_err(|_| Error::MalformedString)
}

fn write_string(stream: &mut BytesMut, string: Option<&str>) {
    match string {
        Some(s) => {
            stream.put_u32((s.encode_utf16().count() * 2) as u32);
            for unit in s.encode_utf16() {
                stream.put_u16(unit);
            }
        }
        None => stream.put_u32(NULL_STRING),
    }
}

fn string_len(string: Option<&str>) -> usize {
    4 + string.map(|s| s.encode_utf16().count() * 2).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qstring(s: &str) -> Vec<u8> {
        let mut bytes = ((s.encode_utf16().count() * 2) as u32).to_be_bytes().to_vec();
        for unit in s.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        bytes
    }

    #[test]
    fn frame_parsing_works() {
        let body = qstring("{}");
        let mut stream = BytesMut::new();
        stream.extend_from_slice(&(body.len() as i32).to_be_bytes());
        stream.extend_from_slice(&body);
        // 下一帧的开头
        stream.extend_from_slice(&[0x00, 0x00]);

        let frame = Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(frame, Frame::new("{}"));
        assert_eq!(&stream[..], &[0x00, 0x00]);
    }

    #[test]
    fn declared_length_matches_written_bytes() {
        let frame = Frame::new(r#"{"command":"hello","login":"Jürgen ✓"}"#).with_trailer(Trailer {
            username: Some("junit".into()),
            session: None,
        });
        let mut stream = BytesMut::new();
        frame.write(&mut stream).unwrap();

        let declared = (&stream[..4]).get_i32() as usize;
        assert_eq!(declared, stream.len() - 4);
        assert_eq!(declared, frame.len());

        let read = Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(read, frame);
        assert!(stream.is_empty());
    }

    #[test]
    fn partial_frame_requires_more_bytes() {
        let frame = Frame::new(r#"{"command":"ping"}"#);
        let mut full = BytesMut::new();
        frame.write(&mut full).unwrap();

        let mut stream = BytesMut::from(&full[..2]);
        assert!(matches!(
            Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE),
            Err(Error::InsufficientBytes(2))
        ));

        let mut stream = BytesMut::from(&full[..10]);
        match Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE) {
            Err(Error::InsufficientBytes(n)) => assert_eq!(n, full.len() - 10),
            other => panic!("unexpected result: {:?}", other),
        }
        // 数据不足时不消费缓冲区
        assert_eq!(stream.len(), 10);
    }

    #[test]
    fn unknown_trailing_bytes_are_skipped() {
        let mut body = qstring("{}");
        body.extend(qstring("junit"));
        body.extend(qstring("456"));
        body.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut stream = BytesMut::new();
        stream.extend_from_slice(&(body.len() as i32).to_be_bytes());
        stream.extend_from_slice(&body);
        Frame::new("[]").write(&mut stream).unwrap();

        let first = Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(
            first.trailer,
            Some(Trailer {
                username: Some("junit".into()),
                session: Some("456".into()),
            })
        );
        let second = Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(second.payload, "[]");
    }

    #[test]
    fn string_past_block_is_malformed() {
        let mut stream = BytesMut::new();
        stream.put_i32(6);
        stream.put_u32(8);
        stream.put_u16(0x7b);

        assert!(matches!(
            Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE),
            Err(Error::MalformedFrame)
        ));
    }

    #[test]
    fn odd_string_length_is_malformed() {
        let mut stream = BytesMut::new();
        stream.put_i32(7);
        stream.put_u32(3);
        stream.extend_from_slice(&[0, 0x7b, 0]);

        assert!(matches!(
            Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE),
            Err(Error::MalformedString)
        ));
    }

    #[test]
    fn oversized_and_negative_blocks_are_rejected() {
        let mut stream = BytesMut::new();
        stream.put_i32(1024);
        assert!(matches!(
            Frame::read_from(&mut stream, 512),
            Err(Error::FrameTooLarge(1024))
        ));

        let mut stream = BytesMut::new();
        stream.put_i32(-1);
        assert!(matches!(
            Frame::read_from(&mut stream, 512),
            Err(Error::MalformedFrame)
        ));
    }

    #[test]
    fn null_payload_is_malformed() {
        let mut stream = BytesMut::new();
        stream.put_i32(4);
        stream.put_u32(NULL_STRING);

        assert!(matches!(
            Frame::read_from(&mut stream, DEFAULT_MAX_FRAME_SIZE),
            Err(Error::MalformedFrame)
        ));
    }
}
