use bytes::BytesMut;
use tokio::{
    io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
    time,
};

use super::frame::{self, Frame, DEFAULT_MAX_FRAME_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Frame error: {0}")]
    Frame(#[from] frame::Error),
    #[error("I/O: {0}")]
    IO(#[from] io::Error),
    #[error("Read timeout")]
    ReadTimeout(#[from] time::error::Elapsed),
    #[error("Connection closed in the middle of a frame ({0} bytes buffered)")]
    TruncatedFrame(usize),
    #[error("Connection closed by peer")]
    ConnectionClosed,
    #[error("Connection shut down locally")]
    Shutdown,
}

/// 客户端与大厅服务器之间的连接
/// 单纯的 tcp 读写管理，以帧为单位读写
pub struct Connection<S = TcpStream> {
    stream: S,
    /// 读缓冲区
    /// 不完整的帧保留在缓冲区中，直到读满整个块
    read: BytesMut,
    /// 写缓冲区
    /// 整个帧先写入缓冲区再一次性刷入 socket
    write: BytesMut,
    max_frame_size: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read: BytesMut::new(),
            write: BytesMut::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// 读取一个完整的帧
    ///
    /// 已读到的字节保存在缓冲区中，所以在 `select!` 中被取消也不会丢数据
    pub async fn read_frame(&mut self) -> Result<Frame, Error> {
        loop {
            let required = match Frame::read_from(&mut self.read, self.max_frame_size) {
                Ok(frame) => return Ok(frame),
                Err(frame::Error::InsufficientBytes(n)) => n,
                Err(e) => return Err(Error::Frame(e)),
            };

            // 数据不足，读取更多数据
            self.read_bytes(required).await?;
        }
    }

    /// 在指定时间内读取一个完整的帧，`None` 表示一直等待
    pub async fn read_frame_timeout(
        &mut self,
        timeout: Option<time::Duration>,
    ) -> Result<Frame, Error> {
        self.read_frame_until(timeout.map(|timeout| time::Instant::now() + timeout))
            .await
    }

    /// 在截止时间前读取一个完整的帧，`None` 表示一直等待
    ///
    /// 截止时间由调用方保存，在 `select!` 中反复调用不会重新计时
    pub async fn read_frame_until(
        &mut self,
        deadline: Option<time::Instant>,
    ) -> Result<Frame, Error> {
        match deadline {
            Some(deadline) => time::timeout_at(deadline, self.read_frame()).await?,
            None => self.read_frame().await,
        }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        frame.write(&mut self.write)?;
        self.flush().await
    }

    /// 关闭写端，对端会读到 EOF
    pub async fn shutdown(&mut self) -> Result<(), Error> {
        self.flush().await?;
        self.stream.shutdown().await?;
        Ok(())
    }

    /// 等待从 socket 读出至少所需长度的数据，放入缓冲区
    async fn read_bytes(&mut self, required: usize) -> Result<(), Error> {
        self.read.reserve(required);
        let mut total_read = 0;
        loop {
            let read = self.stream.read_buf(&mut self.read).await?;
            if 0 == read {
                return if self.read.is_empty() {
                    Err(Error::ConnectionClosed)
                } else {
                    Err(Error::TruncatedFrame(self.read.len()))
                };
            }

            total_read += read;
            if total_read >= required {
                return Ok(());
            }
        }
    }

    async fn flush(&mut self) -> Result<(), Error> {
        if self.write.is_empty() {
            return Ok(());
        }

        let result = self.stream.write_all(&self.write).await;
        // 写失败时连接已不可用，不保留半个帧
        self.write.clear();
        result?;
        self.stream.flush().await?;
        Ok(())
    }
}
