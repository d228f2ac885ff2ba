use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use tokio::{
    net::TcpStream,
    select,
    sync::{
        mpsc::{self, Receiver, Sender},
        oneshot, watch,
    },
    task::JoinHandle,
    time,
};

use crate::{
    config::{self, Config},
    error::Error,
    network::{self, Connection, Frame},
    protocol::{
        client::{HostGame, JoinGame, SocialUpdate},
        session::{self, Handshake, Step},
        ClientMessage, ConnectionState, Router, ServerMessage, ServerMessageType, SessionInfo,
        Subscription,
    },
    CredentialsProvider, UidGenerator,
};

type LoginResult = Result<SessionInfo, Error>;

/// 发给事件循环的请求
#[derive(Debug)]
enum Outgoing {
    /// 已编码的 json 负载
    Message(String),
    Disconnect,
}

/// 当前连接
enum ConnHandle {
    /// 正在建立 TCP 连接或获取凭证，发送即取消
    Connecting(oneshot::Sender<()>),
    /// 事件循环已启动
    Running {
        conn_tx: Sender<Outgoing>,
        task: JoinHandle<()>,
    },
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 大厅服务器客户端
///
/// 每次 [`LobbyClient::connect_and_log_in`] 建立一个连接，并启动一个事件循环：
/// * 从 socket 读帧，解码后推动登录握手，再交给 router 分发
/// * 接收调用方发来的消息，写入 socket，所有写操作都在这一个任务中完成
pub struct LobbyClient<C: CredentialsProvider, U: UidGenerator> {
    cfg: Config,
    credentials: Arc<C>,
    uid: Arc<U>,
    router: Router,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    conn: Mutex<Option<ConnHandle>>,
}

impl<C: CredentialsProvider, U: UidGenerator> LobbyClient<C, U> {
    pub fn new(cfg: Config, credentials: Arc<C>, uid: Arc<U>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            cfg,
            credentials,
            uid,
            router: Router::new(),
            state_tx: Arc::new(state_tx),
            conn: Mutex::new(None),
        }
    }

    /// 连接大厅服务器并登录
    ///
    /// 同一时间只允许一次连接，已连接或正在连接时返回 [`Error::AlreadyConnected`]
    pub async fn connect_and_log_in(&self) -> Result<SessionInfo, Error> {
        // 持有 conn 锁修改状态，disconnect 总能看到 Connecting 的取消句柄
        let abort_rx = {
            let mut conn = lock(&self.conn);
            let claimed = self.state_tx.send_if_modified(|state| {
                if *state == ConnectionState::Disconnected {
                    *state = ConnectionState::Connecting;
                    true
                } else {
                    false
                }
            });
            if !claimed {
                return Err(Error::AlreadyConnected);
            }
            let (abort_tx, abort_rx) = oneshot::channel();
            *conn = Some(ConnHandle::Connecting(abort_tx));
            abort_rx
        };

        let (login_tx, login_rx) = oneshot::channel();
        {
            // 连接建立前被取消或失败，都要回到 Disconnected
            let mut guard = ConnectingGuard {
                state_tx: &self.state_tx,
                conn: &self.conn,
                armed: true,
            };
            select! {
                biased;
                _ = abort_rx => {
                    info!("connecting cancelled by disconnect");
                    return Err(Error::ConnectionLost(network::Error::Shutdown));
                }
                started = self.start_connection(login_tx) => started?,
            }
            guard.armed = false;
        }

        let result = match self.cfg.timeouts.handshake() {
            Some(timeout) => match time::timeout(timeout, login_rx).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("handshake not finished within {:?}", timeout);
                    self.disconnect().await;
                    return Err(Error::HandshakeTimeout);
                }
            },
            None => login_rx.await,
        };

        // 事件循环退出前一定会回复登录结果，收不到说明事件循环异常终止
        result.unwrap_or(Err(Error::ConnectionLost(network::Error::Shutdown)))
    }

    async fn start_connection(&self, login_tx: oneshot::Sender<LoginResult>) -> Result<(), Error> {
        let lobby = &self.cfg.lobby;
        let stream = TcpStream::connect((lobby.host.as_str(), lobby.port))
            .await
            .map_err(Error::Connect)?;
        info!("connected to lobby server {}:{}", lobby.host, lobby.port);

        let credentials = self.credentials.credentials().await;

        // conn_tx 由客户端持有，用于给事件循环发送消息
        let (conn_tx, conn_rx) = mpsc::channel(1000);
        let event_loop = EventLoop {
            conn: Connection::new(stream).with_max_frame_size(lobby.max_frame_size),
            conn_rx,
            handshake: Handshake::new(credentials),
            login_tx: Some(login_tx),
            uid: self.uid.clone(),
            client_cfg: self.cfg.client.clone(),
            read_timeout: self.cfg.timeouts.read(),
            router: self.router.clone(),
            state_tx: self.state_tx.clone(),
        };
        let task = tokio::spawn(event_loop.run());
        *lock(&self.conn) = Some(ConnHandle::Running { conn_tx, task });
        Ok(())
    }

    /// 断开连接，等待事件循环退出
    /// 正在进行的登录会以 [`Error::ConnectionLost`] 失败
    pub async fn disconnect(&self) {
        let handle = lock(&self.conn).take();
        match handle {
            Some(ConnHandle::Connecting(abort_tx)) => {
                let mut state = self.state_tx.subscribe();
                let _ = abort_tx.send(());
                // 等待 connect_and_log_in 退出
                let _ = state
                    .wait_for(|state| *state == ConnectionState::Disconnected)
                    .await;
            }
            Some(ConnHandle::Running { conn_tx, task }) => {
                // 事件循环已经退出时发送会失败，直接等待即可
                let _ = conn_tx.send(Outgoing::Disconnect).await;
                if let Err(e) = task.await {
                    error!("lobby event loop task failed: {}", e);
                }
            }
            None => {}
        }
    }

    /// 发送消息，编码失败只影响本次调用
    pub async fn send(&self, message: ClientMessage) -> Result<(), Error> {
        let payload = message.encode()?;

        let state = *self.state_tx.borrow();
        if state != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }
        let conn_tx = match lock(&self.conn).as_ref() {
            Some(ConnHandle::Running { conn_tx, .. }) => conn_tx.clone(),
            _ => return Err(Error::NotConnected),
        };

        debug!("send {} message", message.message_type());
        conn_tx
            .send(Outgoing::Message(payload))
            .await
            .map_err(|_| Error::NotConnected)
    }

    pub async fn host_game(&self, game: HostGame) -> Result<(), Error> {
        self.send(ClientMessage::HostGame(game)).await
    }

    pub async fn join_game(&self, game: JoinGame) -> Result<(), Error> {
        self.send(ClientMessage::JoinGame(game)).await
    }

    pub async fn set_social(&self, social: SocialUpdate) -> Result<(), Error> {
        self.send(ClientMessage::Social(social)).await
    }

    pub fn add_listener<F>(&self, kind: ServerMessageType, listener: F) -> Subscription
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        self.router.add_listener(kind, listener)
    }

    /// 按类型注册监听器
    pub fn listeners(&self) -> &Router {
        &self.router
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}

impl<C: CredentialsProvider, U: UidGenerator> Drop for LobbyClient<C, U> {
    fn drop(&mut self) {
        // 关闭分发队列，分发线程退出并释放所有监听器
        self.router.close();
    }
}

struct ConnectingGuard<'a> {
    state_tx: &'a watch::Sender<ConnectionState>,
    conn: &'a Mutex<Option<ConnHandle>>,
    armed: bool,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut conn = lock(self.conn);
            if let Some(ConnHandle::Connecting(_)) = conn.as_ref() {
                *conn = None;
            }
            self.state_tx.send_replace(ConnectionState::Disconnected);
        }
    }
}

/// 单个连接上的事件循环
struct EventLoop<U: UidGenerator> {
    conn: Connection,
    conn_rx: Receiver<Outgoing>,
    handshake: Handshake,
    /// 等待中的登录结果，只回复一次
    login_tx: Option<oneshot::Sender<LoginResult>>,
    uid: Arc<U>,
    client_cfg: config::Client,
    read_timeout: Option<time::Duration>,
    router: Router,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

impl<U: UidGenerator> EventLoop<U> {
    async fn run(mut self) {
        let err = match self.start().await {
            Ok(()) => Error::ConnectionLost(network::Error::Shutdown),
            Err(e) => e,
        };

        if let Err(e) = self.conn.shutdown().await {
            debug!("shutdown lobby connection error: {}", e);
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);

        match self.login_tx.take() {
            Some(login_tx) => {
                warn!("login failed: {}", err);
                let _ = login_tx.send(Err(err));
            }
            None => match err {
                Error::ConnectionLost(network::Error::Shutdown) => {
                    info!("disconnected from lobby server")
                }
                e => error!("lobby connection exit error: {}", e),
            },
        }
    }

    /// 开启事件循环
    /// * 先发送 ask_session，之后从 socket 读帧驱动握手并分发消息
    /// * 接收客户端发来的消息，写入 socket
    async fn start(&mut self) -> Result<(), Error> {
        self.write_message(&ClientMessage::AskSession).await?;
        self.state_tx.send_replace(self.handshake.state());

        // 只有读到完整的帧才顺延，发送消息不影响读超时
        let mut read_deadline = self.next_read_deadline();
        loop {
            select! {
                // 从网络层读数据
                reads = self.conn.read_frame_until(read_deadline) => {
                    let frame = reads?;
                    read_deadline = self.next_read_deadline();
                    self.handle_frame(frame).await?;
                }
                // 从客户端读请求
                recv = self.conn_rx.recv() => {
                    match recv {
                        Some(Outgoing::Message(payload)) => self.write_payload(payload).await?,
                        // 客户端已销毁，同样退出
                        Some(Outgoing::Disconnect) | None => return Ok(()),
                    }
                }
            }
        }
    }

    fn next_read_deadline(&self) -> Option<time::Instant> {
        self.read_timeout.map(|timeout| time::Instant::now() + timeout)
    }

    async fn handle_frame(&mut self, frame: Frame) -> Result<(), Error> {
        // 帧已经完整读出，解码失败只丢弃这一条消息，不影响后续帧
        let message = match ServerMessage::decode(&frame.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("drop undecodable message: {}", e);
                return Ok(());
            }
        };
        debug!("received {} message", message.message_type());

        match self.handshake.on_message(&message)? {
            Step::Idle => {}
            Step::Granted { session } => {
                let unique_id = self
                    .uid
                    .generate(&session, &self.client_cfg.uid_salt)
                    .await
                    .map_err(session::Error::Uid)?;
                let login = self.handshake.login_message(unique_id, &self.client_cfg);
                self.write_message(&login).await?;
                self.state_tx.send_replace(self.handshake.state());
            }
            Step::LoggedIn(info) => {
                info!("logged in as player {:?}", info.id);
                self.state_tx.send_replace(self.handshake.state());
                if let Some(login_tx) = self.login_tx.take() {
                    let _ = login_tx.send(Ok(info));
                }
            }
        }

        if let ServerMessage::Ping = message {
            self.write_message(&ClientMessage::Pong).await?;
        }
        self.router.dispatch(message);
        Ok(())
    }

    async fn write_message(&mut self, message: &ClientMessage) -> Result<(), Error> {
        debug!("send {} message", message.message_type());
        let payload = message.encode()?;
        self.write_payload(payload).await
    }

    async fn write_payload(&mut self, payload: String) -> Result<(), Error> {
        let frame = Frame::new(payload).with_trailer(self.handshake.trailer());
        self.conn.write_frame(&frame).await?;
        Ok(())
    }
}
