use std::{
    collections::HashMap,
    mem,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    thread,
};

use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    executor, StreamExt,
};
use log::{debug, error, warn};

use super::{
    server::{GameInfo, GameLaunch, GameTypeInfo, Notice, PlayerInfo, Social, Welcome},
    ServerMessage, ServerMessageType,
};

type Listener = Arc<dyn Fn(&ServerMessage) + Send + Sync>;

/// 监听器注册表
/// 同一类型的监听器按注册顺序排列
#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<ServerMessageType, Vec<(u64, Listener)>>,
}

impl Registry {
    fn insert(&mut self, kind: ServerMessageType, listener: Listener) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.entry(kind).or_default().push((id, listener));
        id
    }

    fn remove(&mut self, kind: ServerMessageType, id: u64) {
        if let Some(listeners) = self.listeners.get_mut(&kind) {
            listeners.retain(|(i, _)| *i != id);
            if listeners.is_empty() {
                self.listeners.remove(&kind);
            }
        }
    }

    fn listeners_of(&self, kind: ServerMessageType) -> Vec<Listener> {
        self.listeners
            .get(&kind)
            .map(|listeners| listeners.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default()
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // 监听器在锁外执行，锁不会因为监听器 panic 而中毒，这里只是兜底
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 按消息类型把服务器消息分发给监听器
///
/// 读循环只负责把消息放进无界队列，监听器在独立的分发线程中依次执行，
/// 慢的监听器不会阻塞帧的读取和心跳回复
#[derive(Clone)]
pub struct Router {
    registry: Arc<Mutex<Registry>>,
    dispatch_tx: UnboundedSender<ServerMessage>,
}

impl Router {
    /// 创建 router 并启动分发线程
    /// 所有 router 副本销毁或调用 [`Router::close`] 后，分发线程处理完剩余消息自动退出
    pub(crate) fn new() -> Self {
        let (router, dispatcher) = Self::unstarted();
        thread::spawn(move || executor::block_on(dispatcher.start()));
        router
    }

    fn unstarted() -> (Self, Dispatcher) {
        let registry = Arc::new(Mutex::new(Registry::default()));
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded();
        let dispatcher = Dispatcher {
            registry: registry.clone(),
            dispatch_rx,
        };
        (
            Self {
                registry,
                dispatch_tx,
            },
            dispatcher,
        )
    }

    /// 注册监听器，返回的 [`Subscription`] 销毁时移除该监听器
    pub fn add_listener<F>(&self, kind: ServerMessageType, listener: F) -> Subscription
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        let id = lock(&self.registry).insert(kind, Arc::new(listener));
        Subscription {
            registry: Arc::downgrade(&self.registry),
            kind,
            id,
            active: true,
        }
    }

    pub fn on_welcome<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Welcome) + Send + Sync + 'static,
    {
        self.add_listener(ServerMessageType::Welcome, move |message| {
            if let ServerMessage::Welcome(welcome) = message {
                listener(welcome)
            }
        })
    }

    pub fn on_game_type_info<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&GameTypeInfo) + Send + Sync + 'static,
    {
        self.add_listener(ServerMessageType::GameTypeInfo, move |message| {
            if let ServerMessage::GameTypeInfo(info) = message {
                listener(info)
            }
        })
    }

    pub fn on_game_info<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&GameInfo) + Send + Sync + 'static,
    {
        self.add_listener(ServerMessageType::GameInfo, move |message| {
            if let ServerMessage::GameInfo(info) = message {
                listener(info)
            }
        })
    }

    pub fn on_player_info<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PlayerInfo) + Send + Sync + 'static,
    {
        self.add_listener(ServerMessageType::PlayerInfo, move |message| {
            if let ServerMessage::PlayerInfo(info) = message {
                listener(info)
            }
        })
    }

    pub fn on_game_launch<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&GameLaunch) + Send + Sync + 'static,
    {
        self.add_listener(ServerMessageType::GameLaunch, move |message| {
            if let ServerMessage::GameLaunch(launch) = message {
                listener(launch)
            }
        })
    }

    pub fn on_social<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Social) + Send + Sync + 'static,
    {
        self.add_listener(ServerMessageType::Social, move |message| {
            if let ServerMessage::Social(social) = message {
                listener(social)
            }
        })
    }

    pub fn on_notice<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Notice) + Send + Sync + 'static,
    {
        self.add_listener(ServerMessageType::Notice, move |message| {
            if let ServerMessage::Notice(notice) = message {
                listener(notice)
            }
        })
    }

    /// 关闭分发队列，之后分发的消息都会被丢弃
    ///
    /// 监听器可能持有 router 副本，只靠副本计数分发线程永远不会退出，
    /// 所以由所有者显式关闭
    pub(crate) fn close(&self) {
        self.dispatch_tx.close_channel();
    }

    /// 放入分发队列，不会阻塞
    pub(crate) fn dispatch(&self, message: ServerMessage) {
        if let Err(e) = self.dispatch_tx.unbounded_send(message) {
            warn!(
                "dispatcher gone, drop {} message",
                e.into_inner().message_type()
            );
        }
    }
}

/// 分发线程
struct Dispatcher {
    registry: Arc<Mutex<Registry>>,
    dispatch_rx: UnboundedReceiver<ServerMessage>,
}

impl Dispatcher {
    async fn start(mut self) {
        debug!("start dispatcher loop");
        while let Some(message) = self.dispatch_rx.next().await {
            let kind = message.message_type();
            // 先复制出监听器再执行，监听器内部可以增删监听器
            let listeners = lock(&self.registry).listeners_of(kind);
            for listener in listeners {
                if panic::catch_unwind(AssertUnwindSafe(|| listener(&message))).is_err() {
                    error!("listener for {} message panicked", kind);
                }
            }
        }

        // 释放监听器，打破 监听器 -> router -> 注册表 的循环引用
        // 先移出再销毁，监听器持有的 Subscription 销毁时也要加锁
        let listeners = mem::take(&mut lock(&self.registry).listeners);
        drop(listeners);
        debug!("dispatcher loop exit");
    }
}

/// 监听器的注册凭证
///
/// 销毁或调用 [`Subscription::cancel`] 时移除对应的监听器
#[must_use = "dropping a Subscription removes its listener"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    kind: ServerMessageType,
    id: u64,
    active: bool,
}

impl Subscription {
    pub fn message_type(&self) -> ServerMessageType {
        self.kind
    }

    pub fn cancel(self) {}

    /// 放弃凭证，监听器一直保留到 router 销毁
    pub fn detach(mut self) {
        self.active = false;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).remove(self.kind, self.id);
        }
    }
}
