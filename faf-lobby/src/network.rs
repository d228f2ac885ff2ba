//! 网络层
//! 本层只关心帧的读写，不包含任何协议相关逻辑

pub use conn::{Connection, Error};
pub use frame::{Frame, Trailer, DEFAULT_MAX_FRAME_SIZE};

pub mod conn;
pub mod frame;
