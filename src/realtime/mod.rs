mod hub;
pub mod websocket;

pub use hub::QueueHub;
pub use websocket::queue_websocket;
