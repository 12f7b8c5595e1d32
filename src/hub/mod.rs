pub mod broadcaster;
pub mod handler;

pub use broadcaster::{BroadcastHub, PriceUpdate};
pub use handler::{run_websocket_server, WebSocketHandler};
