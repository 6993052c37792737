mod call_shapes;
mod errors;
mod helpers;
mod lifecycle;
mod raw_peer;
mod websocket;
