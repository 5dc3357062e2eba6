pub mod presence_routes;
pub mod presence_websocket;
