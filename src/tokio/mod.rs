//! Async I/O: packet stream, per-connection session loop, TCP listener

mod server;
mod session;
mod stream;

pub use server::Server;
pub use session::Session;
pub use stream::PacketStream;
