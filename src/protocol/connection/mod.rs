mod auth;
mod handshake;

pub use auth::authenticate;
pub use auth::scramble_native_password;

pub use handshake::CONNECTION_ID;
pub use handshake::HandshakeResponse;
pub use handshake::USERNAME_OFFSET;
pub use handshake::read_handshake_response;
pub use handshake::write_initial_handshake;
