mod handshake;

pub use handshake::AuthAction;
pub use handshake::AuthStep;
pub use handshake::Authenticator;
pub use handshake::Greeting;
pub use handshake::scramble_native_password;
pub use handshake::write_login_packet;
