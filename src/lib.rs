pub mod command;
pub mod compound;
pub mod constants;
pub mod error;
pub mod frame;
pub mod global;
pub mod port;
pub mod primitives;
pub mod transport;
pub mod wire;

pub mod mock;

pub use command::CommandType;
pub use error::DatagramError;
pub use port::Port;
pub use transport::LinkLayer;
