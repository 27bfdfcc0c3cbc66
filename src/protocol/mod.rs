pub mod command;
pub mod link;
pub mod response;
pub mod scripted;
pub mod tty;

pub use command::Command;
pub use link::{LineChannel, SerialLink};
pub use response::{DeviceReply, SensorReading};
pub use scripted::ScriptedDevice;
