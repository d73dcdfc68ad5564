pub mod clock;
pub mod games;
pub mod room;
pub mod server;

pub use clock::{Clock, SystemClock};
pub use room::{RoomDocument, RoomError, RoomService};
