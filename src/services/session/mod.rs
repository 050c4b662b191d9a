pub mod clock;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{SessionConfig, SessionError, SessionRecord, SessionStore};
pub use sweeper::spawn_sweeper;
