//! Alert delivery: per-recipient queues, the notification transport seam,
//! and the tick-driven dispatcher that drains them at a bounded rate.

pub mod dispatcher;
pub mod queue;
pub mod transport;

pub use dispatcher::{AlertDispatcher, TickReport};
pub use queue::AlertQueues;
pub use transport::{AnyTransport, LogTransport, NotificationTransport, TelegramTransport};
