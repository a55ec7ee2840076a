pub mod lines;
pub mod rtlamr;
pub mod stats;

pub use lines::LineReaderSource;
pub use rtlamr::RtlamrMonitor;
pub use stats::{MonitorState, MonitorStats};
