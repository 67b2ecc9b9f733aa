pub mod merge;
pub mod registry;
pub mod scroll;
pub mod session;

pub use merge::merge;
pub use registry::SessionRegistry;
pub use scroll::{IntersectionObserver, ScrollTrigger};
pub use session::{FeedContext, FeedSession, FeedSettings, FetchPhase, LoadOutcome};
