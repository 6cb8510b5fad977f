//! Application use cases / business logic

pub mod media;
pub mod publish;
pub mod render;
pub mod run_loop;
pub mod schedule_oracle;
pub mod session;

pub use media::{MediaConfig, MediaUploader};
pub use publish::{CrossPoster, PublishConfig, PublishOutcome};
pub use render::{RenderConfig, Renderer};
pub use run_loop::{PollingConfig, RunLoop, RunLoopConfig, RunLoopError, should_poll};
pub use schedule_oracle::{ScheduleConfig, ScheduleOracle};
pub use session::SessionCache;
