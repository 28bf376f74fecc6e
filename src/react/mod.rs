//! 认知层：Planner、System prompt、TurnEngine 主循环、交互事件

pub mod events;
pub mod loop_;
pub mod planner;
pub mod prompt;

pub use events::{ActionRecord, InteractionEvent, InteractionResult, InteractionStatus};
pub use loop_::{TurnEngine, MAX_TURNS_MESSAGE};
pub use planner::Planner;
pub use prompt::{load_system_prompt, DEFAULT_SYSTEM_PROMPT};
