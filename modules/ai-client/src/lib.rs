pub mod claude;
pub mod error;
pub mod traits;
pub mod util;

pub use claude::{Claude, ClaudePromptBuilder};
pub use error::{AiError, Result};
pub use traits::{Agent, PromptBuilder};
pub use util::truncate_to_char_boundary;
