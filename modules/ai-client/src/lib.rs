pub mod error;
pub mod openai;
pub mod perplexity;
pub mod util;

pub use error::{AiError, Result};
pub use openai::{OpenAi, StructuredOutput, VisionOptions};
pub use perplexity::{Perplexity, SearchAnswer};
pub use util::{strip_code_blocks, truncate_to_char_boundary};
