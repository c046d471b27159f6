pub mod openai;
pub mod traits;

pub use openai::OpenAiClient;
pub use traits::{
    ChatMessage, CompletionClient, CompletionRequest, ContentPart, ImageUrl, MessageContent,
};
