//! Extracts the fenced status block from AI chat replies and maps it onto
//! user-defined fields.

pub mod error;
pub mod export;
pub mod extract;
pub mod history;
pub mod mapping;
pub mod prompt;
pub mod schema;
pub mod settings;
pub mod tracker;

pub use error::{Result, StatusError};
pub use extract::{BlockExtractor, DecodedBlock, DEFAULT_MARKER};
pub use history::{find_latest_block, load_chat, parse_chat, ChatMessage};
pub use mapping::map_fields;
pub use prompt::{generate_status_prompt, prompt_injection, PromptInjection};
pub use schema::{DualNumber, FieldDescriptor, FieldType, FieldValue, News, StatusRecord};
pub use settings::{CustomPrompt, FixedFieldsEnabled, Language, Settings};
pub use tracker::{HostEvent, LatestStatus, StatusSink, StatusTracker};
