pub mod chat;
pub mod table;

pub use chat::{ChatRequest, ChatResponse};
pub use table::{ColumnDescriptor, SampleRow, TableContext};
