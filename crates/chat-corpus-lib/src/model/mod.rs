//! Records passed between pipeline stages.

pub mod chat_record;
pub mod message;
pub mod turn;
