use serde_json::{json, Value};

use crate::explorer::transport::BackendConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Message {
    pub(crate) role: Role,
    pub(crate) content: String,
}

/// One multi-turn conversation. The backend address and model are fixed at
/// construction; the transcript only ever grows, in conversational order.
pub(crate) struct ChatSession {
    config: BackendConfig,
    messages: Vec<Message>,
}

impl ChatSession {
    pub(crate) fn new(config: BackendConfig) -> Self {
        Self {
            config,
            messages: Vec::new(),
        }
    }

    pub(crate) fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub(crate) fn add_system(&mut self, content: impl Into<String>) {
        self.push(Role::System, content.into());
    }

    pub(crate) fn add_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into());
    }

    pub(crate) fn add_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into());
    }

    fn push(&mut self, role: Role, content: String) {
        self.messages.push(Message { role, content });
    }

    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Read-only wire projection for the chat endpoint.
    pub(crate) fn to_wire(&self) -> Value {
        Value::Array(
            self.messages()
                .iter()
                .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
                .collect(),
        )
    }
}
