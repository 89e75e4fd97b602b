/// Outcome of a control-surface command: success flag plus a message
/// meant for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStatus {
    pub ok: bool,
    pub message: String,
}

impl CommandStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
