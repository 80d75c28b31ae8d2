use std::fmt;

/// The user a command acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActingUser {
    pub id: i64,
}

/// One-shot message reported back to the user after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flash {
    Success(String),
    Error(String),
}

impl fmt::Display for Flash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flash::Success(msg) => write!(f, "{}", msg),
            Flash::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Per-invocation state passed explicitly through every operation.
#[derive(Debug, Default)]
pub struct RequestContext {
    user: Option<ActingUser>,
    flashes: Vec<Flash>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(id: i64) -> Self {
        Self {
            user: Some(ActingUser { id }),
            flashes: Vec::new(),
        }
    }

    pub fn user(&self) -> Option<&ActingUser> {
        self.user.as_ref()
    }

    pub fn success(&mut self, msg: impl Into<String>) {
        self.flashes.push(Flash::Success(msg.into()));
    }

    pub fn error(&mut self, msg: impl Into<String>) {
        self.flashes.push(Flash::Error(msg.into()));
    }

    /// Take all pending messages, leaving none behind.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }

    pub fn has_errors(&self) -> bool {
        self.flashes.iter().any(|f| matches!(f, Flash::Error(_)))
    }
}
