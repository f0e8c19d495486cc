use std::fmt;

/// The adapter's own authenticated account on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub id: String,
    pub username: String,
}

impl Identity {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
        }
    }

    /// Compares a handle against ours, ignoring a leading `@` and case.
    pub fn is_handle(&self, handle: &str) -> bool {
        handle
            .trim_start_matches('@')
            .eq_ignore_ascii_case(&self.username)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.username)
    }
}
