use serde::Serialize;

/// Row of the `members` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub email: String,
    pub full_name: String,
    pub first_name: String,
    pub active: bool,
}

impl Member {
    /// Build a member from an e-mail and a display name.
    /// The first name defaults to the first word of the full name.
    pub fn new(email: &str, full_name: &str) -> Self {
        let first_name = full_name
            .split_whitespace()
            .next()
            .unwrap_or(full_name)
            .to_string();

        Self {
            email: email.trim().to_string(),
            full_name: full_name.trim().to_string(),
            first_name,
            active: true,
        }
    }
}
