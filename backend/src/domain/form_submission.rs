use serde::Deserialize;

/// Notification delivered by the hosting platform when a site form is submitted.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SubmissionEvent {
    #[serde(default)]
    pub payload: Submission,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Submission {
    #[serde(default)]
    pub form_name: String,
    #[serde(default)]
    pub data: SubmissionData,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SubmissionData {
    pub email: Option<String>,
}

impl Submission {
    /// The submitted address, trimmed. Blank values count as absent.
    pub fn email(&self) -> Option<&str> {
        self.data
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
    }
}
