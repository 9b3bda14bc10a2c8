use async_trait::async_trait;

/// A fully rendered message, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub subject: String,
    pub html_content: String,
    pub text_content: String,
    /// Target of the `List-Unsubscribe` header. Transports pair it with
    /// `List-Unsubscribe-Post: List-Unsubscribe=One-Click`.
    pub list_unsubscribe: Option<String>,
}

#[async_trait]
pub trait EmailClient {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), anyhow::Error>;
}
