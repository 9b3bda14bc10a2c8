use crate::domain::email_client::OutgoingEmail;

pub const WELCOME_SUBJECT: &str = "Welcome to Below The Line";

/// Link to the unsubscribe endpoint with the recipient form-encoded in the query.
pub fn unsubscribe_link(base_url: &str, recipient: &str) -> Result<String, anyhow::Error> {
    let query = serde_urlencoded::to_string([("email", recipient)])?;

    Ok(format!(
        "{}/unsubscribe?{}",
        base_url.trim_end_matches('/'),
        query
    ))
}

pub fn build_welcome_email(recipient: &str, base_url: &str) -> Result<OutgoingEmail, anyhow::Error> {
    let unsubscribe_link = unsubscribe_link(base_url, recipient)?;

    let html_content = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="margin:0;padding:0;background:#0f172a;font-family:Helvetica,Arial,sans-serif;color:#e2e8f0;">
    <table role="presentation" width="100%" cellpadding="0" cellspacing="0">
      <tr>
        <td align="center" style="padding:32px 16px;">
          <table role="presentation" width="560" cellpadding="0" cellspacing="0" style="max-width:560px;">
            <tr>
              <td style="font-size:24px;font-weight:bold;padding-bottom:16px;">You're on the list.</td>
            </tr>
            <tr>
              <td style="font-size:16px;line-height:1.5;padding-bottom:16px;">
                Every Saturday, after Friday's close, we'll send you the stocks trading below
                or closing in on their 200-week moving average, with how far each one sits
                from the line and how past touches played out.
              </td>
            </tr>
            <tr>
              <td style="font-size:16px;line-height:1.5;padding-bottom:32px;">
                No noise, no predictions. Just the line.
              </td>
            </tr>
            <tr>
              <td style="font-size:12px;color:#94a3b8;">
                Not for you anymore? <a href="{unsubscribe_link}" style="color:#94a3b8;">Unsubscribe</a>.
              </td>
            </tr>
          </table>
        </td>
      </tr>
    </table>
  </body>
</html>"#
    );

    let text_content = format!(
        "You're on the list.\n\n\
         Every Saturday, after Friday's close, we'll send you the stocks trading below \
         or closing in on their 200-week moving average.\n\n\
         No noise, no predictions. Just the line.\n\n\
         Unsubscribe: {}",
        unsubscribe_link
    );

    Ok(OutgoingEmail {
        recipient: recipient.to_string(),
        subject: WELCOME_SUBJECT.to_string(),
        html_content,
        text_content,
        list_unsubscribe: Some(unsubscribe_link),
    })
}
