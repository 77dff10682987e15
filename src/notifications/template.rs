use super::{DownloadEmail, OutgoingMail};

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_download_email(email: &DownloadEmail) -> OutgoingMail {
    let title = escape_html(&email.book_title);
    let url = escape_html(&email.redemption_url);
    let format = email.format.as_str();

    let html_body = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Your e-book is ready</h2>
  <p>Thank you for your support! Your copy of <strong>{title}</strong> ({format}) is ready to download.</p>
  <p style="margin: 24px 0;">
    <a href="{url}" style="background: #2563eb; color: #fff; padding: 12px 20px; border-radius: 6px; text-decoration: none;">Download {format}</a>
  </p>
  <p>If the button does not work, copy this link into your browser:<br><a href="{url}">{url}</a></p>
  <p style="color: #6b7280; font-size: 12px;">This link is only valid for a limited time.</p>
</div>"#
    );

    let text_body = format!(
        "Your copy of {} ({}) is ready to download.\n\n{}\n\nThis link is only valid for a limited time.\n",
        email.book_title, format, email.redemption_url
    );

    OutgoingMail {
        to: email.to.clone(),
        subject: format!("Your download link: {}", email.book_title),
        text_body,
        html_body,
    }
}
