//! Email template rendering engine.
//!
//! Handlebars templates for the three reservation emails, each with an HTML and a
//! plain text body.

use crate::error::{NotificationError, NotificationResult};
use crate::models::{ReminderEmailData, ReservationEmailData, StateChangedEmailData};
use handlebars::Handlebars;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Rendered email content.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
    pub subject: String,
}

/// Template engine for rendering email templates. Cheap to clone.
#[derive(Clone)]
pub struct TemplateEngine {
    handlebars: Arc<Handlebars<'static>>,
}

const TEMPLATES: [(&str, &str); 6] = [
    ("confirmation_html", CONFIRMATION_HTML_TEMPLATE),
    ("confirmation_text", CONFIRMATION_TEXT_TEMPLATE),
    ("state_changed_html", STATE_CHANGED_HTML_TEMPLATE),
    ("state_changed_text", STATE_CHANGED_TEXT_TEMPLATE),
    ("reminder_html", REMINDER_HTML_TEMPLATE),
    ("reminder_text", REMINDER_TEXT_TEMPLATE),
];

impl TemplateEngine {
    /// Create a new template engine with all templates registered.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();

        for (name, source) in TEMPLATES {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| NotificationError::TemplateError(format!("Failed to register {}: {}", name, e)))?;
        }

        Ok(Self {
            handlebars: Arc::new(handlebars),
        })
    }

    fn render<T: Serialize>(&self, template_name: &str, data: &T) -> NotificationResult<String> {
        Ok(self.handlebars.render(template_name, data)?)
    }

    pub fn render_confirmation(&self, data: &ReservationEmailData) -> NotificationResult<RenderedEmail> {
        debug!(reservation_id = %data.reservation_id, "Rendering confirmation email");

        Ok(RenderedEmail {
            html: self.render("confirmation_html", data)?,
            text: self.render("confirmation_text", data)?,
            subject: format!("Reservation confirmed - {}", data.company_name),
        })
    }

    pub fn render_state_changed(&self, data: &StateChangedEmailData) -> NotificationResult<RenderedEmail> {
        debug!(
            reservation_id = %data.reservation.reservation_id,
            previous = %data.previous_state,
            current = %data.current_state,
            "Rendering state change email"
        );

        Ok(RenderedEmail {
            html: self.render("state_changed_html", data)?,
            text: self.render("state_changed_text", data)?,
            subject: format!(
                "Reservation {} - {}",
                data.current_state.to_lowercase(),
                data.reservation.company_name
            ),
        })
    }

    pub fn render_reminder(&self, data: &ReminderEmailData) -> NotificationResult<RenderedEmail> {
        debug!(
            reservation_id = %data.reservation.reservation_id,
            days_remaining = data.days_remaining,
            "Rendering reminder email"
        );

        Ok(RenderedEmail {
            html: self.render("reminder_html", data)?,
            text: self.render("reminder_text", data)?,
            subject: format!(
                "Your reservation starts {} - {}",
                data.starts_in, data.reservation.company_name
            ),
        })
    }
}

// ============================================================================
// Email Templates
// ============================================================================

const CONFIRMATION_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Reservation confirmed</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          Your reservation is confirmed
        </h1>
        <p style="color: #52525b; font-size: 16px; line-height: 24px; margin: 0 0 24px 0;">
          Hi {{user_name}}, your booking of <strong>{{product_name}}</strong> is confirmed.
        </p>
        <table width="100%" cellspacing="0" cellpadding="0" style="margin-bottom: 24px;">
          <tr>
            <td style="background-color: #f4f4f5; border-radius: 6px; padding: 16px;">
              <p style="color: #52525b; font-size: 14px; margin: 0 0 8px 0;"><strong>Check-in:</strong> {{start_date}}</p>
              <p style="color: #52525b; font-size: 14px; margin: 0 0 8px 0;"><strong>Check-out:</strong> {{end_date}}</p>
              <p style="color: #52525b; font-size: 14px; margin: 0 0 8px 0;"><strong>Days:</strong> {{days}}</p>
              <p style="color: #52525b; font-size: 14px; margin: 0;"><strong>Total:</strong> {{total_price}}</p>
              {{#if observations}}
              <p style="color: #52525b; font-size: 14px; margin: 8px 0 0 0;"><strong>Notes:</strong> {{observations}}</p>
              {{/if}}
            </td>
          </tr>
        </table>
        <table width="100%" cellspacing="0" cellpadding="0">
          <tr>
            <td style="text-align: center;">
              <a href="{{reservation_url}}" style="display: inline-block; background-color: #2563eb; color: #ffffff; font-size: 16px; font-weight: 500; padding: 12px 32px; text-decoration: none; border-radius: 6px;">
                View reservation
              </a>
            </td>
          </tr>
        </table>
      </td>
    </tr>
    <tr>
      <td style="padding: 24px 0; text-align: center;">
        <p style="color: #a1a1aa; font-size: 11px; margin: 0;">{{company_name}}</p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const CONFIRMATION_TEXT_TEMPLATE: &str = r#"Your reservation is confirmed

Hi {{user_name}}, your booking of {{product_name}} is confirmed.

Check-in:  {{start_date}}
Check-out: {{end_date}}
Days:      {{days}}
Total:     {{total_price}}
{{#if observations}}
Notes:     {{observations}}
{{/if}}

View reservation: {{reservation_url}}

---
{{company_name}}"#;

const STATE_CHANGED_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Reservation update</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          Reservation update
        </h1>
        <p style="color: #52525b; font-size: 16px; line-height: 24px; margin: 0 0 24px 0;">
          Hi {{user_name}}, your reservation of <strong>{{product_name}}</strong>
          ({{start_date}} to {{end_date}}) changed from <strong>{{previous_state}}</strong>
          to <strong>{{current_state}}</strong>.
        </p>
        {{#if cancellation_reason}}
        <table width="100%" cellspacing="0" cellpadding="0" style="margin-bottom: 24px;">
          <tr>
            <td style="background-color: #fef3c7; border-radius: 8px; padding: 16px; border-left: 4px solid #f59e0b;">
              <p style="color: #92400e; font-size: 14px; margin: 0;"><strong>Reason:</strong> {{cancellation_reason}}</p>
            </td>
          </tr>
        </table>
        {{/if}}
        <table width="100%" cellspacing="0" cellpadding="0">
          <tr>
            <td style="text-align: center;">
              <a href="{{reservation_url}}" style="display: inline-block; background-color: #18181b; color: #ffffff; font-size: 16px; font-weight: 500; padding: 12px 32px; text-decoration: none; border-radius: 6px;">
                View reservation
              </a>
            </td>
          </tr>
        </table>
      </td>
    </tr>
    <tr>
      <td style="padding: 24px 0; text-align: center;">
        <p style="color: #a1a1aa; font-size: 11px; margin: 0;">{{company_name}}</p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const STATE_CHANGED_TEXT_TEMPLATE: &str = r#"Reservation update

Hi {{user_name}}, your reservation of {{product_name}} ({{start_date}} to {{end_date}})
changed from {{previous_state}} to {{current_state}}.
{{#if cancellation_reason}}

Reason: {{cancellation_reason}}
{{/if}}

View reservation: {{reservation_url}}

---
{{company_name}}"#;

const REMINDER_HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Upcoming reservation</title>
</head>
<body style="margin: 0; padding: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background-color: #f4f4f5;">
  <table role="presentation" width="100%" cellspacing="0" cellpadding="0" style="max-width: 600px; margin: 0 auto; padding: 40px 20px;">
    <tr>
      <td style="background-color: #ffffff; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1);">
        <h1 style="color: #18181b; font-size: 24px; font-weight: 600; margin: 0 0 16px 0; text-align: center;">
          Your reservation starts {{starts_in}}
        </h1>
        <p style="color: #52525b; font-size: 16px; line-height: 24px; margin: 0 0 24px 0;">
          Hi {{user_name}}, this is a reminder that your booking of <strong>{{product_name}}</strong>
          begins on {{start_date}} and ends on {{end_date}}.
        </p>
        <table width="100%" cellspacing="0" cellpadding="0">
          <tr>
            <td style="text-align: center;">
              <a href="{{reservation_url}}" style="display: inline-block; background-color: #2563eb; color: #ffffff; font-size: 16px; font-weight: 500; padding: 12px 32px; text-decoration: none; border-radius: 6px;">
                View reservation
              </a>
            </td>
          </tr>
        </table>
      </td>
    </tr>
    <tr>
      <td style="padding: 24px 0; text-align: center;">
        <p style="color: #a1a1aa; font-size: 11px; margin: 0;">{{company_name}}</p>
      </td>
    </tr>
  </table>
</body>
</html>"#;

const REMINDER_TEXT_TEMPLATE: &str = r#"Your reservation starts {{starts_in}}

Hi {{user_name}}, this is a reminder that your booking of {{product_name}}
begins on {{start_date}} and ends on {{end_date}}.

View reservation: {{reservation_url}}

---
{{company_name}}"#;
