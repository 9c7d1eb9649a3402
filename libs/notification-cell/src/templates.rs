use shared_models::entities::{ApprovalStatus, CancellationActor};
use shared_utils::validation::escape_html;

use crate::models::{BookingSummary, NotificationEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

fn layout(heading: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"font-family: Arial, sans-serif; color: #1f2937;\">\
         <h2>{}</h2>{}<p style=\"color: #6b7280; font-size: 12px;\">Dentbook</p></body></html>",
        heading, body
    )
}

fn booking_table(summary: &BookingSummary) -> String {
    format!(
        "<table>\
         <tr><td><strong>Patient</strong></td><td>{}</td></tr>\
         <tr><td><strong>Treatment</strong></td><td>{}</td></tr>\
         <tr><td><strong>Dentist</strong></td><td>{}</td></tr>\
         <tr><td><strong>Practice</strong></td><td>{}</td></tr>\
         <tr><td><strong>Date</strong></td><td>{}</td></tr>\
         <tr><td><strong>Reference</strong></td><td>{}</td></tr>\
         </table>",
        escape_html(&summary.patient_name),
        escape_html(&summary.treatment_name),
        escape_html(&summary.dentist_name),
        escape_html(&summary.practice_name),
        summary.appointment_date.format("%A %-d %B %Y at %H:%M UTC"),
        summary.booking_id,
    )
}

/// Render the subject and HTML body for `event`. Output depends only on the inputs.
pub fn render(event: &NotificationEvent, app_base_url: &str) -> RenderedEmail {
    let base = app_base_url.trim_end_matches('/');

    match event {
        NotificationEvent::BookingCreated(summary) => RenderedEmail {
            subject: format!("New booking request from {}", summary.patient_name),
            html: layout(
                "New booking request",
                &format!(
                    "<p>A patient has booked an appointment and is awaiting your approval.</p>{}\
                     <p><a href=\"{}/practice/bookings/{}\">Review booking</a></p>",
                    booking_table(summary),
                    base,
                    summary.booking_id
                ),
            ),
        },
        NotificationEvent::BookingReceived(summary) => RenderedEmail {
            subject: format!("Your booking at {} has been received", summary.practice_name),
            html: layout(
                "Booking received",
                &format!(
                    "<p>Hi {}, we have passed your request to the practice. \
                     You will hear from us once they respond.</p>{}",
                    escape_html(&summary.patient_name),
                    booking_table(summary)
                ),
            ),
        },
        NotificationEvent::ApprovalChanged { summary, approval } => {
            let (subject, message) = match approval {
                ApprovalStatus::Approved => (
                    format!("Your appointment at {} is approved", summary.practice_name),
                    "Good news: the practice has approved your appointment.",
                ),
                ApprovalStatus::Rejected => (
                    format!("Your appointment at {} was declined", summary.practice_name),
                    "Unfortunately the practice could not accept your appointment. \
                     Please choose another slot.",
                ),
                ApprovalStatus::Pending => (
                    format!("Your appointment at {} is awaiting approval", summary.practice_name),
                    "Your appointment is waiting for the practice to respond.",
                ),
            };
            RenderedEmail {
                subject,
                html: layout(
                    "Appointment update",
                    &format!(
                        "<p>Hi {},</p><p>{}</p>{}\
                         <p><a href=\"{}/bookings/{}\">View booking</a></p>",
                        escape_html(&summary.patient_name),
                        message,
                        booking_table(summary),
                        base,
                        summary.booking_id
                    ),
                ),
            }
        }
        NotificationEvent::BookingCancelled {
            summary,
            cancelled_by,
            reason,
        } => {
            let who = match cancelled_by {
                CancellationActor::Patient => "The patient",
                CancellationActor::Practice => "The practice",
            };
            let reason_html = reason
                .as_deref()
                .filter(|r| !r.trim().is_empty())
                .map(|r| format!("<p><strong>Reason:</strong> {}</p>", escape_html(r)))
                .unwrap_or_default();
            RenderedEmail {
                subject: format!(
                    "Appointment on {} cancelled",
                    summary.appointment_date.format("%-d %B %Y")
                ),
                html: layout(
                    "Appointment cancelled",
                    &format!(
                        "<p>{} has cancelled this appointment.</p>{}{}",
                        who,
                        reason_html,
                        booking_table(summary)
                    ),
                ),
            }
        }
        NotificationEvent::Welcome {
            full_name,
            verification_token,
            ..
        } => {
            let greeting = full_name
                .as_deref()
                .map(escape_html)
                .unwrap_or_else(|| "there".to_string());
            RenderedEmail {
                subject: "Welcome to Dentbook".to_string(),
                html: layout(
                    "Welcome to Dentbook",
                    &format!(
                        "<p>Hi {},</p><p>Please confirm your email address to finish setting up \
                         your account.</p><p><a href=\"{}/verify-email?token={}\">Verify email</a></p>",
                        greeting, base, verification_token
                    ),
                ),
            }
        }
        NotificationEvent::PasswordReset { reset_token, .. } => RenderedEmail {
            subject: "Reset your Dentbook password".to_string(),
            html: layout(
                "Password reset",
                &format!(
                    "<p>Someone asked to reset the password for this account. \
                     The link expires in one hour.</p>\
                     <p><a href=\"{}/reset-password?token={}\">Choose a new password</a></p>\
                     <p>If this wasn't you, you can ignore this email.</p>",
                    base, reset_token
                ),
            ),
        },
    }
}
