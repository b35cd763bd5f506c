//! Alert partial for displaying success, informational and error messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

/// Alert message types for styling
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlertType {
    Success,
    Info,
    Error,
}

/// An alert message with a short summary and optional details.
#[derive(Debug, Clone)]
pub struct Alert<'a> {
    pub alert_type: AlertType,
    pub message: &'a str,
    pub details: &'a str,
}

impl<'a> Alert<'a> {
    /// Create a new success alert
    pub fn success(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Success,
            message,
            details,
        }
    }

    /// Create a new informational alert
    pub fn info(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Info,
            message,
            details,
        }
    }

    /// Create a new error alert
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message,
            details,
        }
    }

    pub fn into_html(self) -> Markup {
        let style = match self.alert_type {
            AlertType::Success => {
                "p-4 mb-4 text-sm rounded text-green-800 bg-green-50 \
                dark:bg-gray-800 dark:text-green-400"
            }
            AlertType::Info => {
                "p-4 mb-4 text-sm rounded text-blue-800 bg-blue-50 \
                dark:bg-gray-800 dark:text-blue-400"
            }
            AlertType::Error => {
                "p-4 mb-4 text-sm rounded text-red-800 bg-red-50 \
                dark:bg-gray-800 dark:text-red-400"
            }
        };

        html!(
            div class=(style) role="alert"
            {
                span class="font-medium" { (self.message) }

                @if !self.details.is_empty() {
                    " " (self.details)
                }
            }
        )
    }

    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, self.into_html()).into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use crate::test_utils::assert_valid_html;

    use super::Alert;

    #[test]
    fn renders_message_and_details() {
        let markup = Alert::error("Something went wrong", "Check the server logs.").into_html();

        let fragment = scraper::Html::parse_fragment(&markup.into_string());
        assert_valid_html(&fragment);

        let selector = scraper::Selector::parse("div[role=alert]").unwrap();
        let alert = fragment
            .select(&selector)
            .next()
            .expect("expected an alert div");
        let text = alert.text().collect::<String>();
        assert!(text.contains("Something went wrong"));
        assert!(text.contains("Check the server logs."));
    }

    #[test]
    fn omits_empty_details() {
        let markup = Alert::success("Saved", "").into_html();

        let fragment = scraper::Html::parse_fragment(&markup.into_string());
        let selector = scraper::Selector::parse("div[role=alert]").unwrap();
        let alert = fragment.select(&selector).next().unwrap();
        let text = alert.text().collect::<String>();

        assert_eq!(text.trim(), "Saved");
    }
}
