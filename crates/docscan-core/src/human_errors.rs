// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the scanning screen.
//
// Every technical error is mapped to plain language with a clear suggestion.
// The severity drives how the presentation layer shows it (toast, dialog, ...).

use crate::error::DocscanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Goes away on its own with the next frames or the next tap.
    Transient,
    /// User must do something (frame the document, hold still, grant access).
    ActionRequired,
    /// Cannot be fixed by retrying: broken input or configuration.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading or toast).
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether trying the same action again can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `DocscanError` into a `HumanError`.
pub fn humanize_error(err: &DocscanError) -> HumanError {
    match err {
        DocscanError::NotLocked => HumanError {
            message: "The document isn't locked yet.".into(),
            suggestion: "Place the whole document inside the frame and hold the camera steady for a moment.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        DocscanError::CaptureInFlight => HumanError {
            message: "Still processing the previous capture.".into(),
            suggestion: "Wait a second, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        DocscanError::NoFrame => HumanError {
            message: "The camera hasn't delivered a picture yet.".into(),
            suggestion: "Wait for the preview to appear, then try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        DocscanError::DegenerateGeometry(_) => HumanError {
            message: "The document outline wasn't usable.".into(),
            suggestion: "Move the camera so all four corners of the document are visible, then capture again.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        DocscanError::FrameSource(detail) => {
            let lowered = detail.to_ascii_lowercase();
            if lowered.contains("permission") || lowered.contains("denied") {
                HumanError {
                    message: "We don't have access to the camera.".into(),
                    suggestion: "Allow camera access in your device settings, then reopen the scanner.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "The camera stopped working.".into(),
                    suggestion: format!("Close other apps using the camera and reopen the scanner. ({detail})"),
                    retriable: false,
                    severity: Severity::Permanent,
                }
            }
        }

        DocscanError::InvalidImage(_) | DocscanError::ImageError(_) => HumanError {
            message: "This picture couldn't be processed.".into(),
            suggestion: "Try a different photo, or take the picture again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        DocscanError::InvalidConfig(detail) => HumanError {
            message: "The scanner settings are invalid.".into(),
            suggestion: format!("Reset the scanner settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        DocscanError::SessionAlreadyRunning => HumanError {
            message: "The scanner is already running.".into(),
            suggestion: "Close the scanner before starting it again.".into(),
            retriable: false,
            severity: Severity::Transient,
        },

        DocscanError::Session(_) => HumanError {
            message: "The scanner stopped unexpectedly.".into(),
            suggestion: "Reopen the scanner.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        DocscanError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file could not be found.".into(),
                suggestion: "Check the file name and location.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "We're not allowed to use that file.".into(),
                suggestion: "Choose a different location or check the file permissions.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "Reading or writing a file failed.".into(),
                suggestion: "Make sure there is enough free space, then try again.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        DocscanError::Serialization(_) => HumanError {
            message: "A settings file is damaged.".into(),
            suggestion: "Fix the JSON or delete the file to use the defaults.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_locked_asks_user_to_hold_still() {
        let human = humanize_error(&DocscanError::NotLocked);
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.retriable);
    }

    #[test]
    fn permission_denied_is_not_retried() {
        let human = humanize_error(&DocscanError::FrameSource("camera permission denied".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
        assert!(human.message.contains("camera"));
    }

    #[test]
    fn device_loss_is_permanent_for_the_session() {
        let human = humanize_error(&DocscanError::FrameSource("device unplugged".into()));
        assert_eq!(human.severity, Severity::Permanent);
        assert!(human.suggestion.contains("device unplugged"));
    }

    #[test]
    fn missing_file_needs_action() {
        let err = DocscanError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(humanize_error(&err).severity, Severity::ActionRequired);
    }
}
