//! Tuning knobs of the stores, validated once at construction.

use std::time::Duration;

use super::error::{AppError, AppResult};

/// Posts fetched per feed page.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Upper bound for one store operation, retries included (15 seconds).
pub const DEFAULT_OPERATION_TIMEOUT_MILLIS: u64 = 15_000;
/// Quiet period before an email availability query is sent.
pub const DEFAULT_EMAIL_CHECK_DEBOUNCE_MILLIS: u64 = 500;
pub const DEFAULT_COMMENT_MAX_CHARS: usize = 1_000;

const MAX_PAGE_SIZE: usize = 1_000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSettings {
    page_size: usize,
    operation_timeout: Duration,
    email_check_debounce: Duration,
    comment_max_chars: usize,
}

impl SyncSettings {
    pub fn new(
        page_size: usize,
        operation_timeout: Duration,
        email_check_debounce: Duration,
        comment_max_chars: usize,
    ) -> AppResult<Self> {
        validate_page_size(page_size)?;
        validate_operation_timeout(operation_timeout)?;
        validate_comment_max_chars(comment_max_chars)?;
        Ok(Self {
            page_size,
            operation_timeout,
            email_check_debounce,
            comment_max_chars,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    pub fn email_check_debounce(&self) -> Duration {
        self.email_check_debounce
    }

    pub fn comment_max_chars(&self) -> usize {
        self.comment_max_chars
    }

    /// Returns a copy with the values of `update` applied, validated.
    pub fn apply(&self, update: SyncSettingsUpdate) -> AppResult<Self> {
        Self::new(
            update.page_size.unwrap_or(self.page_size),
            update.operation_timeout.unwrap_or(self.operation_timeout),
            update
                .email_check_debounce
                .unwrap_or(self.email_check_debounce),
            update.comment_max_chars.unwrap_or(self.comment_max_chars),
        )
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            operation_timeout: Duration::from_millis(DEFAULT_OPERATION_TIMEOUT_MILLIS),
            email_check_debounce: Duration::from_millis(DEFAULT_EMAIL_CHECK_DEBOUNCE_MILLIS),
            comment_max_chars: DEFAULT_COMMENT_MAX_CHARS,
        }
    }
}

/// Partial update to apply on top of existing settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSettingsUpdate {
    pub page_size: Option<usize>,
    pub operation_timeout: Option<Duration>,
    pub email_check_debounce: Option<Duration>,
    pub comment_max_chars: Option<usize>,
}

fn validate_page_size(value: usize) -> AppResult<()> {
    if value == 0 || value > MAX_PAGE_SIZE {
        return Err(AppError::InvalidSettings {
            field: "page_size",
            message: format!("must be between 1 and {MAX_PAGE_SIZE}, got {value}"),
        });
    }
    Ok(())
}

fn validate_operation_timeout(value: Duration) -> AppResult<()> {
    if value.is_zero() {
        return Err(AppError::InvalidSettings {
            field: "operation_timeout",
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

fn validate_comment_max_chars(value: usize) -> AppResult<()> {
    if value == 0 {
        return Err(AppError::InvalidSettings {
            field: "comment_max_chars",
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
