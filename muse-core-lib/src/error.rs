use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Result of a single decode or parse call.
///
/// On success it carries the decoded value together with the number of bytes
/// consumed from the start of the input buffer.
pub type DecodeResult<T> = Result<(T, usize), DecodeError>;

/// Why a decode or parse call did not produce a value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer is a valid but incomplete prefix. Retry from the same offset
    /// once more bytes have arrived.
    #[error("need more input data")]
    NeedMoreData,

    /// Structural or syntax violation. Retrying with more bytes will not help.
    #[error("parse failure: {0}")]
    BadString(&'static str),

    /// The version line is well formed but announces an unsupported protocol.
    #[error("unsupported protocol number {0}")]
    BadVersion(u16),
}

impl DecodeError {
    /// Only `NeedMoreData` is worth retrying with a longer buffer.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DecodeError::NeedMoreData)
    }

    pub fn code(&self) -> ResultCode {
        match self {
            DecodeError::NeedMoreData => ResultCode::NeedMoreData,
            DecodeError::BadString(_) => ResultCode::BadString,
            DecodeError::BadVersion(_) => ResultCode::BadVersion,
        }
    }
}

/// Numeric outcome codes as reported by the device SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0,
    NeedMoreData = 1,
    BadString = 2,
    BadVersion = 3,
}

impl ResultCode {
    pub fn message(&self) -> &'static str {
        match self {
            ResultCode::Ok => "ok",
            ResultCode::NeedMoreData => "need more input data",
            ResultCode::BadString => "parse failure",
            ResultCode::BadVersion => "unsupported protocol number",
        }
    }
}

impl<T> From<&DecodeResult<T>> for ResultCode {
    fn from(result: &DecodeResult<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(e) => e.code(),
        }
    }
}
