use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Enumerates supported `DmrError` values.
pub enum DmrError {
    #[error("address segment key must not be empty")]
    EmptySegmentKey,
    #[error("address segment value for '{key}' must not be empty")]
    EmptySegmentValue { key: String },
    #[error("malformed address: {0}")]
    MalformedAddress(String),
    #[error("operation name must not be empty")]
    MissingOperationName,
    #[error("operation envelope has no address")]
    MissingAddress,
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },
    #[error("invalid type character 0x{0:02x}")]
    InvalidType(u8),
    #[error("invalid modified UTF-8 at offset {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("negative length {0}")]
    NegativeLength(i32),
    #[error("string of {0} bytes exceeds the short-form limit")]
    StringTooLong(usize),
    #[error("big number of {0} bytes exceeds 128 bits")]
    BigNumberOverflow(usize),
    #[error("values nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("unsupported JSON value: {0}")]
    Json(String),
}
