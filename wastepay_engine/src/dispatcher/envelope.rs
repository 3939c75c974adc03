use serde::{Deserialize, Serialize};

use crate::wpe_api::errors::ErrorCode;

/// The uniform result of a dispatched request: either the response payload, or an error code and the HTTP status
/// that goes with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Envelope<T> {
    Success { data: T },
    Failure { code: ErrorCode, status: u16 },
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    pub fn failure(code: ErrorCode) -> Self {
        Self::Failure { code, status: code.status() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Envelope::Success { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            Envelope::Success { .. } => 200,
            Envelope::Failure { status, .. } => *status,
        }
    }

    pub fn into_result(self) -> Result<T, ErrorCode> {
        match self {
            Envelope::Success { data } => Ok(data),
            Envelope::Failure { code, .. } => Err(code),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_format() {
        let ok = Envelope::success(5);
        assert_eq!(serde_json::to_string(&ok).unwrap(), r#"{"result":"success","data":5}"#);
        let err = Envelope::<u32>::failure(ErrorCode::NotEnoughFunds);
        assert_eq!(
            serde_json::to_string(&err).unwrap(),
            r#"{"result":"failure","code":"NotEnoughFunds","status":402}"#
        );
        assert_eq!(err.status(), 402);
        assert_eq!(err.into_result(), Err(ErrorCode::NotEnoughFunds));
    }
}
