use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bazaar_market::{Disposition, MarketError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Feed ended before producing a snapshot")]
    FeedClosed,
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::FeedClosed => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Market(e) => match e {
                MarketError::Validation(_) => StatusCode::BAD_REQUEST,
                MarketError::Identity(_) => StatusCode::UNAUTHORIZED,
                MarketError::Ownership { .. } | MarketError::SelfPurchase(_) => {
                    StatusCode::FORBIDDEN
                }
                MarketError::NotFound { .. } => StatusCode::NOT_FOUND,
                MarketError::DuplicateName(_)
                | MarketError::NotEmpty(_)
                | MarketError::Unavailable(_)
                | MarketError::AlreadyPending(_)
                | MarketError::HasPendingTransaction(_)
                | MarketError::AlreadyCompleted(_) => StatusCode::CONFLICT,
                MarketError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
                MarketError::Corrupt { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn disposition(&self) -> Disposition {
        match self {
            ServerError::Market(e) => e.disposition(),
            ServerError::BadRequest(_) => Disposition::ChangeInput,
            ServerError::FeedClosed => Disposition::Retry,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Market(MarketError::Store(e)) => {
                tracing::error!(error = %e, "store failure");
                "Store unavailable".to_string()
            }
            ServerError::Market(MarketError::Corrupt { .. }) => {
                tracing::error!(error = %self, "corrupt document");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        let disposition = match self.disposition() {
            Disposition::Retry => "retry",
            Disposition::ChangeInput => "change_input",
            Disposition::Stop => "stop",
        };

        let body = serde_json::json!({
            "error": message,
            "disposition": disposition,
        });

        (status, axum::Json(body)).into_response()
    }
}
