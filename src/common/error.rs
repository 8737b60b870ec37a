use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackingError {
    /// The read source could not be polled; the feed retries on its next tick.
    #[error("Mission feed unavailable: {reason}")]
    FeedUnavailable { reason: String },

    #[error("Mission {mission_id} is missing its {field} coordinate")]
    MissingCoordinate { mission_id: String, field: &'static str },

    #[error("Mission {mission_id} has unknown status '{status}'")]
    UnknownStatus { mission_id: String, status: String },

    #[error("Invalid coordinate: lat={lat}, lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl TrackingError {
    pub fn feed_unavailable(reason: impl Into<String>) -> Self {
        TrackingError::FeedUnavailable {
            reason: reason.into(),
        }
    }

    /// Errors that only hide a single entity for one cycle.
    pub fn is_entity_scoped(&self) -> bool {
        matches!(
            self,
            TrackingError::MissingCoordinate { .. }
                | TrackingError::UnknownStatus { .. }
                | TrackingError::InvalidCoordinate { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Tracking session already stopped")]
    SessionStopped,

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, TrackingError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
