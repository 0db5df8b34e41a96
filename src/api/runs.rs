use super::{decode, OnboardingClient};
use crate::error::ApiError;
use crate::model::{EventsPayload, RunEvent, RunOutputs};
use crate::transport::{ApiRequest, Transport};
use crate::util::encode_path_segment;

impl<T: Transport> OnboardingClient<T> {
    pub fn get_run_outputs(&self, run_id: &str) -> Result<RunOutputs, ApiError> {
        self.send_typed(ApiRequest::get(format!(
            "/runs/{}/outputs",
            encode_path_segment(run_id)
        )))
    }

    /// Events strictly after `after_id`; `0` fetches the whole log.
    pub fn get_run_events(&self, run_id: &str, after_id: u64) -> Result<Vec<RunEvent>, ApiError> {
        let path = format!(
            "/runs/{}/events?after_id={after_id}",
            encode_path_segment(run_id)
        );
        let value = self.send_raw(ApiRequest::get(path.as_str()))?;
        let payload: EventsPayload = decode(&path, value)?;
        Ok(payload.into_events())
    }
}
