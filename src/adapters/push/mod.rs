//! Push gateway adapters.

mod http_gateway;
mod recording;

pub use http_gateway::{HttpPushConfig, HttpPushGateway};
pub use recording::{RecordedDelivery, RecordingPushGateway};
