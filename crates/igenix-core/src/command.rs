// ── Write API ──
//
// Every write travels through the coordinator's queue as an envelope
// carrying its own reply channel. The queue runner answers each envelope
// before it looks at the next one.

use igenix_api::{DpsKey, PropertyValue, WriteAck};
use tokio::sync::oneshot;

use crate::error::CoreError;

/// A single data point write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub key: DpsKey,
    pub value: PropertyValue,
}

/// A queued write and the channel its result goes back on.
pub(crate) struct WriteEnvelope {
    pub request: WriteRequest,
    pub response_tx: oneshot::Sender<Result<WriteAck, CoreError>>,
}
