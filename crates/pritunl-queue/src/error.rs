use pritunl_core::QueueId;
use pritunl_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue document {id} references unregistered queue_type {queue_type:?}")]
    UnknownQueueType { id: QueueId, queue_type: String },

    #[error("persistence error for queue document {id}: {source}")]
    Store {
        id: QueueId,
        #[source]
        source: StoreError,
    },

    #[error("failed to decode queue document {id}: {source}")]
    Decode {
        id: QueueId,
        #[source]
        source: serde_json::Error,
    },
}
