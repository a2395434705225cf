use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier configuration error: {0}")]
    Config(#[from] fw_compile::error::CompileError),

    #[error("cannot open NFQUEUE {queue_id}: {source}")]
    QueueOpen {
        queue_id: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot bind NFQUEUE {queue_id}: {source}")]
    QueueBind {
        queue_id: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("NFQUEUE {queue_id} receive failed: {source}")]
    QueueRecv {
        queue_id: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("packet on queue {queue_id} could not be parsed: {reason}")]
    MalformedPacket { queue_id: u16, reason: String },

    #[error("log writer error: {0}")]
    Log(#[from] std::io::Error),

    #[error("classifier runtime is only supported on Linux (NFQUEUE is a Linux-only facility)")]
    NotSupported,
}

pub type Result<T> = std::result::Result<T, ClassifyError>;
