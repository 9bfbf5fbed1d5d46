use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("no address family enabled; nothing to capture")]
    NoAddressFamily,

    #[error("failed to open capture on {interface}: {source}")]
    Open {
        interface: String,
        source: pcap::Error,
    },

    #[error("failed to install capture filter {filter:?}: {source}")]
    Filter { filter: String, source: pcap::Error },

    #[error("unsupported link type {0}")]
    UnsupportedLink(i32),

    #[error("capture read failed: {0}")]
    Read(#[source] pcap::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
