//! Packet sources feeding the capture loop

use pcap::{Active, Capture, Device};
use tracing::debug;

use crate::error::CaptureError;
use crate::packet::LinkLayer;

/// Snapshot length; a full server greeting fits well within it.
pub const SNAPLEN: i32 = 1600;

/// Anything that yields captured link-layer frames.
pub trait PacketSource {
    fn link_layer(&self) -> LinkLayer;

    /// Next captured frame. `Ok(None)` means the read returned without one.
    fn next_frame(&mut self) -> Result<Option<&[u8]>, CaptureError>;
}

/// Live libpcap capture with a BPF filter installed.
pub struct PcapSource {
    capture: Capture<Active>,
    link: LinkLayer,
}

impl PcapSource {
    /// Open `interface` in promiscuous mode and install `filter`.
    pub fn open(interface: &str, filter: &str) -> Result<Self, CaptureError> {
        let open_error = |source| CaptureError::Open {
            interface: interface.to_string(),
            source,
        };

        // a zero read timeout blocks until a packet arrives
        let mut capture = Capture::from_device(interface)
            .map_err(open_error)?
            .promisc(true)
            .snaplen(SNAPLEN)
            .timeout(0)
            .immediate_mode(true)
            .open()
            .map_err(open_error)?;

        capture
            .filter(filter, true)
            .map_err(|source| CaptureError::Filter {
                filter: filter.to_string(),
                source,
            })?;

        let datalink = capture.get_datalink();
        let link = LinkLayer::from_dlt(datalink.0).ok_or(CaptureError::UnsupportedLink(datalink.0))?;
        debug!(interface, ?link, filter, "capture opened");

        Ok(Self { capture, link })
    }
}

impl PacketSource for PcapSource {
    fn link_layer(&self) -> LinkLayer {
        self.link
    }

    fn next_frame(&mut self) -> Result<Option<&[u8]>, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => Ok(Some(packet.data)),
            Err(pcap::Error::TimeoutExpired) => Ok(None),
            Err(e) => Err(CaptureError::Read(e)),
        }
    }
}

/// Names (and descriptions, when known) of devices libpcap can open.
pub fn list_interfaces() -> Result<Vec<(String, Option<String>)>, CaptureError> {
    let devices = Device::list().map_err(CaptureError::Read)?;
    Ok(devices.into_iter().map(|d| (d.name, d.desc)).collect())
}

/// Replays a fixed list of frames; used to drive the capture loop in tests.
#[cfg(test)]
pub(crate) struct ReplaySource {
    pub(crate) link: LinkLayer,
    pub(crate) frames: std::collections::VecDeque<Option<Vec<u8>>>,
    current: Vec<u8>,
}

#[cfg(test)]
impl ReplaySource {
    pub(crate) fn new(link: LinkLayer, frames: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            link,
            frames: frames.into(),
            current: Vec::new(),
        }
    }
}

#[cfg(test)]
impl PacketSource for ReplaySource {
    fn link_layer(&self) -> LinkLayer {
        self.link
    }

    fn next_frame(&mut self) -> Result<Option<&[u8]>, CaptureError> {
        match self.frames.pop_front() {
            Some(Some(frame)) => {
                self.current = frame;
                Ok(Some(&self.current))
            }
            Some(None) => Ok(None),
            None => Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "replay exhausted").into()),
        }
    }
}
