//! Scripted transport for unit tests.

use std::collections::VecDeque;

use crate::error::TransportError;
use crate::transport::Transport;

type Responder = Box<dyn FnMut(u8) -> Vec<u8>>;

#[derive(Default)]
pub struct MockTransport {
    pub rx: VecDeque<u8>,
    pub sent: Vec<u8>,
    /// Transmit-ready polls that report busy before the transmitter frees up
    pub tx_busy_polls: usize,
    responder: Option<Responder>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rx(bytes: &[u8]) -> Self {
        MockTransport {
            rx: bytes.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Queue the bytes returned by `f` every time a byte is sent
    pub fn respond_with(mut self, f: impl FnMut(u8) -> Vec<u8> + 'static) -> Self {
        self.responder = Some(Box::new(f));
        self
    }
}

impl Transport for MockTransport {
    fn transmit_ready(&mut self) -> Result<bool, TransportError> {
        if self.tx_busy_polls > 0 {
            if self.tx_busy_polls != usize::MAX {
                self.tx_busy_polls -= 1;
            }
            return Ok(false);
        }
        Ok(true)
    }

    fn receive_ready(&mut self) -> Result<bool, TransportError> {
        Ok(!self.rx.is_empty())
    }

    fn send_byte(&mut self, byte: u8) -> Result<(), TransportError> {
        self.sent.push(byte);
        if let Some(responder) = self.responder.as_mut() {
            self.rx.extend(responder(byte));
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, TransportError> {
        self.rx.pop_front().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "mock rx empty").into()
        })
    }
}
