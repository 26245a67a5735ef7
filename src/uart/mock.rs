//! A mock UART.
//! Bytes pushed via [`MockUart::push`] are what the "device" produced,
//! and will be handed out by [`Uart::read_byte`].
//! Bytes written to it are recorded instead of being put on a wire.
//!
//! Clones share state, so a test can keep a clone around for inspection
//! while the bridge borrows another.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use super::Uart;

#[derive(Debug, Default)]
struct State {
    from_device: VecDeque<u8>,
    written: Vec<u8>,
    failing_reads: usize,
    reads: usize,
}

/// See the module level docs.
#[derive(Debug, Default, Clone)]
pub struct MockUart {
    state: Rc<RefCell<State>>,
}

impl MockUart {
    /// Make these bytes available for reading, after any already pending.
    pub fn push(&self, bytes: &[u8]) {
        self.state.borrow_mut().from_device.extend(bytes);
    }

    /// Everything written to the UART so far.
    pub fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }

    /// Bytes still waiting to be read.
    pub fn pending(&self) -> usize {
        self.state.borrow().from_device.len()
    }

    /// The next `count` reads fail even though data is available.
    pub fn fail_next_reads(&self, count: usize) {
        self.state.borrow_mut().failing_reads = count;
    }

    /// How many read attempts were made, failed ones included.
    pub fn reads(&self) -> usize {
        self.state.borrow().reads
    }
}

impl Uart for MockUart {
    fn available(&self) -> bool {
        !self.state.borrow().from_device.is_empty()
    }

    fn read_byte(&mut self) -> Option<u8> {
        let mut state = self.state.borrow_mut();
        state.reads += 1;

        if state.failing_reads > 0 {
            state.failing_reads -= 1;
            return None;
        }

        state.from_device.pop_front()
    }

    fn write_byte(&mut self, byte: u8) {
        self.state.borrow_mut().written.push(byte);
    }
}
