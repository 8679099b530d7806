//! Recorded port bus shared by the hardware-facing tests. Reads come from
//! per-port queues (with an optional sticky fallback); every write is
//! captured in order, including the 0x80 settling writes from `io_wait`.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use simple_os::port::PortIo;

#[derive(Default)]
struct BusState {
    byte_writes: Vec<(u16, u8)>,
    byte_queues: HashMap<u16, VecDeque<u8>>,
    byte_fallback: HashMap<u16, u8>,
    word_queues: HashMap<u16, VecDeque<u16>>,
}

/// Cloneable handle over one shared bus recording; hand a clone to the
/// driver and keep one to inspect afterwards.
#[derive(Clone, Default)]
pub struct TestBus {
    state: Rc<RefCell<BusState>>,
}

impl TestBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one byte to be returned by the next `inb` on `port`.
    pub fn queue_byte(&self, port: u16, value: u8) {
        self.state
            .borrow_mut()
            .byte_queues
            .entry(port)
            .or_default()
            .push_back(value);
    }

    /// Sticky value returned by `inb` whenever `port`'s queue is empty.
    pub fn set_byte(&self, port: u16, value: u8) {
        self.state.borrow_mut().byte_fallback.insert(port, value);
    }

    pub fn queue_word(&self, port: u16, value: u16) {
        self.state
            .borrow_mut()
            .word_queues
            .entry(port)
            .or_default()
            .push_back(value);
    }

    /// Every `outb` seen so far, in order.
    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.state.borrow().byte_writes.clone()
    }

    /// The writes excluding the `io_wait` settling writes to port 0x80.
    pub fn writes_without_settling(&self) -> Vec<(u16, u8)> {
        self.writes()
            .into_iter()
            .filter(|&(port, _)| port != 0x80)
            .collect()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().byte_writes.clear();
    }
}

impl PortIo for TestBus {
    fn outb(&mut self, port: u16, value: u8) {
        self.state.borrow_mut().byte_writes.push((port, value));
    }

    fn inb(&mut self, port: u16) -> u8 {
        let mut state = self.state.borrow_mut();
        if let Some(value) = state.byte_queues.get_mut(&port).and_then(|q| q.pop_front()) {
            return value;
        }
        state.byte_fallback.get(&port).copied().unwrap_or(0)
    }

    fn outw(&mut self, _port: u16, _value: u16) {}

    fn inw(&mut self, port: u16) -> u16 {
        let mut state = self.state.borrow_mut();
        state
            .word_queues
            .get_mut(&port)
            .and_then(|q| q.pop_front())
            .unwrap_or(0)
    }
}
