//! 16550 bring-up sequence and the loopback self-test.

mod common;

use common::TestBus;
use simple_os::serial::{SerialError, SerialPort, COM1};

#[test]
fn init_programs_the_uart_and_passes_loopback() {
    let bus = TestBus::new();
    // The self-test byte comes straight back in loopback mode.
    bus.queue_byte(COM1, 0xAE);

    let mut port = SerialPort::new(bus.clone(), COM1);
    port.init().unwrap();

    assert_eq!(
        bus.writes(),
        vec![
            (COM1 + 1, 0x00),
            (COM1 + 3, 0x80),
            (COM1, 0x03),
            (COM1 + 1, 0x00),
            (COM1 + 3, 0x03),
            (COM1 + 2, 0xC7),
            (COM1 + 4, 0x0B),
            (COM1 + 4, 0x1E),
            (COM1, 0xAE),
            (COM1 + 4, 0x0F),
        ]
    );
}

#[test]
fn init_fails_when_the_loopback_byte_is_lost() {
    let bus = TestBus::new();
    bus.queue_byte(COM1, 0x00);

    let mut port = SerialPort::new(bus.clone(), COM1);
    assert_eq!(port.init(), Err(SerialError::LoopbackFailed));

    // The port never switched to normal operation.
    assert_ne!(bus.writes().last(), Some(&(COM1 + 4, 0x0F)));
}

#[test]
fn send_waits_for_the_transmit_holding_register() {
    let bus = TestBus::new();
    // Busy once, then ready.
    bus.queue_byte(COM1 + 5, 0x00);
    bus.queue_byte(COM1 + 5, 0x20);
    bus.set_byte(COM1 + 5, 0x20);

    let mut port = SerialPort::new(bus.clone(), COM1);
    port.send(b'A');

    assert_eq!(bus.writes(), vec![(COM1, b'A')]);
}
