//! 8259 driver and IRQ dispatch against the recorded bus.

mod common;

use std::sync::Mutex;

use common::TestBus;
use simple_os::irq::IrqTable;
use simple_os::pic::{Pic, PIC1_OFFSET, PIC2_OFFSET};

#[test]
fn remap_performs_the_full_icw_handshake() {
    let bus = TestBus::new();
    let mut pic = Pic::new(bus.clone());

    pic.remap(PIC1_OFFSET, PIC2_OFFSET);

    // ICW1 both, ICW2 offsets, ICW3 wiring, ICW4 mode, each followed by a
    // settling write, then the unmask pair.
    assert_eq!(
        bus.writes(),
        vec![
            (0x20, 0x11),
            (0x80, 0x00),
            (0xA0, 0x11),
            (0x80, 0x00),
            (0x21, 0x20),
            (0x80, 0x00),
            (0xA1, 0x28),
            (0x80, 0x00),
            (0x21, 0x04),
            (0x80, 0x00),
            (0xA1, 0x02),
            (0x80, 0x00),
            (0x21, 0x01),
            (0x80, 0x00),
            (0xA1, 0x01),
            (0x80, 0x00),
            (0x21, 0x00),
            (0xA1, 0x00),
        ]
    );
}

#[test]
fn eoi_goes_to_the_master_only_for_low_lines() {
    let bus = TestBus::new();
    let mut pic = Pic::new(bus.clone());

    pic.send_eoi(1);
    assert_eq!(bus.writes(), vec![(0x20, 0x20)]);
}

#[test]
fn eoi_for_a_slave_line_hits_both_controllers() {
    let bus = TestBus::new();
    let mut pic = Pic::new(bus.clone());

    pic.send_eoi(12);
    // Slave first, then the cascade line on the master.
    assert_eq!(bus.writes(), vec![(0xA0, 0x20), (0x20, 0x20)]);
}

#[test]
fn masking_is_a_read_modify_write_of_the_right_data_port() {
    let bus = TestBus::new();
    let mut pic = Pic::new(bus.clone());

    bus.queue_byte(0x21, 0b0000_0100);
    pic.set_mask(1);
    assert_eq!(bus.writes(), vec![(0x21, 0b0000_0110)]);

    bus.clear_writes();
    bus.queue_byte(0xA1, 0b0001_0000);
    pic.clear_mask(12);
    assert_eq!(bus.writes(), vec![(0xA1, 0b0000_0000)]);
}

#[test]
fn pending_combines_both_request_registers() {
    let bus = TestBus::new();
    let mut pic = Pic::new(bus.clone());

    bus.queue_byte(0x20, 0x02); // master: IRQ 1
    bus.queue_byte(0xA0, 0x10); // slave: IRQ 12

    assert_eq!(pic.get_pending(), 0b0001_0000_0000_0010);
    // OCW3 (read IRR) went to both command ports before the reads.
    assert_eq!(bus.writes(), vec![(0x20, 0x0A), (0xA0, 0x0A)]);
}

#[test]
fn in_service_uses_the_isr_ocw3() {
    let bus = TestBus::new();
    let mut pic = Pic::new(bus.clone());

    bus.queue_byte(0x20, 0x01);
    assert_eq!(pic.get_in_service(), 0x0001);
    assert_eq!(bus.writes(), vec![(0x20, 0x0B), (0xA0, 0x0B)]);
}

static CALLS: Mutex<Vec<u8>> = Mutex::new(Vec::new());

fn record_keyboard() {
    CALLS.lock().unwrap().push(1);
}

fn record_mouse() {
    CALLS.lock().unwrap().push(12);
}

#[test]
fn dispatch_runs_handlers_in_line_order_and_acknowledges_everything() {
    let bus = TestBus::new();
    let mut pic = Pic::new(bus.clone());

    let mut irqs = IrqTable::new();
    irqs.install(1, record_keyboard);
    irqs.install(12, record_mouse);

    // IRQ 1 and IRQ 12 pending at once; IRQ 7 also pending but unregistered.
    bus.queue_byte(0x20, 0b1000_0010);
    bus.queue_byte(0xA0, 0b0001_0000);

    CALLS.lock().unwrap().clear();
    irqs.dispatch_pending(&mut pic);

    assert_eq!(*CALLS.lock().unwrap(), vec![1, 12]);

    // One EOI per pending line, the unregistered one included: master-only
    // for 1 and 7, slave+master for 12.
    let eois: Vec<(u16, u8)> = bus
        .writes()
        .into_iter()
        .filter(|&(_, value)| value == 0x20)
        .collect();
    assert_eq!(
        eois,
        vec![(0x20, 0x20), (0x20, 0x20), (0xA0, 0x20), (0x20, 0x20)]
    );
}

#[test]
fn dispatch_with_nothing_pending_touches_no_handler() {
    let bus = TestBus::new();
    let mut pic = Pic::new(bus.clone());
    let mut irqs = IrqTable::new();
    irqs.install(1, || panic!("no IRQ was pending"));

    irqs.dispatch_pending(&mut pic);
    // Only the two OCW3 writes from the IRR read.
    assert_eq!(bus.writes(), vec![(0x20, 0x0A), (0xA0, 0x0A)]);
}
