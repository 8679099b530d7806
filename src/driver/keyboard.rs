//! PS/2 keyboard: the IRQ 1 handler drains the controller into a queue,
//! the main loop decodes the queue into key events.

use conquer_once::spin::OnceCell;
use crossbeam_queue::ArrayQueue;
use pc_keyboard::{layouts::Us104Key, DecodedKey, HandleControl, Keyboard, ScancodeSet1};
use spin::Mutex;

use crate::port::{HardwareIo, PortIo};

const DATA_PORT: u16 = 0x60;
const STATUS_PORT: u16 = 0x64;

static SCANCODE_QUEUE: OnceCell<ArrayQueue<u8>> = OnceCell::uninit();

lazy_static! {
    static ref KEYBOARD: Mutex<Keyboard<Us104Key, ScancodeSet1>> =
        Mutex::new(Keyboard::new(Us104Key, ScancodeSet1, HandleControl::Ignore));
}

/// Sets up the scancode queue. Call once before installing the IRQ handler.
pub fn init() {
    SCANCODE_QUEUE
        .try_init_once(|| ArrayQueue::new(100))
        .expect("keyboard::init should only be called once!");
}

pub(crate) fn add_scancode(scancode: u8) {
    if let Ok(queue) = SCANCODE_QUEUE.try_get() {
        if queue.push(scancode).is_err() {
            println!("WARNING: scancode queue full; dropping keyboard input!");
        }
    } else {
        println!("WARNING: keyboard scancode queue uninitialized!");
    }
}

/// IRQ 1 handler. Reads the controller status first: bit 5 set means the
/// byte in the output buffer belongs to the mouse, not us.
pub fn irq_handler() {
    let mut bus = HardwareIo;

    let status = bus.inb(STATUS_PORT);
    if status & 0x01 == 0 {
        return;
    }
    if status & 0x20 != 0 {
        return;
    }

    add_scancode(bus.inb(DATA_PORT));
}

/// Drains the queue from the polling loop and logs decoded keys.
pub fn poll() {
    let queue = match SCANCODE_QUEUE.try_get() {
        Ok(queue) => queue,
        Err(_) => return,
    };

    let mut keyboard = KEYBOARD.lock();
    while let Ok(scancode) = queue.pop() {
        if let Ok(Some(key_event)) = keyboard.add_byte(scancode) {
            if let Some(key) = keyboard.process_keyevent(key_event) {
                match key {
                    DecodedKey::Unicode(character) => {
                        println!("You pressed : {:?} = {:#x}", character, scancode)
                    }
                    DecodedKey::RawKey(key) => {
                        println!("You pressed : {:?} = {:#x}", key, scancode)
                    }
                }
            }
        }
    }
}
