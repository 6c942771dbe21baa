use std::{thread, time::Duration};

use hiwonder_serial_servo::{hardware::ServoId, serial::DEFAULT_BAUD_RATE, servo::Servo};

fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("/dev/ttyAMA0"));

    let id = ServoId::single(1).expect("ID 1 must be valid.");
    let mut servo = Servo::open(&path, DEFAULT_BAUD_RATE, id).expect("The serial device must open.");

    println!("Sweeping servo {} on {path}", servo.id().value());

    loop {
        for position in [0, 1000] {
            servo
                .move_time_write(position, 1000)
                .expect("The move command must send.");
            thread::sleep(Duration::from_millis(1200));

            let here = servo.pos_read().expect("The position must be readable.");
            println!("target {position}, at {here}");
        }
    }
}
