use hiwonder_serial_servo::{hardware::ServoId, serial::DEFAULT_BAUD_RATE, servo::Servo};

/// Assign a new id to the single servo on the bus. Usage:
/// `assign <device path> <new id>`.
fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| String::from("/dev/ttyAMA0"));
    let new_id = args
        .next()
        .and_then(|raw| raw.parse::<u8>().ok())
        .and_then(|raw| ServoId::single(raw).ok())
        .expect("The new id must be a number in [1, 253].");

    let mut servo = Servo::open(&path, DEFAULT_BAUD_RATE, ServoId::broadcast())
        .expect("The serial device must open.");

    let current = servo.id_read().expect("A servo must answer on the bus.");
    println!("found servo {}", current.value());

    servo.id_write(new_id).expect("The id assignment must send.");
    println!("assigned id {}", servo.id().value());
}
