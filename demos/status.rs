use hiwonder_serial_servo::{hardware::ServoId, serial::DEFAULT_BAUD_RATE, servo::Servo};

fn main() {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("/dev/ttyAMA0"));

    let id = ServoId::single(1).expect("ID 1 must be valid.");
    let mut servo = Servo::open(&path, DEFAULT_BAUD_RATE, id).expect("The serial device must open.");

    println!("temperature: {} C", servo.temp_read().expect("temp"));
    println!("voltage: {} mV", servo.vin_read().expect("vin"));
    println!("position: {} (0.24 deg units)", servo.pos_read().expect("pos"));
    println!("mode: {:?}", servo.mode_read().expect("mode"));
    println!("angle limits: {:?}", servo.angle_limit_read().expect("angle limits"));
    println!("voltage limits: {:?}", servo.vin_limit_read().expect("vin limits"));
    println!("max temperature: {} C", servo.temp_max_limit_read().expect("temp limit"));
    println!("led errors: {:?}", servo.led_error_read().expect("led errors"));
}
