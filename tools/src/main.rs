// tools/keygen/src/main.rs
use rand::RngCore;

fn main() {
    let mut secret = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut secret);
    println!("GATE_HMAC_SECRET={}", hex::encode(secret));
}

/*
    generate a shared secret and paste it into both .env files

    cargo run -p keygen --release >> .env
*/
