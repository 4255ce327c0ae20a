// This binary crate is intentionally minimal.
// All engine, training and registry logic lives in the library (src/lib.rs).
// Run the demo with:
//   RUST_LOG=info cargo run --example xor
fn main() {
    env_logger::init();
    log::info!("ferrox-ml starting");
    println!("ferrox-ml: a from-scratch neural network engine and model registry in Rust.");
    println!("Run `cargo run --example xor` to see the XOR demo.");
}
