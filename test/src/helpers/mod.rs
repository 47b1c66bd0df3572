pub mod assertions;
pub mod entity_builder;
pub mod fake_circuit;
pub mod packet_exchange;
pub mod test_client;

pub use entity_builder::{PackedEntityBuilder, TestEntityBuilder};
pub use fake_circuit::FakeCircuit;
pub use packet_exchange::{compressed_message, full_message, terse_block, terse_message, TEST_REGION};
pub use test_client::TestClient;

/// Installs a test logger once per process. Later calls are no-ops.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
