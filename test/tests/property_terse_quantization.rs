/// Terse updates squeeze every vector into 16-bit ranges. Whatever the
/// simulator sends inside those ranges must land within one quantization
/// step of where it was.

use glam::Vec3;
use objsync_serde::quantization_step;
use objsync_test::{full_message, terse_block, terse_message, TestClient, TestEntityBuilder};
use proptest::prelude::*;

fn horizontal_step() -> f32 {
    quantization_step(-128.0, 384.0) * 1.5 + 1e-4
}

proptest! {
    #[test]
    fn terse_position_lands_within_one_step(
        x in 0f32..256.0,
        y in 0f32..256.0,
        z in 0f32..1000.0,
    ) {
        let mut client = TestClient::new();
        client.apply(&full_message(1, vec![TestEntityBuilder::new(1, 3).build()]));

        let sent = Vec3::new(x, y, z);
        let report = client.apply(&terse_message(2, vec![terse_block(3, sent, Vec3::ZERO)]));
        prop_assert_eq!(report.applied, 1);

        let landed = client.entity(3).unwrap().position();
        let vertical = quantization_step(-256.0, 4096.0) * 1.5 + 1e-4;
        prop_assert!((landed.x - sent.x).abs() <= horizontal_step());
        prop_assert!((landed.y - sent.y).abs() <= horizontal_step());
        prop_assert!((landed.z - sent.z).abs() <= vertical);
    }

    #[test]
    fn terse_velocity_lands_within_one_step(
        vx in -256f32..256.0,
        vy in -256f32..256.0,
    ) {
        let mut client = TestClient::new();
        client.apply(&full_message(1, vec![TestEntityBuilder::new(1, 3).build()]));

        let sent = Vec3::new(vx, vy, 0.0);
        client.apply(&terse_message(2, vec![terse_block(3, Vec3::new(10.0, 10.0, 10.0), sent)]));

        let landed = client.entity(3).unwrap().velocity();
        let step = quantization_step(-256.0, 256.0) * 1.5 + 1e-4;
        prop_assert!((landed - sent).abs().max_element() <= step);
    }
}
