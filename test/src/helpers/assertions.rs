/// Assert that two vectors agree component-wise within a tolerance
#[macro_export]
macro_rules! assert_vec3_near {
    ($left:expr, $right:expr, $tolerance:expr) => {
        let (left, right) = ($left, $right);
        assert!(
            (left - right).abs().max_element() <= $tolerance,
            "{:?} is not within {} of {:?}",
            left,
            $tolerance,
            right
        );
    };
}

/// Assert that the client holds no entity for a global id
#[macro_export]
macro_rules! assert_gone {
    ($client:expr, $id:expr) => {
        assert!(
            $client
                .engine
                .entity_by_global_id(&$crate::shared::GlobalId::from_u128($id))
                .is_none(),
            "entity {:#x} should have been destroyed",
            $id
        );
    };
}
