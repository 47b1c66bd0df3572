use std::time::Instant;

use glam::{Quat, Vec3};
use log::{trace, warn};

use objsync_shared::{ObjectFlags, RegionHandle};

use crate::{
    circuit::CircuitStatus,
    config::InterpolationConfig,
    events::{ChangeFlags, SyncEvent, SyncEvents},
    world::{Entity, EntityHandle, EntityRegistry},
};

/// Predicts transforms between authoritative updates
pub struct MotionExtrapolator {
    config: InterpolationConfig,
}

impl MotionExtrapolator {
    pub fn new(config: InterpolationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InterpolationConfig {
        &self.config
    }

    /// Advances every live entity to `now`. Must not be re-entered.
    pub fn tick(
        &self,
        registry: &mut EntityRegistry,
        circuit: &dyn CircuitStatus,
        now: Instant,
        events: &mut SyncEvents,
    ) {
        if !self.config.velocity_interpolate {
            return;
        }
        for handle in registry.handles() {
            self.advance(registry, handle, circuit, now, events);
        }
    }

    fn advance(
        &self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
        circuit: &dyn CircuitStatus,
        now: Instant,
        events: &mut SyncEvents,
    ) {
        let Some(entity) = registry.get(handle) else {
            return;
        };
        if entity.motion.static_flag || entity.selected {
            return;
        }
        let time_dilation = registry
            .regions()
            .get(&entity.region)
            .map_or(1.0, |region| region.time_dilation);
        let is_attachment = entity
            .parent()
            .and_then(|parent| registry.get(parent))
            .is_some_and(|parent| parent.is_avatar());

        let dt_raw = now
            .saturating_duration_since(entity.motion.last_interpolation_update)
            .as_secs_f32();
        let dt = dt_raw * time_dilation;

        let Some(entity) = registry.get_mut(handle) else {
            return;
        };
        let mut flags = ChangeFlags::empty();
        if Self::apply_angular_velocity(entity, dt) {
            flags |= ChangeFlags::ROTATED | ChangeFlags::SILHOUETTE;
        }
        if is_attachment {
            entity.motion.last_interpolation_update = now;
            events.push_changed(handle, flags);
            return;
        }

        match self.interpolate_linear_motion(registry, handle, circuit, now, dt) {
            Some(linear) => flags |= linear,
            None => {
                if let Some(entity) = registry.get(handle) {
                    events.push(SyncEvent::InvalidUpdate {
                        entity: handle,
                        local_id: entity.local_id,
                    });
                }
            }
        }
        events.push_changed(handle, flags);
    }

    /// Integrates angular velocity into the rotation and the accumulated
    /// spin. Returns whether the rotation changed.
    pub fn apply_angular_velocity(entity: &mut Entity, dt: f32) -> bool {
        if !entity.transform.has_angular_velocity() || dt <= 0.0 {
            return false;
        }
        entity.motion.rotation_time += dt;

        let omega = entity.transform.angular_velocity;
        let speed = omega.length();
        let delta = Quat::from_axis_angle(omega / speed, speed * dt);
        entity.motion.accumulated_spin = (delta * entity.motion.accumulated_spin).normalize();
        entity.transform.rotation = (delta * entity.transform.rotation).normalize();
        true
    }

    /// Applies a rotation from an authoritative update on top of the spin
    /// accumulated locally, so target omega keeps turning smoothly.
    pub fn apply_authoritative_rotation(
        entity: &mut Entity,
        rotation: Quat,
        old_angular_velocity: Vec3,
    ) -> ChangeFlags {
        if rotation != entity.motion.previous_rotation {
            entity.motion.reset_spin();
        } else if entity.transform.angular_velocity != old_angular_velocity {
            if entity.flags.contains(ObjectFlags::USE_PHYSICS) {
                entity.motion.reset_spin();
            } else {
                entity.motion.rotation_time = 0.0;
            }
        }
        entity.motion.previous_rotation = rotation;

        let spun = (entity.motion.accumulated_spin * rotation).normalize();
        if spun.abs_diff_eq(entity.transform.rotation, 1e-6) {
            return ChangeFlags::empty();
        }
        entity.transform.rotation = spun;
        ChangeFlags::ROTATED | ChangeFlags::SILHOUETTE
    }

    fn interpolate_linear_motion(
        &self,
        registry: &mut EntityRegistry,
        handle: EntityHandle,
        circuit: &dyn CircuitStatus,
        now: Instant,
        dt: f32,
    ) -> Option<ChangeFlags> {
        let Some(entity) = registry.get(handle) else {
            return Some(ChangeFlags::empty());
        };
        let region_handle = entity.region;
        let is_root = entity.parent().is_none();
        let motion = entity.motion;
        let transform = entity.transform;

        let time_since_update = now
            .saturating_duration_since(motion.last_message_update)
            .as_secs_f32();
        if time_since_update <= 0.0 || dt <= 0.0 {
            return Some(ChangeFlags::empty());
        }

        let step = self.config.physics_timestep.as_secs_f32();
        let velocity = transform.velocity;
        let mut acceleration = transform.acceleration;
        let mut delta_position = (velocity + acceleration * (0.5 * (dt - step))) * dt;
        let mut delta_velocity = acceleration * dt;

        let max_time = self.config.max_update_interpolation.as_secs_f32();
        let frozen = time_since_update > max_time;
        let phase_out_time = self.phase_out_threshold(circuit, region_handle);
        if time_since_update > phase_out_time {
            let since_interpolation = motion
                .last_interpolation_update
                .saturating_duration_since(motion.last_message_update)
                .as_secs_f32();
            let span = time_since_update - since_interpolation;
            let fade = if span > 0.0 {
                (faded_time(time_since_update, phase_out_time, max_time)
                    - faded_time(since_interpolation, phase_out_time, max_time))
                    / span
            } else {
                0.0
            };
            delta_position *= fade;
            delta_velocity *= fade;
        }

        let mut new_position = transform.position + delta_position;
        let mut new_velocity = if frozen {
            Vec3::ZERO
        } else {
            velocity + delta_velocity
        };
        let mut region_cross_expire = motion.region_cross_expire;

        if is_root {
            if let Some(region) = registry.regions().get(&region_handle) {
                new_position.z = new_position.z.clamp(region.min_height, region.max_height);

                let mut inside = new_position;
                inside.x = inside.x.clamp(0.0, region.width);
                inside.y = inside.y.clamp(0.0, region.width);
                if inside != new_position {
                    let old_global = region.global_from_region(transform.position);
                    let mut new_global = region.global_from_region(new_position);
                    if registry
                        .regions()
                        .clip_to_known_regions(old_global, &mut new_global)
                    {
                        new_position = region.region_from_global(new_global);
                        new_velocity = Vec3::ZERO;
                        acceleration = Vec3::ZERO;
                    } else {
                        match region_cross_expire {
                            None => {
                                region_cross_expire =
                                    Some(now + self.config.max_region_crossing_interpolation);
                            }
                            Some(expire) if now > expire => {
                                new_velocity = Vec3::ZERO;
                                acceleration = Vec3::ZERO;
                                region_cross_expire = None;
                            }
                            Some(_) => {}
                        }
                    }
                } else {
                    region_cross_expire = None;
                }
            }
        }

        let Some(entity) = registry.get_mut(handle) else {
            return Some(ChangeFlags::empty());
        };
        if !new_position.is_finite() || !new_velocity.is_finite() {
            warn!(
                "Discarding non-finite prediction for {} ({})",
                entity.global_id, handle
            );
            entity.motion.last_interpolation_update = now;
            return None;
        }

        let moved = new_position != entity.transform.position;
        entity.transform.position = new_position;
        entity.transform.velocity = new_velocity;
        entity.transform.acceleration = acceleration;
        entity.motion.region_cross_expire = region_cross_expire;
        entity.motion.last_interpolation_update = now;
        if frozen || new_velocity == Vec3::ZERO {
            entity.update_static_flag();
        }
        trace!(
            "Extrapolated {} to {} after {:.3}s",
            handle,
            new_position,
            time_since_update
        );

        if moved {
            Some(ChangeFlags::MOVED | ChangeFlags::SILHOUETTE)
        } else {
            Some(ChangeFlags::empty())
        }
    }

    /// Prediction fades out after this many seconds. A dead, blocked or
    /// silent circuit fades it out right away.
    fn phase_out_threshold(&self, circuit: &dyn CircuitStatus, region: RegionHandle) -> f32 {
        let phase_out = self.config.phase_out_update_interpolation.as_secs_f32();
        if !circuit.is_alive(region)
            || circuit.is_blocked(region)
            || circuit.seconds_since_last_packet(region) > phase_out
        {
            return 0.0;
        }
        phase_out
    }
}

/// Seconds of full-speed motion covered `t` seconds after an update.
/// Speed holds at 1 until `phase_out`, falls linearly to 0 at `max`, then
/// stays 0, so the distance travelled depends only on `t`.
fn faded_time(t: f32, phase_out: f32, max: f32) -> f32 {
    let start = phase_out.clamp(0.0, max);
    if t <= start {
        return t.max(0.0);
    }
    let window = max - start;
    if window <= f32::EPSILON {
        return start;
    }
    let remaining = (max - t).max(0.0);
    start + (window * window - remaining * remaining) / (2.0 * window)
}

/// Marks an entity's transform as freshly authoritative.
pub(crate) fn mark_authoritative(entity: &mut Entity, now: Instant) {
    entity.motion.last_message_update = now;
    entity.motion.last_interpolation_update = now;
    entity.update_static_flag();
}
