use glam::{Quat, Vec3};
use objsync_serde::ByteWriter;
use uuid::Uuid;

use objsync_client::{
    shared::{ExtraParam, LocalId, PCode, RawObjectBlock},
    UpdateBlock,
};
use objsync_shared::{pack_rotation, write_extra_params, SpecialCode};

/// Fluent builder for a raw full update block
pub struct TestEntityBuilder {
    id: u128,
    local_id: LocalId,
    pcode: PCode,
    parent: LocalId,
    position: Vec3,
    velocity: Vec3,
    acceleration: Vec3,
    rotation: Quat,
    angular_velocity: Vec3,
    text: String,
    extra_params: Vec<ExtraParam>,
    update_flags: u32,
}

impl TestEntityBuilder {
    pub fn new(id: u128, local_id: LocalId) -> Self {
        Self {
            id,
            local_id,
            pcode: PCode::Volume,
            parent: 0,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            angular_velocity: Vec3::ZERO,
            text: String::new(),
            extra_params: Vec::new(),
            update_flags: 0,
        }
    }

    pub fn avatar(mut self) -> Self {
        self.pcode = PCode::Avatar;
        self
    }

    pub fn parent(mut self, parent: LocalId) -> Self {
        self.parent = parent;
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn acceleration(mut self, acceleration: Vec3) -> Self {
        self.acceleration = acceleration;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn extra_param(mut self, param: ExtraParam) -> Self {
        self.extra_params.push(param);
        self
    }

    pub fn update_flags(mut self, flags: u32) -> Self {
        self.update_flags = flags;
        self
    }

    pub fn build(self) -> UpdateBlock {
        let mut object_data = ByteWriter::new();
        object_data.write_vec3(self.position);
        object_data.write_vec3(self.velocity);
        object_data.write_vec3(self.acceleration);
        object_data.write_vec3(pack_rotation(self.rotation));
        object_data.write_vec3(self.angular_velocity);

        let extra_params = if self.extra_params.is_empty() {
            Vec::new()
        } else {
            let mut writer = ByteWriter::new();
            write_extra_params(&mut writer, &self.extra_params);
            writer.to_bytes()
        };

        UpdateBlock::Raw(RawObjectBlock {
            full_id: Uuid::from_u128(self.id),
            local_id: self.local_id,
            pcode: self.pcode.to_u8(),
            parent_id: self.parent,
            scale: Vec3::ONE,
            object_data: object_data.to_bytes(),
            update_flags: self.update_flags,
            text: self.text,
            text_color: [255, 255, 255, 0],
            extra_params,
            ..Default::default()
        })
    }
}

/// Fluent builder for a packed (compressed) full update block
pub struct PackedEntityBuilder {
    id: u128,
    local_id: LocalId,
    parent: Option<LocalId>,
    position: Vec3,
    angular_velocity: Option<Vec3>,
    media_url: Option<String>,
    name_values: Option<String>,
    extra_params: Vec<ExtraParam>,
}

impl PackedEntityBuilder {
    pub fn new(id: u128, local_id: LocalId) -> Self {
        Self {
            id,
            local_id,
            parent: None,
            position: Vec3::ZERO,
            angular_velocity: None,
            media_url: None,
            name_values: None,
            extra_params: Vec::new(),
        }
    }

    pub fn parent(mut self, parent: LocalId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = Some(angular_velocity);
        self
    }

    pub fn media_url(mut self, url: &str) -> Self {
        self.media_url = Some(url.to_string());
        self
    }

    pub fn name_values(mut self, text: &str) -> Self {
        self.name_values = Some(text.to_string());
        self
    }

    pub fn extra_param(mut self, param: ExtraParam) -> Self {
        self.extra_params.push(param);
        self
    }

    pub fn build(self) -> UpdateBlock {
        let mut code = SpecialCode::empty();
        code.set(SpecialCode::PARENT, self.parent.is_some());
        code.set(SpecialCode::ANGULAR_VELOCITY, self.angular_velocity.is_some());
        code.set(SpecialCode::MEDIA_URL, self.media_url.is_some());
        code.set(SpecialCode::NAME_VALUE, self.name_values.is_some());

        let mut writer = ByteWriter::new();
        writer.write_uuid(&Uuid::from_u128(self.id));
        writer.write_u32(self.local_id);
        writer.write_u8(PCode::Volume.to_u8());
        writer.write_u8(0);
        writer.write_u32(0);
        writer.write_u8(3);
        writer.write_u8(0);
        writer.write_vec3(Vec3::ONE);
        writer.write_vec3(self.position);
        writer.write_vec3(Vec3::ZERO);
        writer.write_u32(code.bits());
        writer.write_uuid(&Uuid::nil());

        if let Some(omega) = self.angular_velocity {
            writer.write_vec3(omega);
        }
        if let Some(parent) = self.parent {
            writer.write_u32(parent);
        }
        if let Some(url) = &self.media_url {
            writer.write_cstring(url);
        }
        write_extra_params(&mut writer, &self.extra_params);
        if let Some(text) = &self.name_values {
            writer.write_cstring(text);
        }

        UpdateBlock::Packed {
            data: writer.to_bytes(),
            update_flags: None,
        }
    }
}
