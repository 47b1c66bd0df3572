use uuid::Uuid;

/// Looped or triggered sound attached to an entity
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttachedSound {
    pub sound_id: Uuid,
    pub owner_id: Uuid,
    pub gain: f32,
    pub cutoff_radius: f32,
    pub flags: u8,
}

impl AttachedSound {
    /// A nil sound id means "no sound".
    pub fn from_wire(sound_id: Uuid, owner_id: Uuid, gain: f32, cutoff_radius: f32, flags: u8) -> Option<Self> {
        if sound_id.is_nil() {
            return None;
        }
        Some(Self {
            sound_id,
            owner_id,
            gain,
            cutoff_radius,
            flags,
        })
    }
}

/// Floating text shown above an entity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextLabel {
    pub text: String,
    pub color: [u8; 4],
}

impl TextLabel {
    /// Alpha is sent inverted so that opaque text packs as zero.
    pub fn from_wire(text: String, color: [u8; 4]) -> Self {
        let [r, g, b, a] = color;
        Self {
            text,
            color: [r, g, b, 255 - a],
        }
    }

    pub fn wire_color(&self) -> [u8; 4] {
        let [r, g, b, a] = self.color;
        [r, g, b, 255 - a]
    }
}

/// One `NAME TYPE CLASS SENDTO VALUE` entry of a name-value list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NameValue {
    pub name: String,
    pub value_type: String,
    pub class: String,
    pub send_to: String,
    pub value: String,
}

impl NameValue {
    /// Parses a single entry. Missing trailing columns are left empty.
    pub fn parse(line: &str) -> Option<NameValue> {
        let mut rest = line.trim();
        if rest.is_empty() {
            return None;
        }
        let mut columns: [String; 4] = Default::default();
        for column in columns.iter_mut() {
            let trimmed = rest.trim_start();
            let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
            *column = trimmed[..end].to_string();
            rest = &trimmed[end..];
        }
        let [name, value_type, class, send_to] = columns;
        Some(NameValue {
            name,
            value_type,
            class,
            send_to,
            value: rest.trim().to_string(),
        })
    }

    /// Parses a newline separated list, skipping blank lines.
    pub fn parse_list(text: &str) -> Vec<NameValue> {
        text.lines().filter_map(NameValue::parse).collect()
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} {} {} {} {}",
            self.name, self.value_type, self.class, self.send_to, self.value
        )
    }
}
