//! Host-to-device command encodings

/// Regenerate-now command bytes.
pub const REGENERATE_NOW: [u8; 3] = [0x72, 0x72, 0x01];

/// Prefix of the set-salt-level command: `vv`, page 1, setting 10.
/// The level follows as a single byte.
pub const SET_SALT_LEVEL_PREFIX: [u8; 4] = [0x76, 0x76, 0x01, 0x0A];

/// Commands the softener accepts on its write characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start a regeneration cycle immediately.
    RegenerateNow,
    /// Set the brine tank salt level (0-255, device units).
    SetSaltLevel(u8),
}

impl Command {
    /// Encode to the bytes written on the wire.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::RegenerateNow => REGENERATE_NOW.to_vec(),
            Command::SetSaltLevel(level) => {
                let mut bytes = Vec::with_capacity(SET_SALT_LEVEL_PREFIX.len() + 1);
                bytes.extend_from_slice(&SET_SALT_LEVEL_PREFIX);
                bytes.push(*level);
                bytes
            }
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::RegenerateNow => "regenerate_now",
            Command::SetSaltLevel(_) => "set_salt_level",
        }
    }
}
