//! Fixed command-id table of the SDK protocol.
//!
//! The command set is the protocol surface; ids are part of the wire
//! contract and must remain stable.

/// Commands understood by the OpenRGB SDK server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Command {
    RequestControllerCount = 0,
    RequestControllerData = 1,
    RequestProtocolVersion = 40,
    SetClientName = 50,
    /// Server-initiated notification, never a reply to a request.
    DeviceListUpdated = 100,
    RequestProfileList = 150,
    SaveProfile = 151,
    LoadProfile = 152,
    DeleteProfile = 153,
    ResizeZone = 1000,
    UpdateLeds = 1050,
    UpdateZoneLeds = 1051,
    UpdateSingleLed = 1052,
    SetCustomMode = 1100,
    UpdateMode = 1101,
    SaveMode = 1102,
}

impl Command {
    /// Looks a command up by its wire id.
    pub fn from_u32(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::RequestControllerCount),
            1 => Some(Self::RequestControllerData),
            40 => Some(Self::RequestProtocolVersion),
            50 => Some(Self::SetClientName),
            100 => Some(Self::DeviceListUpdated),
            150 => Some(Self::RequestProfileList),
            151 => Some(Self::SaveProfile),
            152 => Some(Self::LoadProfile),
            153 => Some(Self::DeleteProfile),
            1000 => Some(Self::ResizeZone),
            1050 => Some(Self::UpdateLeds),
            1051 => Some(Self::UpdateZoneLeds),
            1052 => Some(Self::UpdateSingleLed),
            1100 => Some(Self::SetCustomMode),
            1101 => Some(Self::UpdateMode),
            1102 => Some(Self::SaveMode),
            _ => None,
        }
    }

    /// The command's wire id.
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl From<Command> for u32 {
    fn from(command: Command) -> Self {
        command as u32
    }
}

/// Device types reported in a descriptor's `kind` field.
pub mod device_type {
    pub const MOTHERBOARD: u32 = 0;
    pub const DRAM: u32 = 1;
    pub const GPU: u32 = 2;
    pub const COOLER: u32 = 3;
    pub const LEDSTRIP: u32 = 4;
    pub const KEYBOARD: u32 = 5;
    pub const MOUSE: u32 = 6;
    pub const MOUSEMAT: u32 = 7;
    pub const HEADSET: u32 = 8;
    pub const HEADSET_STAND: u32 = 9;
    pub const GAMEPAD: u32 = 10;
    pub const LIGHT: u32 = 11;
    pub const SPEAKER: u32 = 12;
    pub const VIRTUAL: u32 = 13;
    pub const STORAGE: u32 = 14;
    pub const UNKNOWN: u32 = 15;
}

/// Values of a mode's `direction` field.
pub mod direction {
    pub const LEFT: u32 = 0;
    pub const RIGHT: u32 = 1;
    pub const UP: u32 = 2;
    pub const DOWN: u32 = 3;
    pub const HORIZONTAL: u32 = 4;
    pub const VERTICAL: u32 = 5;
}
