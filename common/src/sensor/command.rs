/// The 16-bit opcodes the node sends to the sensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Command {
    Wake = 0x3517,
    Sleep = 0xB098,
    /// Normal mode, clock stretching disabled, temperature first.
    Measure = 0x7866,
}

impl Command {
    pub const fn opcode(self) -> u16 {
        self as u16
    }

    /// Wire frame, most significant byte first.
    pub const fn to_bytes(self) -> [u8; 2] {
        self.opcode().to_be_bytes()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Wake => "wakeup",
            Self::Sleep => "sleep",
            Self::Measure => "measure",
        }
    }
}
