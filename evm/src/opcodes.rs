//! The opcode set through Constantinople/Petersburg. Everything
//! introduced later — `PUSH0` (Shanghai), `BASEFEE` (London),
//! `PREVRANDAO`'s repurposing of the opcode formerly known as
//! `DIFFICULTY` (the Merge), transient storage and `MCOPY`
//! (Cancun) — is out of scope and simply absent from this enum.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Stop = 0x00,
    Add = 0x01,
    Mul = 0x02,
    Sub = 0x03,
    Div = 0x04,
    SDiv = 0x05,
    Mod = 0x06,
    SMod = 0x07,
    AddMod = 0x08,
    MulMod = 0x09,
    Exp = 0x0A,
    SignExtend = 0x0B,

    Lt = 0x10,
    Gt = 0x11,
    SLt = 0x12,
    SGt = 0x13,
    Eq = 0x14,
    IsZero = 0x15,
    And = 0x16,
    Or = 0x17,
    Xor = 0x18,
    Not = 0x19,
    Byte = 0x1A,
    Shl = 0x1B,
    Shr = 0x1C,
    Sar = 0x1D,

    Keccak256 = 0x20,

    Address = 0x30,
    Balance = 0x31,
    Origin = 0x32,
    Caller = 0x33,
    CallValue = 0x34,
    CallDataLoad = 0x35,
    CallDataSize = 0x36,
    CallDataCopy = 0x37,
    CodeSize = 0x38,
    CodeCopy = 0x39,
    GasPrice = 0x3A,
    ExtCodeSize = 0x3B,
    ExtCodeCopy = 0x3C,
    ReturnDataSize = 0x3D,
    ReturnDataCopy = 0x3E,
    ExtCodeHash = 0x3F,

    BlockHash = 0x40,
    Coinbase = 0x41,
    Timestamp = 0x42,
    Number = 0x43,
    Difficulty = 0x44,
    GasLimit = 0x45,
    ChainId = 0x46,
    SelfBalance = 0x47,

    Pop = 0x50,
    MLoad = 0x51,
    MStore = 0x52,
    MStore8 = 0x53,
    SLoad = 0x54,
    SStore = 0x55,
    Jump = 0x56,
    JumpI = 0x57,
    Pc = 0x58,
    MSize = 0x59,
    Gas = 0x5A,
    JumpDest = 0x5B,

    Push1 = 0x60,
    Push2 = 0x61,
    Push3 = 0x62,
    Push4 = 0x63,
    Push5 = 0x64,
    Push6 = 0x65,
    Push7 = 0x66,
    Push8 = 0x67,
    Push9 = 0x68,
    Push10 = 0x69,
    Push11 = 0x6A,
    Push12 = 0x6B,
    Push13 = 0x6C,
    Push14 = 0x6D,
    Push15 = 0x6E,
    Push16 = 0x6F,
    Push17 = 0x70,
    Push18 = 0x71,
    Push19 = 0x72,
    Push20 = 0x73,
    Push21 = 0x74,
    Push22 = 0x75,
    Push23 = 0x76,
    Push24 = 0x77,
    Push25 = 0x78,
    Push26 = 0x79,
    Push27 = 0x7A,
    Push28 = 0x7B,
    Push29 = 0x7C,
    Push30 = 0x7D,
    Push31 = 0x7E,
    Push32 = 0x7F,

    Dup1 = 0x80,
    Dup2 = 0x81,
    Dup3 = 0x82,
    Dup4 = 0x83,
    Dup5 = 0x84,
    Dup6 = 0x85,
    Dup7 = 0x86,
    Dup8 = 0x87,
    Dup9 = 0x88,
    Dup10 = 0x89,
    Dup11 = 0x8A,
    Dup12 = 0x8B,
    Dup13 = 0x8C,
    Dup14 = 0x8D,
    Dup15 = 0x8E,
    Dup16 = 0x8F,

    Swap1 = 0x90,
    Swap2 = 0x91,
    Swap3 = 0x92,
    Swap4 = 0x93,
    Swap5 = 0x94,
    Swap6 = 0x95,
    Swap7 = 0x96,
    Swap8 = 0x97,
    Swap9 = 0x98,
    Swap10 = 0x99,
    Swap11 = 0x9A,
    Swap12 = 0x9B,
    Swap13 = 0x9C,
    Swap14 = 0x9D,
    Swap15 = 0x9E,
    Swap16 = 0x9F,

    Log0 = 0xA0,
    Log1 = 0xA1,
    Log2 = 0xA2,
    Log3 = 0xA3,
    Log4 = 0xA4,

    Create = 0xF0,
    Call = 0xF1,
    CallCode = 0xF2,
    Return = 0xF3,
    DelegateCall = 0xF4,
    Create2 = 0xF5,
    StaticCall = 0xFA,
    Revert = 0xFD,
    Invalid = 0xFE,
    SelfDestruct = 0xFF,
}

impl Opcode {
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Stop),
            0x01 => Some(Self::Add),
            0x02 => Some(Self::Mul),
            0x03 => Some(Self::Sub),
            0x04 => Some(Self::Div),
            0x05 => Some(Self::SDiv),
            0x06 => Some(Self::Mod),
            0x07 => Some(Self::SMod),
            0x08 => Some(Self::AddMod),
            0x09 => Some(Self::MulMod),
            0x0A => Some(Self::Exp),
            0x0B => Some(Self::SignExtend),

            0x10 => Some(Self::Lt),
            0x11 => Some(Self::Gt),
            0x12 => Some(Self::SLt),
            0x13 => Some(Self::SGt),
            0x14 => Some(Self::Eq),
            0x15 => Some(Self::IsZero),
            0x16 => Some(Self::And),
            0x17 => Some(Self::Or),
            0x18 => Some(Self::Xor),
            0x19 => Some(Self::Not),
            0x1A => Some(Self::Byte),
            0x1B => Some(Self::Shl),
            0x1C => Some(Self::Shr),
            0x1D => Some(Self::Sar),

            0x20 => Some(Self::Keccak256),

            0x30 => Some(Self::Address),
            0x31 => Some(Self::Balance),
            0x32 => Some(Self::Origin),
            0x33 => Some(Self::Caller),
            0x34 => Some(Self::CallValue),
            0x35 => Some(Self::CallDataLoad),
            0x36 => Some(Self::CallDataSize),
            0x37 => Some(Self::CallDataCopy),
            0x38 => Some(Self::CodeSize),
            0x39 => Some(Self::CodeCopy),
            0x3A => Some(Self::GasPrice),
            0x3B => Some(Self::ExtCodeSize),
            0x3C => Some(Self::ExtCodeCopy),
            0x3D => Some(Self::ReturnDataSize),
            0x3E => Some(Self::ReturnDataCopy),
            0x3F => Some(Self::ExtCodeHash),

            0x40 => Some(Self::BlockHash),
            0x41 => Some(Self::Coinbase),
            0x42 => Some(Self::Timestamp),
            0x43 => Some(Self::Number),
            0x44 => Some(Self::Difficulty),
            0x45 => Some(Self::GasLimit),
            0x46 => Some(Self::ChainId),
            0x47 => Some(Self::SelfBalance),

            0x50 => Some(Self::Pop),
            0x51 => Some(Self::MLoad),
            0x52 => Some(Self::MStore),
            0x53 => Some(Self::MStore8),
            0x54 => Some(Self::SLoad),
            0x55 => Some(Self::SStore),
            0x56 => Some(Self::Jump),
            0x57 => Some(Self::JumpI),
            0x58 => Some(Self::Pc),
            0x59 => Some(Self::MSize),
            0x5A => Some(Self::Gas),
            0x5B => Some(Self::JumpDest),

            0x60..=0x7F => Some(push_from_index(byte - 0x60)),
            0x80..=0x8F => Some(dup_from_index(byte - 0x80)),
            0x90..=0x9F => Some(swap_from_index(byte - 0x90)),

            0xA0 => Some(Self::Log0),
            0xA1 => Some(Self::Log1),
            0xA2 => Some(Self::Log2),
            0xA3 => Some(Self::Log3),
            0xA4 => Some(Self::Log4),

            0xF0 => Some(Self::Create),
            0xF1 => Some(Self::Call),
            0xF2 => Some(Self::CallCode),
            0xF3 => Some(Self::Return),
            0xF4 => Some(Self::DelegateCall),
            0xF5 => Some(Self::Create2),
            0xFA => Some(Self::StaticCall),
            0xFD => Some(Self::Revert),
            0xFE => Some(Self::Invalid),
            0xFF => Some(Self::SelfDestruct),

            _ => None,
        }
    }

    /// Number of immediate bytes a `PUSH1..PUSH32` opcode consumes.
    #[must_use]
    pub fn push_size(&self) -> Option<usize> {
        let byte = *self as u8;
        if (0x60..=0x7F).contains(&byte) {
            Some((byte - 0x5F) as usize)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_terminating(&self) -> bool {
        matches!(self, Self::Stop | Self::Return | Self::Revert | Self::Invalid | Self::SelfDestruct)
    }

    #[must_use]
    pub fn is_push(&self) -> bool {
        (0x60..=0x7F).contains(&(*self as u8))
    }

    /// True for opcodes requiring `fork.has_create2` / `has_static_call`
    /// / `has_revert` / `has_returndata` / `has_ext_code_hash` to be
    /// valid; checked by the interpreter before dispatch.
    #[must_use]
    pub fn requires_fork_flag(&self) -> Option<ForkFlag> {
        match self {
            Self::Revert => Some(ForkFlag::Revert),
            Self::StaticCall => Some(ForkFlag::StaticCall),
            Self::ReturnDataSize | Self::ReturnDataCopy => Some(ForkFlag::ReturnData),
            Self::Create2 => Some(ForkFlag::Create2),
            Self::ExtCodeHash => Some(ForkFlag::ExtCodeHash),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_state_modifying(&self) -> bool {
        matches!(
            self,
            Self::SStore
                | Self::Log0
                | Self::Log1
                | Self::Log2
                | Self::Log3
                | Self::Log4
                | Self::Create
                | Self::Create2
                | Self::Call
                | Self::SelfDestruct
        )
    }
}

/// A fork feature flag gating one opcode (spec §4.11's `ForkConfig`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForkFlag {
    Revert,
    StaticCall,
    ReturnData,
    Create2,
    ExtCodeHash,
}

fn push_from_index(idx: u8) -> Opcode {
    use Opcode::*;
    const TABLE: [Opcode; 32] = [
        Push1, Push2, Push3, Push4, Push5, Push6, Push7, Push8, Push9, Push10, Push11, Push12,
        Push13, Push14, Push15, Push16, Push17, Push18, Push19, Push20, Push21, Push22, Push23,
        Push24, Push25, Push26, Push27, Push28, Push29, Push30, Push31, Push32,
    ];
    TABLE[idx as usize]
}

fn dup_from_index(idx: u8) -> Opcode {
    use Opcode::*;
    const TABLE: [Opcode; 16] = [
        Dup1, Dup2, Dup3, Dup4, Dup5, Dup6, Dup7, Dup8, Dup9, Dup10, Dup11, Dup12, Dup13, Dup14,
        Dup15, Dup16,
    ];
    TABLE[idx as usize]
}

fn swap_from_index(idx: u8) -> Opcode {
    use Opcode::*;
    const TABLE: [Opcode; 16] = [
        Swap1, Swap2, Swap3, Swap4, Swap5, Swap6, Swap7, Swap8, Swap9, Swap10, Swap11, Swap12,
        Swap13, Swap14, Swap15, Swap16,
    ];
    TABLE[idx as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_opcodes() {
        assert_eq!(Opcode::from_byte(0x00), Some(Opcode::Stop));
        assert_eq!(Opcode::from_byte(0x60), Some(Opcode::Push1));
        assert_eq!(Opcode::from_byte(0x7F), Some(Opcode::Push32));
        assert_eq!(Opcode::from_byte(0x44), Some(Opcode::Difficulty));
        assert_eq!(Opcode::from_byte(0xF1), Some(Opcode::Call));
    }

    #[test]
    fn post_petersburg_opcodes_are_absent() {
        // PUSH0 (Shanghai), BASEFEE (London): not decodable.
        assert_eq!(Opcode::from_byte(0x5F), None);
        assert_eq!(Opcode::from_byte(0x48), None);
    }

    #[test]
    fn push_size_matches_opcode_number() {
        assert_eq!(Opcode::Push1.push_size(), Some(1));
        assert_eq!(Opcode::Push32.push_size(), Some(32));
        assert_eq!(Opcode::Add.push_size(), None);
    }

    #[test]
    fn fork_gated_opcodes_are_flagged() {
        assert_eq!(Opcode::Revert.requires_fork_flag(), Some(ForkFlag::Revert));
        assert_eq!(Opcode::Create2.requires_fork_flag(), Some(ForkFlag::Create2));
        assert_eq!(Opcode::Add.requires_fork_flag(), None);
    }
}
