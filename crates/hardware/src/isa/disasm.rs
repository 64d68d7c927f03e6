//! Instruction Disassembler.
//!
//! Converts a 32-bit instruction encoding into `mnemonic operands` text for tracing, logging
//! and test diagnostics. Mnemonics come from the instruction table; registers use ABI names.
//!
//! # Usage
//!
//! ```
//! use rvemu_core::isa::disasm::disassemble;
//! assert_eq!(disassemble(0x00A0_0513), "addi a0, zero, 10");
//! ```

use crate::isa::decode::decode;
use crate::isa::instruction::Fields;
use crate::isa::table::Op;

/// ABI register names for x0–x31.
pub const REG_NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// Returns the ABI name for an integer register index.
#[inline]
pub fn xreg(idx: usize) -> &'static str {
    REG_NAMES.get(idx).copied().unwrap_or("x??")
}

/// Disassembles a 32-bit instruction.
///
/// Returns `"unknown"` for words the decoder rejects.
pub fn disassemble(inst: u32) -> String {
    let Some(d) = decode(inst) else {
        return "unknown".to_string();
    };
    let m = d.op.mnemonic();

    match d.fields {
        Fields::R { rd, rs1, rs2, .. } => match d.op {
            Op::LrW | Op::LrD => format!("{m} {}, ({})", xreg(rd), xreg(rs1)),
            _ if d.opcode == crate::isa::rv64a::OP_AMO => {
                format!("{m} {}, {}, ({})", xreg(rd), xreg(rs2), xreg(rs1))
            }
            _ => format!("{m} {}, {}, {}", xreg(rd), xreg(rs1), xreg(rs2)),
        },
        Fields::I { rd, rs1, imm, .. } => match d.op {
            Op::Ecall | Op::Ebreak | Op::Mret | Op::Sret | Op::Wfi | Op::Fence | Op::FenceI => {
                m.to_string()
            }
            Op::SfenceVma => format!("{m} {}, {}", xreg(rs1), xreg((imm & 0x1F) as usize)),
            Op::Lb | Op::Lh | Op::Lw | Op::Ld | Op::Lbu | Op::Lhu | Op::Lwu | Op::Jalr => {
                format!("{m} {}, {imm}({})", xreg(rd), xreg(rs1))
            }
            Op::Slli | Op::Srli | Op::Srai => {
                format!("{m} {}, {}, {}", xreg(rd), xreg(rs1), imm & 0x3F)
            }
            Op::Slliw | Op::Srliw | Op::Sraiw => {
                format!("{m} {}, {}, {}", xreg(rd), xreg(rs1), imm & 0x1F)
            }
            Op::Csrrw | Op::Csrrs | Op::Csrrc => {
                format!("{m} {}, {:#x}, {}", xreg(rd), imm & 0xFFF, xreg(rs1))
            }
            Op::Csrrwi | Op::Csrrsi | Op::Csrrci => {
                format!("{m} {}, {:#x}, {rs1}", xreg(rd), imm & 0xFFF)
            }
            _ => format!("{m} {}, {}, {imm}", xreg(rd), xreg(rs1)),
        },
        Fields::S { rs1, rs2, imm, .. } => format!("{m} {}, {imm}({})", xreg(rs2), xreg(rs1)),
        Fields::B { rs1, rs2, imm, .. } => format!("{m} {}, {}, {imm}", xreg(rs1), xreg(rs2)),
        Fields::U { rd, imm } => format!("{m} {}, {:#x}", xreg(rd), (imm as u64 >> 12) & 0xF_FFFF),
        Fields::J { rd, imm } => format!("{m} {}, {imm}", xreg(rd)),
    }
}
