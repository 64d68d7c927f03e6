//! RISC-V Instruction Decoder.
//!
//! This module turns a 32-bit encoding into a [`Decoded`] record. Decoding happens in two
//! pure steps:
//! 1. **Field Extraction:** The opcode picks one of six shapes through [`INS_TYPES`]; the
//!    register fields, function codes and sign-extended immediate are pulled out for it.
//! 2. **Resolution:** The fields are looked up in the instruction table. Encodings that are
//!    not in the table fail here, so the executor never sees an unknown operation.

use crate::common::constants::OPCODE_LENGTH_BITS;
use crate::isa::instruction::{Decoded, Fields, InsType, InstructionBits};
use crate::isa::table;

/// Total width of a RISC-V instruction in bits.
const INSTRUCTION_WIDTH: u32 = 32;

/// Bit shift for the I-Type immediate (bits 20-31).
const I_IMM_SHIFT: u32 = 20;

/// S-Type: `imm[11:5] | rs2 | rs1 | funct3 | imm[4:0] | opcode`.
const S_IMM_LOW_SHIFT: u32 = 7;
const S_IMM_LOW_MASK: u32 = 0x1F;
const S_IMM_HIGH_SHIFT: u32 = 25;
const S_IMM_BITS: u32 = 12;

/// B-Type: `imm[12] | imm[10:5] | rs2 | rs1 | funct3 | imm[4:1] | imm[11] | opcode`.
const B_IMM_11_SHIFT: u32 = 7;
const B_IMM_4_1_SHIFT: u32 = 8;
const B_IMM_4_1_MASK: u32 = 0xF;
const B_IMM_10_5_SHIFT: u32 = 25;
const B_IMM_10_5_MASK: u32 = 0x3F;
const B_IMM_12_SHIFT: u32 = 31;
const B_IMM_BITS: u32 = 13;

/// U-Type: `imm[31:12] | rd | opcode`.
const U_IMM_MASK: u32 = 0xFFFF_F000;

/// J-Type: `imm[20] | imm[10:1] | imm[11] | imm[19:12] | rd | opcode`.
const J_IMM_19_12_SHIFT: u32 = 12;
const J_IMM_19_12_MASK: u32 = 0xFF;
const J_IMM_11_SHIFT: u32 = 20;
const J_IMM_10_1_SHIFT: u32 = 21;
const J_IMM_10_1_MASK: u32 = 0x3FF;
const J_IMM_20_SHIFT: u32 = 31;
const J_IMM_BITS: u32 = 21;

/// Shape of each major opcode, indexed by `(opcode >> 2) & 0x1f`.
///
/// `None` marks opcodes that are not implemented (floating point, vector, custom).
pub const INS_TYPES: [Option<InsType>; 32] = {
    let mut t = [None; 32];
    t[0x03 >> 2] = Some(InsType::I); // LOAD
    t[0x0f >> 2] = Some(InsType::I); // MISC-MEM
    t[0x13 >> 2] = Some(InsType::I); // OP-IMM
    t[0x17 >> 2] = Some(InsType::U); // AUIPC
    t[0x1b >> 2] = Some(InsType::I); // OP-IMM-32
    t[0x23 >> 2] = Some(InsType::S); // STORE
    t[0x2f >> 2] = Some(InsType::R); // AMO
    t[0x33 >> 2] = Some(InsType::R); // OP
    t[0x37 >> 2] = Some(InsType::U); // LUI
    t[0x3b >> 2] = Some(InsType::R); // OP-32
    t[0x63 >> 2] = Some(InsType::B); // BRANCH
    t[0x67 >> 2] = Some(InsType::I); // JALR
    t[0x6f >> 2] = Some(InsType::J); // JAL
    t[0x73 >> 2] = Some(InsType::I); // SYSTEM
    t
};

/// Extracts the shape-specific fields of an instruction word.
///
/// # Arguments
///
/// * `inst` - The 32-bit instruction encoding.
///
/// # Returns
///
/// The fields, or `None` if the low opcode bits are not `0b11` or the opcode has no shape.
pub fn decode_fields(inst: u32) -> Option<Fields> {
    if inst & OPCODE_LENGTH_BITS != OPCODE_LENGTH_BITS {
        return None;
    }
    let ty = INS_TYPES[((inst.opcode() >> 2) & 0x1F) as usize]?;

    Some(match ty {
        InsType::R => Fields::R {
            rd: inst.rd(),
            rs1: inst.rs1(),
            rs2: inst.rs2(),
            funct3: inst.funct3(),
            funct7: inst.funct7(),
        },
        InsType::I => Fields::I {
            rd: inst.rd(),
            rs1: inst.rs1(),
            funct3: inst.funct3(),
            imm: decode_i_type_imm(inst),
        },
        InsType::S => Fields::S {
            rs1: inst.rs1(),
            rs2: inst.rs2(),
            funct3: inst.funct3(),
            imm: decode_s_type_imm(inst),
        },
        InsType::B => Fields::B {
            rs1: inst.rs1(),
            rs2: inst.rs2(),
            funct3: inst.funct3(),
            imm: decode_b_type_imm(inst),
        },
        InsType::U => Fields::U { rd: inst.rd(), imm: decode_u_type_imm(inst) },
        InsType::J => Fields::J { rd: inst.rd(), imm: decode_j_type_imm(inst) },
    })
}

/// Decodes and resolves an instruction word.
///
/// # Returns
///
/// The decoded record, or `None` for any word the executor does not implement. Callers
/// raise illegal-instruction with the word as the trap value.
pub fn decode(inst: u32) -> Option<Decoded> {
    let fields = decode_fields(inst)?;
    let opcode = inst.opcode();
    let spec = table::lookup(inst, opcode, &fields)?;
    Some(Decoded { raw: inst, opcode, op: spec.op, fields })
}

fn decode_i_type_imm(inst: u32) -> i64 {
    ((inst as i32) >> I_IMM_SHIFT) as i64
}

fn decode_s_type_imm(inst: u32) -> i64 {
    let low = (inst >> S_IMM_LOW_SHIFT) & S_IMM_LOW_MASK;
    let high = inst >> S_IMM_HIGH_SHIFT;
    sign_extend((high << 5) | low, S_IMM_BITS)
}

fn decode_b_type_imm(inst: u32) -> i64 {
    let bit_11 = (inst >> B_IMM_11_SHIFT) & 1;
    let bits_4_1 = (inst >> B_IMM_4_1_SHIFT) & B_IMM_4_1_MASK;
    let bits_10_5 = (inst >> B_IMM_10_5_SHIFT) & B_IMM_10_5_MASK;
    let bit_12 = inst >> B_IMM_12_SHIFT;

    let combined = (bit_12 << 12) | (bit_11 << 11) | (bits_10_5 << 5) | (bits_4_1 << 1);
    sign_extend(combined, B_IMM_BITS)
}

fn decode_u_type_imm(inst: u32) -> i64 {
    ((inst & U_IMM_MASK) as i32) as i64
}

fn decode_j_type_imm(inst: u32) -> i64 {
    let bits_19_12 = (inst >> J_IMM_19_12_SHIFT) & J_IMM_19_12_MASK;
    let bit_11 = (inst >> J_IMM_11_SHIFT) & 1;
    let bits_10_1 = (inst >> J_IMM_10_1_SHIFT) & J_IMM_10_1_MASK;
    let bit_20 = inst >> J_IMM_20_SHIFT;

    let combined = (bit_20 << 20) | (bits_19_12 << 12) | (bit_11 << 11) | (bits_10_1 << 1);
    sign_extend(combined, J_IMM_BITS)
}

/// Sign extends a value of `bits` width to a 64-bit signed integer.
fn sign_extend(val: u32, bits: u32) -> i64 {
    let shift = INSTRUCTION_WIDTH - bits;
    ((val as i32) << shift >> shift) as i64
}
