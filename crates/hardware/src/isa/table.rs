//! Canonical instruction table.
//!
//! Every supported instruction appears exactly once here. The decoder resolves a word to an
//! [`Op`] through this table, the executor matches on the `Op`, and the disassembler takes
//! the mnemonic from it, so the three can never disagree about which encodings exist.
//!
//! Entries are grouped by a per-shape dispatch key:
//! * R: `(opcode >> 2) | (funct3 << 5) | (funct7 << 8)`
//! * I, S, B: `(opcode >> 2) | (funct3 << 5)`
//! * U: `opcode >> 2`
//! * J: `opcode`
//!
//! Where several operations share a key (shift variants, the SYSTEM function-12 group)
//! a [`Select`] predicate on the raw word tells them apart.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::isa::instruction::{Fields, InsType, InstructionBits};
use crate::isa::privileged::opcodes as sys;
use crate::isa::rv64a::{self, funct7 as a7};
use crate::isa::rv64i::{funct3 as f3, funct7 as f7, opcodes as op};
use crate::isa::rv64m::{self, funct3 as m3};

/// Every operation the executor implements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Op {
    // RV64I
    Lui,
    Auipc,
    Jal,
    Jalr,
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Lb,
    Lh,
    Lw,
    Ld,
    Lbu,
    Lhu,
    Lwu,
    Sb,
    Sh,
    Sw,
    Sd,
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Addiw,
    Slliw,
    Srliw,
    Sraiw,
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Addw,
    Subw,
    Sllw,
    Srlw,
    Sraw,
    Fence,
    FenceI,
    Ecall,
    Ebreak,
    // RV64M
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    Mulw,
    Divw,
    Divuw,
    Remw,
    Remuw,
    // RV64A
    LrW,
    ScW,
    AmoswapW,
    AmoaddW,
    AmoxorW,
    AmoandW,
    AmoorW,
    AmominW,
    AmomaxW,
    AmominuW,
    AmomaxuW,
    LrD,
    ScD,
    AmoswapD,
    AmoaddD,
    AmoxorD,
    AmoandD,
    AmoorD,
    AmominD,
    AmomaxD,
    AmominuD,
    AmomaxuD,
    // Zicsr
    Csrrw,
    Csrrs,
    Csrrc,
    Csrrwi,
    Csrrsi,
    Csrrci,
    // Privileged
    Mret,
    Sret,
    Wfi,
    SfenceVma,
}

/// Extra predicate on the raw word for entries that share a dispatch key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Select {
    /// No further constraint.
    Any,
    /// Bits 31..20 equal the value and rs1 = rd = 0.
    Funct12(u32),
    /// Bits 31..26 equal the value (64-bit immediate shifts).
    Funct6(u32),
    /// Bits 31..25 equal the value (32-bit immediate shifts, SFENCE.VMA).
    Funct7(u32),
    /// rs2 must be zero (LR).
    Rs2Zero,
}

impl Select {
    fn matches(self, raw: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Funct12(v) => raw.funct12() == v && raw.rs1() == 0 && raw.rd() == 0,
            Self::Funct6(v) => raw >> 26 == v,
            Self::Funct7(v) => raw.funct7() == v,
            Self::Rs2Zero => raw.rs2() == 0,
        }
    }
}

/// One row of the instruction table.
#[derive(Clone, Copy, Debug)]
pub struct InstrSpec {
    /// Operation.
    pub op: Op,
    /// Assembler mnemonic.
    pub mnemonic: &'static str,
    /// Encoding shape.
    pub ty: InsType,
    /// Major opcode.
    pub opcode: u32,
    /// funct3 (ignored for U and J).
    pub funct3: u32,
    /// funct7 (R only; AMO entries hold funct5 << 2).
    pub funct7: u32,
    /// Disambiguation among entries with the same key.
    pub select: Select,
}

impl InstrSpec {
    /// Dispatch key of this entry.
    pub const fn key(&self) -> u32 {
        dispatch_key(self.ty, self.opcode, self.funct3, self.funct7)
    }
}

/// Computes the per-shape dispatch key.
pub const fn dispatch_key(ty: InsType, opcode: u32, funct3: u32, funct7: u32) -> u32 {
    match ty {
        InsType::R => (opcode >> 2) | (funct3 << 5) | (funct7 << 8),
        InsType::I | InsType::S | InsType::B => (opcode >> 2) | (funct3 << 5),
        InsType::U => opcode >> 2,
        InsType::J => opcode,
    }
}

const fn r(op: Op, mnemonic: &'static str, opcode: u32, funct3: u32, funct7: u32) -> InstrSpec {
    InstrSpec { op, mnemonic, ty: InsType::R, opcode, funct3, funct7, select: Select::Any }
}

const fn i(op: Op, mnemonic: &'static str, opcode: u32, funct3: u32, select: Select) -> InstrSpec {
    InstrSpec { op, mnemonic, ty: InsType::I, opcode, funct3, funct7: 0, select }
}

const fn s(op: Op, mnemonic: &'static str, funct3: u32) -> InstrSpec {
    InstrSpec {
        op,
        mnemonic,
        ty: InsType::S,
        opcode: op::OP_STORE,
        funct3,
        funct7: 0,
        select: Select::Any,
    }
}

const fn b(op: Op, mnemonic: &'static str, funct3: u32) -> InstrSpec {
    InstrSpec {
        op,
        mnemonic,
        ty: InsType::B,
        opcode: op::OP_BRANCH,
        funct3,
        funct7: 0,
        select: Select::Any,
    }
}

const fn amo(op: Op, mnemonic: &'static str, width: u32, funct7: u32, select: Select) -> InstrSpec {
    InstrSpec { op, mnemonic, ty: InsType::R, opcode: rv64a::OP_AMO, funct3: width, funct7, select }
}

/// U-type and J-type rows: only the opcode selects them.
const fn upper(op: Op, mnemonic: &'static str, ty: InsType, opcode: u32) -> InstrSpec {
    InstrSpec { op, mnemonic, ty, opcode, funct3: 0, funct7: 0, select: Select::Any }
}

const ANY: Select = Select::Any;

/// The instruction table.
pub static INSTRUCTIONS: &[InstrSpec] = &[
    upper(Op::Lui, "lui", InsType::U, op::OP_LUI),
    upper(Op::Auipc, "auipc", InsType::U, op::OP_AUIPC),
    upper(Op::Jal, "jal", InsType::J, op::OP_JAL),
    i(Op::Jalr, "jalr", op::OP_JALR, f3::JALR, ANY),
    b(Op::Beq, "beq", f3::BEQ),
    b(Op::Bne, "bne", f3::BNE),
    b(Op::Blt, "blt", f3::BLT),
    b(Op::Bge, "bge", f3::BGE),
    b(Op::Bltu, "bltu", f3::BLTU),
    b(Op::Bgeu, "bgeu", f3::BGEU),
    i(Op::Lb, "lb", op::OP_LOAD, f3::LB, ANY),
    i(Op::Lh, "lh", op::OP_LOAD, f3::LH, ANY),
    i(Op::Lw, "lw", op::OP_LOAD, f3::LW, ANY),
    i(Op::Ld, "ld", op::OP_LOAD, f3::LD, ANY),
    i(Op::Lbu, "lbu", op::OP_LOAD, f3::LBU, ANY),
    i(Op::Lhu, "lhu", op::OP_LOAD, f3::LHU, ANY),
    i(Op::Lwu, "lwu", op::OP_LOAD, f3::LWU, ANY),
    s(Op::Sb, "sb", f3::SB),
    s(Op::Sh, "sh", f3::SH),
    s(Op::Sw, "sw", f3::SW),
    s(Op::Sd, "sd", f3::SD),
    i(Op::Addi, "addi", op::OP_IMM, f3::ADD_SUB, ANY),
    i(Op::Slti, "slti", op::OP_IMM, f3::SLT, ANY),
    i(Op::Sltiu, "sltiu", op::OP_IMM, f3::SLTU, ANY),
    i(Op::Xori, "xori", op::OP_IMM, f3::XOR, ANY),
    i(Op::Ori, "ori", op::OP_IMM, f3::OR, ANY),
    i(Op::Andi, "andi", op::OP_IMM, f3::AND, ANY),
    i(Op::Slli, "slli", op::OP_IMM, f3::SLL, Select::Funct6(f7::DEFAULT)),
    i(Op::Srli, "srli", op::OP_IMM, f3::SRL_SRA, Select::Funct6(f7::DEFAULT)),
    i(Op::Srai, "srai", op::OP_IMM, f3::SRL_SRA, Select::Funct6(f7::ALT >> 1)),
    i(Op::Addiw, "addiw", op::OP_IMM_32, f3::ADD_SUB, ANY),
    i(Op::Slliw, "slliw", op::OP_IMM_32, f3::SLL, Select::Funct7(f7::DEFAULT)),
    i(Op::Srliw, "srliw", op::OP_IMM_32, f3::SRL_SRA, Select::Funct7(f7::DEFAULT)),
    i(Op::Sraiw, "sraiw", op::OP_IMM_32, f3::SRL_SRA, Select::Funct7(f7::ALT)),
    r(Op::Add, "add", op::OP_REG, f3::ADD_SUB, f7::DEFAULT),
    r(Op::Sub, "sub", op::OP_REG, f3::ADD_SUB, f7::ALT),
    r(Op::Sll, "sll", op::OP_REG, f3::SLL, f7::DEFAULT),
    r(Op::Slt, "slt", op::OP_REG, f3::SLT, f7::DEFAULT),
    r(Op::Sltu, "sltu", op::OP_REG, f3::SLTU, f7::DEFAULT),
    r(Op::Xor, "xor", op::OP_REG, f3::XOR, f7::DEFAULT),
    r(Op::Srl, "srl", op::OP_REG, f3::SRL_SRA, f7::DEFAULT),
    r(Op::Sra, "sra", op::OP_REG, f3::SRL_SRA, f7::ALT),
    r(Op::Or, "or", op::OP_REG, f3::OR, f7::DEFAULT),
    r(Op::And, "and", op::OP_REG, f3::AND, f7::DEFAULT),
    r(Op::Addw, "addw", op::OP_REG_32, f3::ADD_SUB, f7::DEFAULT),
    r(Op::Subw, "subw", op::OP_REG_32, f3::ADD_SUB, f7::ALT),
    r(Op::Sllw, "sllw", op::OP_REG_32, f3::SLL, f7::DEFAULT),
    r(Op::Srlw, "srlw", op::OP_REG_32, f3::SRL_SRA, f7::DEFAULT),
    r(Op::Sraw, "sraw", op::OP_REG_32, f3::SRL_SRA, f7::ALT),
    i(Op::Fence, "fence", op::OP_MISC_MEM, f3::FENCE, ANY),
    i(Op::FenceI, "fence.i", op::OP_MISC_MEM, f3::FENCE_I, ANY),
    i(Op::Ecall, "ecall", sys::OP_SYSTEM, sys::PRIV, Select::Funct12(sys::F12_ECALL)),
    i(Op::Ebreak, "ebreak", sys::OP_SYSTEM, sys::PRIV, Select::Funct12(sys::F12_EBREAK)),
    r(Op::Mul, "mul", op::OP_REG, m3::MUL, rv64m::M_EXTENSION),
    r(Op::Mulh, "mulh", op::OP_REG, m3::MULH, rv64m::M_EXTENSION),
    r(Op::Mulhsu, "mulhsu", op::OP_REG, m3::MULHSU, rv64m::M_EXTENSION),
    r(Op::Mulhu, "mulhu", op::OP_REG, m3::MULHU, rv64m::M_EXTENSION),
    r(Op::Div, "div", op::OP_REG, m3::DIV, rv64m::M_EXTENSION),
    r(Op::Divu, "divu", op::OP_REG, m3::DIVU, rv64m::M_EXTENSION),
    r(Op::Rem, "rem", op::OP_REG, m3::REM, rv64m::M_EXTENSION),
    r(Op::Remu, "remu", op::OP_REG, m3::REMU, rv64m::M_EXTENSION),
    r(Op::Mulw, "mulw", op::OP_REG_32, m3::MUL, rv64m::M_EXTENSION),
    r(Op::Divw, "divw", op::OP_REG_32, m3::DIV, rv64m::M_EXTENSION),
    r(Op::Divuw, "divuw", op::OP_REG_32, m3::DIVU, rv64m::M_EXTENSION),
    r(Op::Remw, "remw", op::OP_REG_32, m3::REM, rv64m::M_EXTENSION),
    r(Op::Remuw, "remuw", op::OP_REG_32, m3::REMU, rv64m::M_EXTENSION),
    amo(Op::LrW, "lr.w", rv64a::WIDTH_32, a7::LR, Select::Rs2Zero),
    amo(Op::ScW, "sc.w", rv64a::WIDTH_32, a7::SC, ANY),
    amo(Op::AmoswapW, "amoswap.w", rv64a::WIDTH_32, a7::AMOSWAP, ANY),
    amo(Op::AmoaddW, "amoadd.w", rv64a::WIDTH_32, a7::AMOADD, ANY),
    amo(Op::AmoxorW, "amoxor.w", rv64a::WIDTH_32, a7::AMOXOR, ANY),
    amo(Op::AmoandW, "amoand.w", rv64a::WIDTH_32, a7::AMOAND, ANY),
    amo(Op::AmoorW, "amoor.w", rv64a::WIDTH_32, a7::AMOOR, ANY),
    amo(Op::AmominW, "amomin.w", rv64a::WIDTH_32, a7::AMOMIN, ANY),
    amo(Op::AmomaxW, "amomax.w", rv64a::WIDTH_32, a7::AMOMAX, ANY),
    amo(Op::AmominuW, "amominu.w", rv64a::WIDTH_32, a7::AMOMINU, ANY),
    amo(Op::AmomaxuW, "amomaxu.w", rv64a::WIDTH_32, a7::AMOMAXU, ANY),
    amo(Op::LrD, "lr.d", rv64a::WIDTH_64, a7::LR, Select::Rs2Zero),
    amo(Op::ScD, "sc.d", rv64a::WIDTH_64, a7::SC, ANY),
    amo(Op::AmoswapD, "amoswap.d", rv64a::WIDTH_64, a7::AMOSWAP, ANY),
    amo(Op::AmoaddD, "amoadd.d", rv64a::WIDTH_64, a7::AMOADD, ANY),
    amo(Op::AmoxorD, "amoxor.d", rv64a::WIDTH_64, a7::AMOXOR, ANY),
    amo(Op::AmoandD, "amoand.d", rv64a::WIDTH_64, a7::AMOAND, ANY),
    amo(Op::AmoorD, "amoor.d", rv64a::WIDTH_64, a7::AMOOR, ANY),
    amo(Op::AmominD, "amomin.d", rv64a::WIDTH_64, a7::AMOMIN, ANY),
    amo(Op::AmomaxD, "amomax.d", rv64a::WIDTH_64, a7::AMOMAX, ANY),
    amo(Op::AmominuD, "amominu.d", rv64a::WIDTH_64, a7::AMOMINU, ANY),
    amo(Op::AmomaxuD, "amomaxu.d", rv64a::WIDTH_64, a7::AMOMAXU, ANY),
    i(Op::Csrrw, "csrrw", sys::OP_SYSTEM, sys::CSRRW, ANY),
    i(Op::Csrrs, "csrrs", sys::OP_SYSTEM, sys::CSRRS, ANY),
    i(Op::Csrrc, "csrrc", sys::OP_SYSTEM, sys::CSRRC, ANY),
    i(Op::Csrrwi, "csrrwi", sys::OP_SYSTEM, sys::CSRRWI, ANY),
    i(Op::Csrrsi, "csrrsi", sys::OP_SYSTEM, sys::CSRRSI, ANY),
    i(Op::Csrrci, "csrrci", sys::OP_SYSTEM, sys::CSRRCI, ANY),
    i(Op::Mret, "mret", sys::OP_SYSTEM, sys::PRIV, Select::Funct12(sys::F12_MRET)),
    i(Op::Sret, "sret", sys::OP_SYSTEM, sys::PRIV, Select::Funct12(sys::F12_SRET)),
    i(Op::Wfi, "wfi", sys::OP_SYSTEM, sys::PRIV, Select::Funct12(sys::F12_WFI)),
    i(Op::SfenceVma, "sfence.vma", sys::OP_SYSTEM, sys::PRIV, Select::Funct7(sys::F7_SFENCE_VMA)),
];

type DispatchMap = HashMap<(InsType, u32), Vec<&'static InstrSpec>>;

fn dispatch_map() -> &'static DispatchMap {
    static MAP: OnceLock<DispatchMap> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = DispatchMap::new();
        for spec in INSTRUCTIONS {
            map.entry((spec.ty, spec.key())).or_default().push(spec);
        }
        map
    })
}

/// Resolves decoded fields to a table entry.
///
/// # Arguments
///
/// * `raw` - The instruction word, used by [`Select`] predicates.
/// * `opcode` - The major opcode.
/// * `fields` - Fields extracted for the opcode's shape.
///
/// # Returns
///
/// The matching entry, or `None` when the encoding is not in the table.
pub fn lookup(raw: u32, opcode: u32, fields: &Fields) -> Option<&'static InstrSpec> {
    let mut funct7 = fields.funct7();
    if opcode == rv64a::OP_AMO {
        funct7 &= rv64a::FUNCT7_OP_MASK;
    }
    let key = dispatch_key(fields.ins_type(), opcode, fields.funct3(), funct7);
    dispatch_map()
        .get(&(fields.ins_type(), key))?
        .iter()
        .copied()
        .find(|spec| spec.opcode == opcode && spec.select.matches(raw))
}

impl Op {
    /// Table entry of this operation.
    pub fn spec(self) -> Option<&'static InstrSpec> {
        INSTRUCTIONS.iter().find(|spec| spec.op == self)
    }

    /// Assembler mnemonic.
    pub fn mnemonic(self) -> &'static str {
        self.spec().map_or("unknown", |spec| spec.mnemonic)
    }
}
