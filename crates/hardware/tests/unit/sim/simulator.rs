//! Run loop tests on simple-mode and machine-mode images.

use pretty_assertions::assert_eq;

use rvemu_core::common::constants::emucall;
use rvemu_core::common::{ConfigError, EmuError, FatalReason, Trap};
use rvemu_core::config::Config;
use rvemu_core::sim::{Image, ImageFormat, RunOutcome, Simulator};
use rvemu_core::soc::RunState;

use crate::common::builder::elf::{self, Segment};
use crate::common::builder::instruction::{self as asm, A0, A1, SP, ZERO, li};

fn hex_image(words: &[u32]) -> Image {
    let text: String = words.iter().map(|w| format!("{w:08x}\n")).collect();
    Image::new(ImageFormat::Hex, text.into_bytes())
}

fn simple(words: &[u32]) -> Simulator {
    Simulator::new(Config::simple(), hex_image(words)).unwrap()
}

/// `li a0, EXIT; addi a1, zero, code; ecall; nop`.
fn exit_program(code: i32) -> Vec<u32> {
    let mut words = li(A0, emucall::EXIT as u32);
    words.push(asm::addi(A1, ZERO, code));
    words.push(asm::ecall());
    words.push(asm::nop());
    words
}

#[test]
fn simple_mode_starts_at_zero_with_a_stack() {
    let sim = simple(&[asm::nop()]);
    assert_eq!(sim.cpu.pc, 0);
    assert_eq!(sim.cpu.regs.read(SP as usize), 0x4000);
    assert_eq!(sim.code_range(), 0..4);
}

#[test]
fn program_ends_by_leaving_its_code() {
    let mut sim = simple(&[asm::addi(A0, ZERO, 5), asm::addi(A1, A0, 1)]);
    let range = sim.code_range();
    assert_eq!(sim.run_while_in(range).unwrap(), RunOutcome::LeftRange);

    assert_eq!(sim.cpu.regs.read(A1 as usize), 6);
    assert_eq!(sim.cpu.pc, 8);
    assert_eq!(sim.cpu.stats.instructions_retired, 2);
}

#[test]
fn exit_call_stops_inside_the_range() {
    let mut sim = simple(&exit_program(7));
    let range = sim.code_range();
    assert_eq!(sim.run_while_in(range).unwrap(), RunOutcome::Stopped(RunState::Exited(7)));
    assert_eq!(sim.cpu.exit_code(), Some(7));
}

#[test]
fn run_returns_the_final_state() {
    let mut sim = simple(&exit_program(0));
    assert_eq!(sim.run().unwrap(), RunState::Exited(0));
}

#[test]
fn fatal_trap_halts_the_machine() {
    let mut sim = simple(&[asm::nop(), 0]);
    let range = sim.code_range();
    let err = sim.run_while_in(range).unwrap_err();

    assert!(matches!(
        err,
        EmuError::Fatal { pc: 4, reason: FatalReason::UncaughtTrap(Trap::IllegalInstruction(0)) }
    ));
    assert_eq!(sim.cpu.bus.state, RunState::Halted);
}

#[test]
fn reboot_rebuilds_the_machine_from_the_image() {
    let mut sim = simple(&[asm::addi(A0, ZERO, 1), asm::nop()]);
    sim.cpu.step().unwrap();
    sim.cpu.bus.bus.load_bytes(0, &[0; 4]).unwrap();
    assert_eq!(sim.cpu.regs.read(A0 as usize), 1);

    sim.reboot().unwrap();
    assert_eq!(sim.reboots, 1);
    assert_eq!(sim.cpu.pc, 0);
    assert_eq!(sim.cpu.regs.read(A0 as usize), 0);
    assert_eq!(sim.cpu.bus.state, RunState::Running);

    // The reloaded image runs again.
    sim.cpu.step().unwrap();
    assert_eq!(sim.cpu.regs.read(A0 as usize), 1);
}

#[test]
fn elf_entry_overrides_the_start_pc() {
    let rom = 0x8000_0000;
    let code: Vec<u8> =
        [asm::nop(), asm::addi(A0, ZERO, 9)].iter().flat_map(|w| w.to_le_bytes()).collect();
    let bytes = elf::build(rom + 4, &[Segment::load(rom, code)]);

    let mut sim = Simulator::new(Config::default(), Image::new(ImageFormat::Elf, bytes)).unwrap();
    assert_eq!(sim.cpu.pc, rom + 4);
    assert_eq!(sim.loaded.entry, Some(rom + 4));

    sim.cpu.step().unwrap();
    assert_eq!(sim.cpu.regs.read(A0 as usize), 9);
}

#[test]
fn invalid_configuration_is_rejected() {
    let mut config = Config::simple();
    config.general.cache_bits = 30;
    let err = Simulator::new(config, hex_image(&[asm::nop()])).unwrap_err();
    assert!(matches!(err, EmuError::Config(ConfigError::CacheBits(30))));
}

#[test]
fn oversized_image_is_rejected() {
    let words = vec![asm::nop(); 0x1001];
    let err = Simulator::new(Config::simple(), hex_image(&words)).unwrap_err();
    assert!(matches!(err, EmuError::Load(_)));
}
