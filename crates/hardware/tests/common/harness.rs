use rvemu_core::common::EmuError;
use rvemu_core::config::Config;
use rvemu_core::core::Cpu;
use rvemu_core::core::arch::csr;
use rvemu_core::core::units::lsu::MemWidth;
use rvemu_core::soc::System;
use rvemu_core::soc::devices::Uart;

use crate::common::mocks::console::SharedBuffer;

/// Base of the code region in every test machine.
pub const ROM_BASE: u64 = 0x8000_0000;
/// Base of the data region in every test machine.
pub const RAM_BASE: u64 = 0xc000_0000;

/// A hart and its machine, built from a test configuration.
pub struct TestContext {
    pub cpu: Cpu,
    pub config: Config,
    /// Output of the PUTC emulator call.
    pub console: SharedBuffer,
    /// Output of the UART, when the virt devices are attached.
    pub uart_out: SharedBuffer,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.memory.rom_base = ROM_BASE;
    config.memory.rom_size = 0x4000;
    config.memory.ram_base = RAM_BASE;
    config.memory.ram_size = 0x4000;
    config.general.start_pc = ROM_BASE;
    config.general.cache_bits = 8;
    config.general.device_update_period = 0;
    config
}

impl TestContext {
    /// Machine-mode hart with code and data regions and no devices.
    pub fn new() -> Self {
        Self::with_config(test_config(), false)
    }

    /// UserOnly hart: no translation, emulator calls on `ecall`, every trap fatal.
    pub fn user_only() -> Self {
        let mut config = test_config();
        config.general.user_only = true;
        Self::with_config(config, false)
    }

    /// Machine-mode hart with the UART, CLINT, PLIC and SysCon at their default bases.
    /// Devices update on every step.
    pub fn virt() -> Self {
        Self::with_config(test_config(), true)
    }

    fn with_config(config: Config, virt: bool) -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let mut system = System::from_config(&config).unwrap();
        let uart_out = SharedBuffer::new();
        if virt {
            let uart = Uart::new(Box::new(uart_out.clone()), config.devices.uart_irq);
            system.attach_virt_devices(&config.devices, uart).unwrap();
        }
        let mut cpu = Cpu::new(system, &config);
        let console = SharedBuffer::new();
        cpu.set_console(Box::new(console.clone()));
        Self { cpu, config, console, uart_out }
    }

    /// Copies `words` to `addr`.
    pub fn write_words(&mut self, addr: u64, words: &[u32]) {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.cpu.bus.bus.load_bytes(addr, &bytes).unwrap();
    }

    /// Loads `words` at the start PC and points the hart at them.
    pub fn load_program(mut self, words: &[u32]) -> Self {
        self.write_words(ROM_BASE, words);
        self.cpu.pc = ROM_BASE;
        self
    }

    /// Address of the `n`th instruction of a program loaded with [`Self::load_program`].
    pub fn pc_of(n: u64) -> u64 {
        ROM_BASE + 4 * n
    }

    pub fn reg(&self, idx: usize) -> u64 {
        self.cpu.regs.read(idx)
    }

    pub fn set_reg(&mut self, idx: usize, val: u64) {
        self.cpu.regs.write(idx, val);
    }

    pub fn csr(&self, num: u32) -> u64 {
        self.cpu.csr.get(num)
    }

    /// Points `mtvec` at `handler` (direct mode).
    pub fn set_trap_handler(&mut self, handler: u64) {
        self.cpu.csr.set(csr::MTVEC, handler);
    }

    pub fn step(&mut self) -> Result<(), EmuError> {
        self.cpu.step()
    }

    /// Steps `n` times, stopping early once the machine stops.
    pub fn run(&mut self, n: usize) -> Result<(), EmuError> {
        for _ in 0..n {
            if !self.cpu.is_running() {
                break;
            }
            self.cpu.step()?;
        }
        Ok(())
    }

    /// Reads guest physical memory.
    pub fn read_phys(&mut self, paddr: u64, width: MemWidth) -> u64 {
        let cpu = &mut self.cpu;
        cpu.bus
            .bus
            .read(paddr, width, rvemu_core::common::AccessType::Read, cpu.csr.mip_mut())
            .unwrap()
    }

    /// Writes guest physical memory.
    pub fn write_phys(&mut self, paddr: u64, width: MemWidth, val: u64) {
        let cpu = &mut self.cpu;
        cpu.bus.bus.write(paddr, width, val, cpu.csr.mip_mut()).unwrap();
    }
}
