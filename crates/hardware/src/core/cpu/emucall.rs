//! UserOnly emulator calls.
//!
//! In UserOnly mode there is no guest trap handler. `ecall` instead asks the emulator for a
//! service selected by `a0`, and `ebreak` dumps the hart state to stderr. Outside UserOnly
//! both raise their architectural exceptions.

use std::io::{self, Write};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use super::Cpu;
use crate::common::Trap;
use crate::common::constants::emucall;
use crate::core::arch::mode::PrivilegeMode;
use crate::isa::abi::{REG_A0, REG_A1};
use crate::soc::RunState;

/// Milliseconds on the host's monotonic clock, counted from the first call.
fn host_millis() -> u64 {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u64
}

impl Cpu {
    /// Executes `ECALL`.
    pub fn ecall(&mut self) -> Result<(), Trap> {
        if !self.user_only {
            return Err(match self.privilege {
                PrivilegeMode::User => Trap::EnvironmentCallFromUMode,
                PrivilegeMode::Supervisor => Trap::EnvironmentCallFromSMode,
                PrivilegeMode::Machine => Trap::EnvironmentCallFromMMode,
            });
        }
        let arg = self.regs.read(REG_A1);
        match self.regs.read(REG_A0) {
            emucall::PUTC => {
                let written = self.console.write_all(&[arg as u8]);
                if let Err(err) = written.and_then(|()| self.console.flush()) {
                    tracing::warn!("console write failed: {err}");
                }
            }
            emucall::EXIT => {
                tracing::info!("guest exited with code {arg}");
                self.bus.state = RunState::Exited(arg);
            }
            emucall::GTIK => self.regs.write(REG_A0, host_millis()),
            emucall::SLEP => thread::sleep(Duration::from_millis(arg)),
            emucall::PING => self.regs.write(REG_A0, emucall::PONG),
            other => {
                tracing::warn!("unknown emulator call {other:#x}");
                return self.ebreak();
            }
        }
        Ok(())
    }

    /// Executes `EBREAK`.
    pub fn ebreak(&mut self) -> Result<(), Trap> {
        if !self.user_only {
            return Err(Trap::Breakpoint(0));
        }
        let stderr = io::stderr();
        let _ = self.write_ebreak_dump(&mut stderr.lock());
        Ok(())
    }

    /// Writes `EBREAK PC=...` followed by the registers, four per line.
    pub fn write_ebreak_dump(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "EBREAK PC={:016x}", self.pc)?;
        for (i, value) in self.regs.values().iter().enumerate() {
            write!(out, "x{i:2}={value:016x} ")?;
            if i % 4 == 3 {
                writeln!(out)?;
            }
        }
        Ok(())
    }
}
