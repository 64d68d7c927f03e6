//! Emulation statistics collection and reporting.
//!
//! This module tracks what the emulator did during a run. It provides:
//! 1. **Throughput:** Steps, retired instructions and host-side MIPS.
//! 2. **Privilege breakdown:** Steps spent in User, Supervisor and Machine mode.
//! 3. **Traps:** Exceptions and interrupts taken.
//! 4. **Caches:** Hit/miss counts for the Sv39 TLB, the shadow-map cache and the
//!    decoded-instruction cache.

use std::io::{self, Write};
use std::time::Instant;

use crate::core::arch::mode::PrivilegeMode;

/// Emulation statistics.
///
/// The hart updates the step, retirement and trap counters as it runs. Cache counters are
/// copied in from their owners by `Cpu::collect_stats` before reporting.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    /// Steps executed, including steps that ended in a trap.
    pub steps: u64,
    /// Instructions that completed without raising an exception.
    pub instructions_retired: u64,

    /// Steps that started in User mode.
    pub steps_user: u64,
    /// Steps that started in Supervisor mode.
    pub steps_supervisor: u64,
    /// Steps that started in Machine mode.
    pub steps_machine: u64,

    /// Synchronous exceptions taken.
    pub exceptions: u64,
    /// Asynchronous interrupts taken.
    pub interrupts: u64,

    /// Sv39 translations served by the TLB.
    pub tlb_hits: u64,
    /// Sv39 translations that needed a walk.
    pub tlb_misses: u64,
    /// Sv39 page-table walks, including A/D re-walks.
    pub page_walks: u64,
    /// Shadow-map lookups served by its cache.
    pub shadow_hits: u64,
    /// Shadow-map lookups that walked the shadow tree.
    pub shadow_misses: u64,
    /// Fetches served by the decoded-instruction cache.
    pub decode_hits: u64,
    /// Fetches that read memory and ran the decoder.
    pub decode_misses: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            steps: 0,
            instructions_retired: 0,
            steps_user: 0,
            steps_supervisor: 0,
            steps_machine: 0,
            exceptions: 0,
            interrupts: 0,
            tlb_hits: 0,
            tlb_misses: 0,
            page_walks: 0,
            shadow_hits: 0,
            shadow_misses: 0,
            decode_hits: 0,
            decode_misses: 0,
        }
    }
}

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"core"`, `"traps"`, `"memory"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "core", "traps", "memory"];

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { (part as f64 / total as f64) * 100.0 }
}

impl SimStats {
    /// Counts one step started at `privilege`.
    #[inline(always)]
    pub fn record_step(&mut self, privilege: PrivilegeMode) {
        self.steps += 1;
        match privilege {
            PrivilegeMode::User => self.steps_user += 1,
            PrivilegeMode::Supervisor => self.steps_supervisor += 1,
            PrivilegeMode::Machine => self.steps_machine += 1,
        }
    }

    /// Writes the requested sections to `out`.
    ///
    /// # Arguments
    ///
    /// * `out` - Destination of the report.
    /// * `sections` - Section names from [`STATS_SECTIONS`], or empty for all.
    pub fn write_sections(&self, out: &mut dyn Write, sections: &[String]) -> io::Result<()> {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.start_time.elapsed().as_secs_f64();
        let steps = self.steps.max(1);

        if want("summary") {
            let mips = if seconds > 0.0 {
                (self.instructions_retired as f64 / seconds) / 1_000_000.0
            } else {
                0.0
            };
            writeln!(out, "\n==========================================================")?;
            writeln!(out, "RV64 EMULATION STATISTICS")?;
            writeln!(out, "==========================================================")?;
            writeln!(out, "host_seconds             {seconds:.4} s")?;
            writeln!(out, "sim_steps                {}", self.steps)?;
            writeln!(out, "sim_insts                {}", self.instructions_retired)?;
            writeln!(out, "sim_mips                 {mips:.2}")?;
            writeln!(out, "----------------------------------------------------------")?;
        }
        if want("core") {
            writeln!(out, "PRIVILEGE BREAKDOWN")?;
            for (name, count) in [
                ("user", self.steps_user),
                ("supervisor", self.steps_supervisor),
                ("machine", self.steps_machine),
            ] {
                writeln!(out, "  steps.{name:<16} {count} ({:.2}%)", percent(count, steps))?;
            }
            writeln!(out, "----------------------------------------------------------")?;
        }
        if want("traps") {
            writeln!(out, "TRAPS")?;
            writeln!(out, "  traps.exceptions       {}", self.exceptions)?;
            writeln!(out, "  traps.interrupts       {}", self.interrupts)?;
            writeln!(out, "----------------------------------------------------------")?;
        }
        if want("memory") {
            writeln!(out, "TRANSLATION AND DECODE CACHES")?;
            for (name, hits, misses) in [
                ("TLB", self.tlb_hits, self.tlb_misses),
                ("Shadow", self.shadow_hits, self.shadow_misses),
                ("Decode", self.decode_hits, self.decode_misses),
            ] {
                let total = hits + misses;
                writeln!(
                    out,
                    "  {:<6} accesses: {:<10} | hits: {:<10} | miss_rate: {:.2}%",
                    name,
                    total,
                    hits,
                    percent(misses, total)
                )?;
            }
            writeln!(out, "  page walks: {}", self.page_walks)?;
        }
        writeln!(out, "==========================================================")
    }

    /// Prints the requested sections to stderr; guest console output owns stdout.
    pub fn print_sections(&self, sections: &[String]) {
        let stderr = io::stderr();
        let _ = self.write_sections(&mut stderr.lock(), sections);
    }

    /// Prints all statistics sections.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
