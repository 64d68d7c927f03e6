//! Universal Asynchronous Receiver-Transmitter (UART).
//!
//! Implements an 8250-compatible UART with 8-bit registers only. Output goes to a host
//! writer; input bytes are queued by the host, either directly or from a stdin reader
//! thread. When receive interrupts are enabled and data is waiting, `update` raises the
//! UART's interrupt-aggregator source.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Read, Write};
use std::sync::mpsc::{Receiver, channel};
use std::sync::{Mutex, OnceLock};
use std::thread;

use crate::common::Trap;
use crate::soc::traits::{Device, DeviceContext};

/// Receiver Buffer Register (Read) / Divisor Latch Low (DLAB=1).
const REG_RBR: u64 = 0;
/// Transmitter Holding Register (Write) / Divisor Latch Low (DLAB=1).
const REG_THR: u64 = 0;
/// Interrupt Enable Register / Divisor Latch High (DLAB=1).
const REG_IER: u64 = 1;
/// Interrupt Identity Register (Read).
const REG_IIR: u64 = 2;
/// FIFO Control Register (Write).
const REG_FCR: u64 = 2;
/// Line Control Register.
const REG_LCR: u64 = 3;
/// Modem Control Register.
const REG_MCR: u64 = 4;
/// Line Status Register.
const REG_LSR: u64 = 5;
/// Modem Status Register.
const REG_MSR: u64 = 6;
/// Scratch Register.
const REG_SCR: u64 = 7;

/// Size of the UART region.
pub const UART_SIZE: u64 = 0x1000;

const IIR_NO_INTERRUPT: u8 = 0x01;
const IIR_THRE: u8 = 0x02;
const IIR_RDA: u8 = 0x04;
const IIR_FIFO_ENABLED: u8 = 0xC0;

const LSR_DATA_READY: u8 = 0x01;
const LSR_THRE: u8 = 0x20;
const LSR_TEMT: u8 = 0x40;

const LCR_DLAB: u8 = 0x80;

const IER_RDA: u8 = 0x01;
const IER_THRE: u8 = 0x02;
const IER_MASK: u8 = 0x0F;
const FCR_MASK: u8 = 0xCF;
const MCR_MASK: u8 = 0x1B;

/// Bytes read from the host's stdin by a single reader thread shared by every console UART.
fn host_stdin() -> &'static Mutex<Receiver<u8>> {
    static STDIN: OnceLock<Mutex<Receiver<u8>>> = OnceLock::new();
    STDIN.get_or_init(|| {
        let (sender, receiver) = channel();
        let _reader = thread::spawn(move || {
            let mut byte = [0u8; 1];
            let stdin = io::stdin();
            let mut handle = stdin.lock();
            while handle.read_exact(&mut byte).is_ok() {
                if sender.send(byte[0]).is_err() {
                    break;
                }
            }
        });
        Mutex::new(receiver)
    })
}

/// UART device structure.
pub struct Uart {
    tx: Box<dyn Write>,
    rx_queue: VecDeque<u8>,
    host_input: bool,
    irq: u32,
    ier: u8,
    fcr: u8,
    lcr: u8,
    mcr: u8,
    scr: u8,
    div: u16,
    thre_ip: bool,
}

impl fmt::Debug for Uart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Uart")
            .field("irq", &self.irq)
            .field("ier", &self.ier)
            .field("lcr", &self.lcr)
            .field("rx_queued", &self.rx_queue.len())
            .finish_non_exhaustive()
    }
}

impl Uart {
    /// Creates a UART writing to `tx` and raising aggregator source `irq`.
    pub fn new(tx: Box<dyn Write>, irq: u32) -> Self {
        Self {
            tx,
            rx_queue: VecDeque::new(),
            host_input: false,
            irq,
            ier: 0,
            fcr: 0,
            lcr: 0,
            mcr: 0,
            scr: 0,
            div: 0,
            thre_ip: false,
        }
    }

    /// Creates a UART on the host console: output to stdout, input from stdin.
    pub fn stdio(irq: u32) -> Self {
        let mut uart = Self::new(Box::new(io::stdout()), irq);
        uart.host_input = true;
        uart
    }

    /// Queues bytes as if they arrived on the line.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.rx_queue.extend(bytes);
    }

    /// Aggregator source this UART raises.
    pub fn irq(&self) -> u32 {
        self.irq
    }

    fn poll_host(&mut self) {
        if !self.host_input {
            return;
        }
        if let Ok(rx) = host_stdin().lock() {
            while let Ok(byte) = rx.try_recv() {
                self.rx_queue.push_back(byte);
            }
        }
    }

    fn dlab_set(&self) -> bool {
        (self.lcr & LCR_DLAB) != 0
    }

    fn interrupt_id(&self) -> u8 {
        if (self.ier & IER_RDA) != 0 && !self.rx_queue.is_empty() {
            return IIR_RDA;
        }
        if (self.ier & IER_THRE) != 0 && self.thre_ip {
            return IIR_THRE;
        }
        IIR_NO_INTERRUPT
    }

    fn transmit(&mut self, byte: u8) {
        // The guest always sees THR empty, even when the host console fails.
        let mut result = self.tx.write_all(&[byte]);
        if byte == b'\n' {
            result = result.and_then(|()| self.tx.flush());
        }
        if let Err(err) = result {
            tracing::warn!("uart console write failed: {err}");
        }
        self.thre_ip = true;
    }
}

impl Device for Uart {
    fn name(&self) -> &str {
        "UART0"
    }

    fn size(&self) -> u64 {
        UART_SIZE
    }

    fn read_u8(&mut self, offset: u64, ctx: &mut DeviceContext<'_>) -> Result<u8, Trap> {
        let value = match offset {
            REG_RBR if self.dlab_set() => (self.div & 0xFF) as u8,
            REG_RBR => {
                self.poll_host();
                self.rx_queue.pop_front().unwrap_or(0)
            }
            REG_IER if self.dlab_set() => (self.div >> 8) as u8,
            REG_IER => self.ier,
            REG_IIR => {
                let id = self.interrupt_id();
                if id == IIR_THRE {
                    self.thre_ip = false;
                }
                let fifo = if self.fcr & 1 != 0 { IIR_FIFO_ENABLED } else { 0 };
                fifo | id
            }
            REG_LCR => self.lcr,
            REG_MCR => self.mcr,
            REG_LSR => {
                self.poll_host();
                let ready = if self.rx_queue.is_empty() { 0 } else { LSR_DATA_READY };
                LSR_THRE | LSR_TEMT | ready
            }
            REG_MSR => 0,
            REG_SCR => self.scr,
            _ => return Err(ctx.load_fault(offset)),
        };
        Ok(value)
    }

    fn write_u8(&mut self, offset: u64, val: u8, ctx: &mut DeviceContext<'_>) -> Result<(), Trap> {
        match offset {
            REG_THR if self.dlab_set() => self.div = (self.div & 0xFF00) | u16::from(val),
            REG_THR => self.transmit(val),
            REG_IER if self.dlab_set() => self.div = (self.div & 0x00FF) | (u16::from(val) << 8),
            REG_IER => {
                self.ier = val & IER_MASK;
                if (self.ier & IER_THRE) != 0 {
                    self.thre_ip = true;
                }
            }
            REG_FCR => self.fcr = val & FCR_MASK,
            REG_LCR => self.lcr = val,
            REG_MCR => self.mcr = val & MCR_MASK,
            REG_SCR => self.scr = val,
            REG_LSR | REG_MSR => {}
            _ => return Err(ctx.store_fault(offset)),
        }
        Ok(())
    }

    fn update(&mut self, ctx: &mut DeviceContext<'_>) {
        self.poll_host();
        if (self.ier & IER_RDA) != 0 && !self.rx_queue.is_empty() {
            ctx.raise_irq(self.irq);
        }
    }

    fn free(&mut self) {
        if let Err(err) = self.tx.flush() {
            tracing::warn!("uart console flush failed: {err}");
        }
    }

    fn as_uart_mut(&mut self) -> Option<&mut Uart> {
        Some(self)
    }
}
