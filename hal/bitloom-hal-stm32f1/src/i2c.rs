//! I2C v1 register port for STM32F1
//!
//! Exposes the byte-mode master flags of `I2C1`/`I2C2` through
//! [`RegisterPort`] so the BitLoom transaction engine can drive them.
//! Pin muxing and the peripheral clock are left to `embassy-stm32`
//! (`I2c::new_blocking`); this port only touches CR1, CR2, CCR, TRISE,
//! SR1, SR2 and DR.

use bitloom_hal::{I2cConfig, RegisterPort};
use embassy_stm32::pac::i2c::I2c as I2cRegs;

/// Standard mode SCL frequency, the only one supported
pub const STANDARD_MODE_HZ: u32 = 100_000;

/// Lowest and highest APB1 clock the I2C v1 block accepts
const MIN_PCLK1_HZ: u32 = 2_000_000;
const MAX_PCLK1_HZ: u32 = 36_000_000;

/// Maximum SCL rise time in standard mode
const MAX_RISE_NS: u32 = 1_000;

/// Peripheral configuration error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Only 100 kHz standard mode is implemented
    UnsupportedFrequency,
    /// APB1 clock outside 2..=36 MHz
    UnsupportedClock,
}

/// Timing register values for standard mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StandardTiming {
    /// CR2.FREQ, APB1 clock in MHz
    pub freq_mhz: u8,
    /// CCR.CCR, half SCL period in APB1 cycles
    pub ccr: u16,
    /// TRISE, maximum rise time in APB1 cycles plus one
    pub trise: u8,
}

impl StandardTiming {
    /// Compute register values for `config` at `pclk1_hz`
    pub fn compute(config: &I2cConfig, pclk1_hz: u32) -> Result<Self, ConfigError> {
        if config.frequency != STANDARD_MODE_HZ {
            return Err(ConfigError::UnsupportedFrequency);
        }
        if !(MIN_PCLK1_HZ..=MAX_PCLK1_HZ).contains(&pclk1_hz) {
            return Err(ConfigError::UnsupportedClock);
        }

        let freq_mhz = pclk1_hz / 1_000_000;
        // Thigh = Tlow = CCR * Tpclk1; CCR must be at least 4 in standard mode
        let ccr = (pclk1_hz / (2 * STANDARD_MODE_HZ)).max(4);
        let trise = freq_mhz * MAX_RISE_NS / 1_000 + 1;

        Ok(Self {
            freq_mhz: freq_mhz as u8,
            ccr: ccr as u16,
            trise: trise as u8,
        })
    }
}

/// Flag-level access to one I2C v1 peripheral
pub struct Stm32I2cPort {
    regs: I2cRegs,
}

impl Stm32I2cPort {
    /// Wrap a register block, e.g. `embassy_stm32::pac::I2C1`
    ///
    /// The peripheral must already be clocked and its pins muxed.
    pub fn new(regs: I2cRegs) -> Self {
        Self { regs }
    }

    /// Program 100 kHz standard mode and enable the peripheral
    pub fn configure_standard_mode(
        &mut self,
        config: &I2cConfig,
        pclk1_hz: u32,
    ) -> Result<StandardTiming, ConfigError> {
        let timing = StandardTiming::compute(config, pclk1_hz)?;

        // Timing registers may only change while PE = 0
        self.regs.cr1().modify(|w| w.set_pe(false));
        self.regs.cr2().modify(|w| w.set_freq(timing.freq_mhz));
        // F/S left at 0: standard mode
        self.regs.ccr().write(|w| w.set_ccr(timing.ccr));
        self.regs.trise().write(|w| w.set_trise(timing.trise));
        self.regs.cr1().modify(|w| {
            w.set_pe(true);
            w.set_ack(true);
        });

        Ok(timing)
    }

    /// Pulse SWRST to unstick the peripheral after a bus fault
    ///
    /// Timing registers are lost; call [`Self::configure_standard_mode`]
    /// again afterwards.
    pub fn reset(&mut self) {
        self.regs.cr1().modify(|w| w.set_swrst(true));
        self.regs.cr1().modify(|w| w.set_swrst(false));
    }
}

impl RegisterPort for Stm32I2cPort {
    fn is_bus_busy(&mut self) -> bool {
        self.regs.sr2().read().busy()
    }

    fn set_start(&mut self) {
        self.regs.cr1().modify(|w| w.set_start(true));
    }

    fn set_stop(&mut self) {
        self.regs.cr1().modify(|w| w.set_stop(true));
    }

    fn set_acknowledge(&mut self, enabled: bool) {
        self.regs.cr1().modify(|w| w.set_ack(enabled));
    }

    fn set_acknowledge_position(&mut self, next: bool) {
        self.regs.cr1().modify(|w| w.set_pos(next));
    }

    fn is_start_generated(&mut self) -> bool {
        self.regs.sr1().read().sb()
    }

    fn is_address_acknowledged(&mut self) -> bool {
        self.regs.sr1().read().addr()
    }

    fn is_byte_transfer_complete(&mut self) -> bool {
        // Transmitting, BTF is only raised with TXE set; receiving, it
        // means DR and the shift register are both full
        self.regs.sr1().read().btf()
    }

    fn is_data_register_empty(&mut self) -> bool {
        self.regs.sr1().read().txe()
    }

    fn is_data_register_not_empty(&mut self) -> bool {
        self.regs.sr1().read().rxne()
    }

    fn is_acknowledge_failure(&mut self) -> bool {
        self.regs.sr1().read().af()
    }

    fn is_arbitration_lost(&mut self) -> bool {
        self.regs.sr1().read().arlo()
    }

    fn write_data(&mut self, byte: u8) {
        self.regs.dr().write(|w| w.set_dr(byte));
    }

    fn read_data(&mut self) -> u8 {
        self.regs.dr().read().dr()
    }

    fn clear_address_flag(&mut self) {
        // ADDR clears on SR1 read followed by SR2 read
        let _ = self.regs.sr1().read();
        let _ = self.regs.sr2().read();
    }

    fn clear_acknowledge_failure(&mut self) {
        // Error flags are rc_w0: writing 1 leaves them untouched
        self.regs.sr1().write(|w| {
            w.0 = !0;
            w.set_af(false);
        });
    }

    fn clear_arbitration_lost(&mut self) {
        self.regs.sr1().write(|w| {
            w.0 = !0;
            w.set_arlo(false);
        });
    }
}
