//! SysTick millisecond interrupt
//!
//! The firmware keeps its millisecond time base in a `TickCounter`
//! incremented from the SysTick exception; this module only programs the
//! timer.

use cortex_m::peripheral::syst::SystClkSource;
use cortex_m::peripheral::SYST;

/// Interrupt rate
pub const TICK_HZ: u32 = 1_000;

/// SysTick reload register width
const MAX_RELOAD: u32 = 0x00FF_FFFF;

/// Requested rate cannot be reached from the core clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReloadOutOfRange;

/// Reload value for a 1 kHz interrupt at `hclk_hz`
pub fn reload_for(hclk_hz: u32) -> Result<u32, ReloadOutOfRange> {
    let reload = (hclk_hz / TICK_HZ).checked_sub(1).ok_or(ReloadOutOfRange)?;
    if reload == 0 || reload > MAX_RELOAD {
        return Err(ReloadOutOfRange);
    }
    Ok(reload)
}

/// Start SysTick from the core clock with its interrupt enabled
pub fn start_millisecond_tick(syst: &mut SYST, hclk_hz: u32) -> Result<(), ReloadOutOfRange> {
    let reload = reload_for(hclk_hz)?;

    syst.disable_counter();
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(reload);
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();
    Ok(())
}
