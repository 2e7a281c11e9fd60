//! BitLoom Firmware
//!
//! Firmware for the STM32F103C8 Bluepill. Blinks the PC13 LED from a
//! SysTick-driven millisecond counter and periodically reads a register
//! block from an I2C EEPROM on PB6/PB7, logging the outcome over RTT.

#![no_std]
#![no_main]

use bitloom_core::{BlinkConfig, BlinkSchedule, TickCounter};
use bitloom_drivers::i2c::{BusError, I2cError, I2cMaster, SharedI2c};
use bitloom_drivers::led::StatusLed;
use bitloom_hal::I2cConfig;
use bitloom_hal_stm32f1::systick::start_millisecond_tick;
use bitloom_hal_stm32f1::{LedPin, Stm32I2cPort};
use cortex_m_rt::exception;
use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::i2c::I2c;
use embassy_stm32::time::Hertz;
use embassy_stm32::{pac, Config};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_time::Timer;
use {defmt_rtt as _, panic_probe as _};

/// 8 MHz crystal x9
const HCLK_HZ: u32 = 72_000_000;
/// APB1 = HCLK / 2
const PCLK1_HZ: u32 = HCLK_HZ / 2;

/// 24C-series EEPROM on the expansion header
const EEPROM_ADDRESS: u8 = 0x50;
/// First register read back on every cycle
const EEPROM_REGISTER: u8 = 0x00;
/// Time between two EEPROM reads
const READ_PERIOD_MS: u32 = 2_000;
/// Back-to-back bus timeouts before the peripheral is reset
const RESET_AFTER_TIMEOUTS: u32 = 3;

/// Millisecond time base, advanced by SysTick
static TICKS: TickCounter = TickCounter::new();

#[exception]
fn SysTick() {
    TICKS.tick();
}

fn clock_config() -> Config {
    use embassy_stm32::rcc::*;

    let mut config = Config::default();
    config.rcc.hse = Some(Hse {
        freq: Hertz(8_000_000),
        mode: HseMode::Oscillator,
    });
    config.rcc.pll = Some(Pll {
        src: PllSource::HSE,
        prediv: PllPreDiv::DIV1,
        mul: PllMul::MUL9,
    });
    config.rcc.sys = Sysclk::PLL1_P;
    config.rcc.ahb_pre = AHBPrescaler::DIV1;
    config.rcc.apb1_pre = APBPrescaler::DIV2;
    config.rcc.apb2_pre = APBPrescaler::DIV1;
    config
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("BitLoom firmware starting...");

    let p = embassy_stm32::init(clock_config());

    // Status LED (PC13, lit when low)
    let mut led = StatusLed::new_active_low(LedPin::new(Output::new(
        p.PC13,
        Level::High,
        Speed::Low,
    )));

    // I2C1 on PB6=SCL, PB7=SDA. embassy muxes the pins and clocks the
    // peripheral; the BitLoom engine drives the registers from there.
    let _i2c_owner = I2c::new_blocking(p.I2C1, p.PB6, p.PB7, Default::default());
    let i2c_config = I2cConfig::default();
    let mut port = Stm32I2cPort::new(pac::I2C1);
    match port.configure_standard_mode(&i2c_config, PCLK1_HZ) {
        Ok(timing) => info!("I2C1 standard mode: {}", timing),
        Err(e) => error!("I2C1 configuration rejected: {:?}", e),
    }
    let bus: SharedI2c<NoopRawMutex, _> =
        SharedI2c::new(I2cMaster::new(port, &TICKS, i2c_config));

    let mut core = unwrap!(cortex_m::Peripherals::take());
    TICKS.reset();
    unwrap!(start_millisecond_tick(&mut core.SYST, HCLK_HZ));

    let mut blink = BlinkSchedule::new(BlinkConfig::default(), TICKS.now_ms());
    let mut last_read = TICKS.now_ms();
    let mut failures: u32 = 0;
    let mut timeouts: u32 = 0;

    info!("Main loop running");

    loop {
        let now = TICKS.now_ms();

        if let Some(action) = blink.poll(now) {
            led.apply(action);
        }

        if now.wrapping_sub(last_read) >= READ_PERIOD_MS {
            last_read = now;

            let mut block = [0u8; 4];
            let result =
                bus.with(|i2c| i2c.read_register(EEPROM_ADDRESS, EEPROM_REGISTER, &mut block));
            match result {
                Ok(()) => {
                    failures = 0;
                    timeouts = 0;
                    info!("EEPROM[{=u8:#x}..] = {:x}", EEPROM_REGISTER, block);
                }
                Err(BusError::I2c(I2cError::AddressNacked)) => {
                    debug!("No EEPROM at {=u8:#x}", EEPROM_ADDRESS);
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    warn!("EEPROM read failed ({} in a row): {:?}", failures, e);
                    if matches!(
                        e,
                        BusError::I2c(I2cError::BusBusyTimeout | I2cError::PollTimeout)
                    ) {
                        timeouts += 1;
                    }
                }
            }

            // A peripheral that keeps timing out is wedged: SWRST and
            // program the timing again
            if timeouts >= RESET_AFTER_TIMEOUTS {
                timeouts = 0;
                let recovered = bus.with(|i2c| {
                    let config = *i2c.config();
                    let port = i2c.port_mut();
                    port.reset();
                    port.configure_standard_mode(&config, PCLK1_HZ)
                });
                match recovered {
                    Ok(timing) => info!("I2C1 reset after repeated timeouts: {}", timing),
                    Err(e) => error!("I2C1 recovery failed: {:?}", e),
                }
            }
        }

        Timer::after_millis(1).await;
    }
}
