//! Pin mappings for the MKS SKIPR board.
//! This is a starting point and may need to be adjusted based on your specific setup.

use embassy_stm32::adc::AnyAdcChannel;
use embassy_stm32::gpio::{AnyPin, Pin};
use embassy_stm32::peripherals::{ADC1, IWDG, TIM3, USART1};

/// Struct to hold all the board peripherals this firmware drives.
///
/// `BoardPins::new` consumes the whole `Peripherals` struct, so every
/// peripheral the application needs -- pins as well as the ADC and UART
/// blocks -- has to be pulled out here. Reaching back into `p` after this
/// call would not compile; add the field here instead.
pub struct BoardPins {
    pub led: AnyPin,
    pub stepper_x_step: AnyPin,
    pub stepper_x_dir: AnyPin,
    pub stepper_y_step: AnyPin,
    pub stepper_y_dir: AnyPin,
    pub endstop_x_min: AnyPin,
    pub endstop_y_min: AnyPin,
    pub temp_extruder: AnyAdcChannel<ADC1>,
    pub temp_bed: AnyAdcChannel<ADC1>,
    pub heater_extruder: AnyPin,
    pub heater_bed: AnyPin,
    pub uart_tx: AnyPin,
    pub uart_rx: AnyPin,
    pub usart1: USART1,
    pub adc1: ADC1,
}

impl BoardPins {
    /// Creates a new BoardPins struct for the MKS SKIPR.
    pub fn new(p: embassy_stm32::Peripherals) -> Self {
        use embassy_stm32::gpio::Pin as _;

        // Note: These are example pins. You will need to verify them against the MKS SKIPR schematic.
        Self {
            led: p.PB1.degrade(),
            stepper_x_step: p.PE2.degrade(),
            stepper_x_dir: p.PB8.degrade(),
            stepper_y_step: p.PC5.degrade(),
            stepper_y_dir: p.PB2.degrade(),
            endstop_x_min: p.PB10.degrade(),
            endstop_y_min: p.PE5.degrade(),
            temp_extruder: p.PA0.degrade_adc(),
            temp_bed: p.PA1.degrade_adc(),
            heater_extruder: p.PC8.degrade(),
            heater_bed: p.PC9.degrade(),
            uart_tx: p.PA9.degrade(),
            uart_rx: p.PA10.degrade(),
            usart1: p.USART1,
            adc1: p.ADC1,
        }
    }
}
