//! # ADC Sampling
//!
//! This module is responsible for sampling the ADC (Analog-to-Digital Converter) to
//! read the values from the thermistors. The raw ADC values are then converted to
//! temperatures and made available to other tasks, such as the heater control task.
//!
//! ## Sampling and Filtering
//!
//! The ADC is sampled periodically to get the latest thermistor readings. To reduce
//! noise and improve accuracy, a filter (such as a simple moving average) is applied
//! to the raw ADC values.
//!
//! ## Temperature Conversion
//!
//! The filtered ADC values are then converted to temperatures using a lookup table,
//! via [`driver_thermistor::NtcThermistor`]. The specific table depends on the
//! thermistor being used; the one below is for a generic 100k NTC.

use crate::fixed_point::Fixed16_16;
use crate::heater::HeaterSharedState;
use driver_thermistor::{ConversionMode, NtcThermistor};
use embassy_stm32::adc::{Adc, AnyAdcChannel};
use embassy_stm32::peripherals::ADC1;
use embassy_time::{Duration, Timer};

/// (ADC reading on a 12-bit ADC, temperature in degrees Celsius) for a
/// generic 100k NTC thermistor on a 4.7k pull-up, sorted by ADC reading.
const NTC_100K_TABLE: [(u16, f32); 7] = [
    (241, 200.0),
    (441, 150.0),
    (862, 100.0),
    (1775, 50.0),
    (2971, 0.0),
    (3629, -20.0),
    (3990, -40.0),
];

/// Exponential-moving-average smoothing factor applied to each new reading,
/// in sixteenths (`new = (new * FILTER_NUM + old * (16 - FILTER_NUM)) / 16`).
const FILTER_NUM: i32 = 4;

fn filtered_sample(previous: u16, raw: u16) -> u16 {
    let blended = (raw as i32 * FILTER_NUM + previous as i32 * (16 - FILTER_NUM)) / 16;
    blended.clamp(0, u16::MAX as i32) as u16
}

/// The ADC sampling task.
///
/// Periodically samples the extruder and bed thermistor channels, applies an
/// exponential moving average, converts the filtered reading to a
/// temperature, and publishes it into each heater's [`HeaterSharedState`].
#[embassy_executor::task]
pub async fn adc_task(
    mut adc: Adc<'static, ADC1>,
    mut extruder_channel: AnyAdcChannel<ADC1>,
    mut bed_channel: AnyAdcChannel<ADC1>,
    extruder_state: &'static HeaterSharedState,
    bed_state: &'static HeaterSharedState,
) {
    defmt::info!("ADC task started");

    let extruder_thermistor = NtcThermistor::new(ConversionMode::Table(&NTC_100K_TABLE));
    let bed_thermistor = NtcThermistor::new(ConversionMode::Table(&NTC_100K_TABLE));

    let mut extruder_filtered = adc.blocking_read(&mut extruder_channel);
    let mut bed_filtered = adc.blocking_read(&mut bed_channel);

    loop {
        extruder_filtered = filtered_sample(extruder_filtered, adc.blocking_read(&mut extruder_channel));
        bed_filtered = filtered_sample(bed_filtered, adc.blocking_read(&mut bed_channel));

        if let Some(temp) = extruder_thermistor.temperature(extruder_filtered) {
            *extruder_state.current_temp.lock().await = Fixed16_16::from_float(temp);
        } else {
            defmt::warn!("extruder thermistor reading {} out of table range", extruder_filtered);
        }

        if let Some(temp) = bed_thermistor.temperature(bed_filtered) {
            *bed_state.current_temp.lock().await = Fixed16_16::from_float(temp);
        } else {
            defmt::warn!("bed thermistor reading {} out of table range", bed_filtered);
        }

        Timer::after(Duration::from_millis(250)).await;
    }
}
