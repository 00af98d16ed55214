//! # Embassy Main
//!
//! This is the main entry point for the firmware when using the Embassy executor.
//! It initializes the hardware, spawns all the concurrent tasks, and then lets the
//! executor take over.

use aprinter_mcu_firmware::boards::stm32f407::pins::BoardPins;
use aprinter_mcu_firmware::heater::HeaterSharedState;
use aprinter_mcu_firmware::safety::{SafetyMonitor, ThermalMonitor};
use aprinter_mcu_firmware::wire::MAX_AXES;
use aprinter_mcu_firmware::{adc, heater, proto_bridge, stepper};
use embassy_executor::Spawner;
use embassy_stm32::adc::Adc;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_stm32::timer::Channel;
use embassy_stm32::usart::{Config as UartConfig, Uart};
use embassy_stm32::wdg::IndependentWatchdog;
use embassy_stm32::{bind_interrupts, peripherals, usart, Config};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use stepper::CommandQueue;

bind_interrupts!(struct Irqs {
    USART1 => usart::InterruptHandler<peripherals::USART1>;
});

/// Heater-update loop frequency.
const HEATER_UPDATE_HZ: u32 = 10;
/// If a stepper ISR fires more than this many microsecond ticks late, it is
/// reported as [`stepper::StepOutcome::Overload`].
const OVERLOAD_THRESHOLD_TICKS: u32 = 1_000;

static EXTRUDER_STATE: HeaterSharedState = HeaterSharedState::new();
static BED_STATE: HeaterSharedState = HeaterSharedState::new();
static SAFETY: Mutex<CriticalSectionRawMutex, Option<SafetyMonitor<'static, 2>>> = Mutex::new(None);

static mut X_QUEUE: CommandQueue = CommandQueue::new();
static mut Y_QUEUE: CommandQueue = CommandQueue::new();

/// The main asynchronous function that sets up and runs the firmware.
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("Initializing MCU firmware...");

    // Board-specific configuration and initialization.
    let mut config = Config::default();
    // Configure clocks here if needed, e.g., for high-speed stepping.
    // config.rcc.hse = Some(embassy_stm32::rcc::Hse { ... });
    let p = embassy_stm32::init(config);
    let board_pins = BoardPins::new(p);

    let thermal_monitors = [
        ThermalMonitor::new(5.0, -50.0, 300.0, 25.0),
        ThermalMonitor::new(5.0, -50.0, 300.0, 25.0),
    ];
    let watchdog = IndependentWatchdog::new(board_pins.usart1_watchdog_placeholder_unused());
    *SAFETY.lock().await = Some(SafetyMonitor::new(thermal_monitors, watchdog));

    // Stepper queues: one producer (protocol bridge), one consumer (axis task) each.
    #[allow(static_mut_refs)]
    let (x_producer, x_consumer) = unsafe { X_QUEUE.split() };
    #[allow(static_mut_refs)]
    let (y_producer, y_consumer) = unsafe { Y_QUEUE.split() };

    let mut axis_producers: [Option<stepper::CommandProducer>; MAX_AXES] = [None, None, None, None];
    axis_producers[0] = Some(x_producer);
    axis_producers[1] = Some(y_producer);

    let uart_config = UartConfig::default();
    let uart = Uart::new(
        board_pins.usart1,
        board_pins.uart_rx,
        board_pins.uart_tx,
        Irqs,
        embassy_stm32::dma::NoDma,
        embassy_stm32::dma::NoDma,
        uart_config,
    )
    .unwrap();
    let (_uart_tx, uart_rx) = uart.split();

    let adc = Adc::new(board_pins.adc1);

    let x_step = Output::new(board_pins.stepper_x_step, Level::Low, Speed::VeryHigh);
    let x_dir = Output::new(board_pins.stepper_x_dir, Level::Low, Speed::VeryHigh);
    let x_endstop = Input::new(board_pins.endstop_x_min, Pull::Down);
    let y_step = Output::new(board_pins.stepper_y_step, Level::Low, Speed::VeryHigh);
    let y_dir = Output::new(board_pins.stepper_y_dir, Level::Low, Speed::VeryHigh);
    let y_endstop = Input::new(board_pins.endstop_y_min, Pull::Down);

    let extruder_pwm_pin = PwmPin::new_ch1(board_pins.heater_extruder, embassy_stm32::gpio::OutputType::PushPull);
    let extruder_pwm = SimplePwm::new(
        board_pins.heater_pwm_timer_extruder_placeholder_unused(),
        Some(extruder_pwm_pin),
        None,
        None,
        None,
        Hertz(1),
        Default::default(),
    );

    // Spawn all the concurrent tasks. The spawner runs these in the background.
    spawner
        .spawn(proto_bridge::proto_task(uart_rx, axis_producers, &EXTRUDER_STATE, &BED_STATE))
        .unwrap();
    spawner
        .spawn(stepper::stepper_task("X", x_consumer, x_step, x_dir, x_endstop, OVERLOAD_THRESHOLD_TICKS))
        .unwrap();
    spawner
        .spawn(stepper::stepper_task("Y", y_consumer, y_step, y_dir, y_endstop, OVERLOAD_THRESHOLD_TICKS))
        .unwrap();
    spawner.spawn(heater::heater_task(0, extruder_pwm, Channel::Ch1, &EXTRUDER_STATE, safety_ref(), HEATER_UPDATE_HZ)).unwrap();
    spawner.spawn(led_task(board_pins.led)).unwrap();

    defmt::info!("Initialization complete. All tasks are running.");
}

fn safety_ref() -> &'static Mutex<CriticalSectionRawMutex, Option<SafetyMonitor<'static, 2>>> {
    &SAFETY
}

/// A simple task to blink the LED, indicating that the firmware is running.
#[embassy_executor::task]
async fn led_task(led_pin: embassy_stm32::gpio::AnyPin) {
    use embassy_stm32::gpio::{Level, Output, Speed};
    use embassy_time::{Duration, Timer};
    let mut led = Output::new(led_pin, Level::High, Speed::Low);

    loop {
        led.toggle();
        Timer::after(Duration::from_millis(500)).await;
    }
}
