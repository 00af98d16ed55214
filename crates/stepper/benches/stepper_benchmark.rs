use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hal_traits::{AtomicGpioPort, InputPin, Timer};
use stepper::{AxisDriver, Command, CommandQueue};

struct NullPort;
impl AtomicGpioPort for NullPort {
    fn set_and_clear_atomic(&mut self, _set_mask: u8, _clear_mask: u8) {}
    fn write(&mut self, _mask: u8) {}
}

struct NullTimer;
impl Timer for NullTimer {
    fn schedule_next(&mut self, _ticks: u32) {}
    fn trigger_now(&mut self) {}
    fn stop(&mut self) {}
}

struct NeverTriggered;
impl InputPin for NeverTriggered {
    fn is_triggered(&self) -> bool {
        false
    }
}

static mut BENCH_QUEUE: CommandQueue = CommandQueue::new();

fn benchmark_isr_step(c: &mut Criterion) {
    #[allow(static_mut_refs)]
    let (mut producer, consumer) = unsafe { BENCH_QUEUE.split() };
    for _ in 0..30 {
        producer
            .enqueue(Command::new(true, 1_000_000, 4000, 0, 2_000_000))
            .ok();
    }

    let mut driver = AxisDriver::new(consumer, 100);
    let mut step_port = NullPort;
    let mut dir_port = NullPort;
    let mut timer = NullTimer;
    let endstop = NeverTriggered;
    driver.start(&mut dir_port, &mut timer, 0);

    c.bench_function("axis_driver_on_timer_interrupt", |b| {
        b.iter(|| {
            black_box(driver.on_timer_interrupt(&mut step_port, &mut dir_port, &mut timer, &endstop, 0));
        })
    });
}

criterion_group!(benches, benchmark_isr_step);
criterion_main!(benches);
