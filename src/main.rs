#![no_std]
#![no_main]

use bt_hci::controller::ExternalController;
use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use esp_hal::delay::Delay;
use esp_hal::interrupt::software::SoftwareInterruptControl;
use esp_hal::system::Stack;
use esp_hal::timer::timg::TimerGroup;
use esp_radio::ble::controller::BleConnector;
use esp_rtos::embassy::Executor;
use panic_rtt_target as _;
use static_cell::StaticCell;
use trouble_host::prelude::*;

use helmet_telemetry::{
    ble::{run_peripheral, TelemetryServer},
    board::SerialSink,
    config::DEVICE_NAME,
    drivers::{gyro::create_default_gyro, EmbassyClock},
    ipc::{CONNECTION, NOTIFIER, NOTIFY_CH},
    tasks::{orientation_task, range_task, OrientationSampler, RangeSampler},
    Board,
};

extern crate alloc;

const CONNECTIONS_MAX: usize = 1;
const L2CAP_CHANNELS_MAX: usize = 2;
const APP_CORE_STACK_SIZE: usize = 8192;

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_defmt!();
    info!("Starting helmet telemetry broadcaster");

    let board = match Board::init() {
        Ok(board) => board,
        Err(e) => defmt::panic!("Board init failed: {:?}", e),
    };

    // esp-radio needs a heap
    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(board.timg0);
    let sw_int = SoftwareInterruptControl::new(board.sw_interrupt);
    esp_rtos::start(timg0.timer0);
    info!("Embassy initialized!");

    // Wake the gyro before either sampler starts
    let gyro = match create_default_gyro(board.i2c0, &mut embassy_time::Delay).await {
        Ok(gyro) => {
            info!("MPU-6050 awake");
            Some(gyro)
        }
        Err(e) => {
            error!("Gyro initialization failed: {:?}", e);
            None
        }
    };

    // Ranging masks interrupts for up to one echo timeout per sensor, so it gets the app core
    // to itself. The radio, the time driver and the async I²C interrupt stay on this core.
    let range = RangeSampler::new(
        board.range_sensors,
        Delay::new(),
        embassy_time::Delay,
        EmbassyClock,
        &CONNECTION,
        &NOTIFIER,
    );
    static APP_CORE_STACK: StaticCell<Stack<APP_CORE_STACK_SIZE>> = StaticCell::new();
    let app_core_stack = APP_CORE_STACK.init(Stack::new());
    esp_rtos::start_second_core(
        board.cpu_ctrl,
        sw_int.software_interrupt0,
        sw_int.software_interrupt1,
        app_core_stack,
        move || {
            static APP_EXECUTOR: StaticCell<Executor> = StaticCell::new();
            let executor = APP_EXECUTOR.init(Executor::new());
            executor.run(|spawner| {
                spawner.spawn(unwrap!(range_task(range)));
                info!("Range task spawned on app core");
            })
        },
    );

    // The async I²C driver is bound to this core's interrupt, so the gyro stays here
    if let Some(gyro) = gyro {
        let orientation =
            OrientationSampler::new(gyro, embassy_time::Delay, SerialSink, &CONNECTION, &NOTIFIER);
        spawner.spawn(unwrap!(orientation_task(orientation)));
        info!("Orientation task spawned");
    }

    // BLE stack
    let radio_init = esp_radio::init().expect("Failed to initialize BLE controller");
    let transport = BleConnector::new(&radio_init, board.bt, Default::default())
        .expect("Failed to create BLE transport");
    let ble_controller = ExternalController::<_, 1>::new(transport);

    static HOST_RESOURCES: StaticCell<
        HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX>,
    > = StaticCell::new();
    let host_resources = HOST_RESOURCES.init(HostResources::new());

    let stack = trouble_host::new(ble_controller, host_resources);
    let Host {
        peripheral,
        mut runner,
        ..
    } = stack.build();

    static SERVER: StaticCell<TelemetryServer<'static>> = StaticCell::new();
    let server = SERVER.init(
        TelemetryServer::new_with_config(GapConfig::Peripheral(PeripheralConfig {
            name: DEVICE_NAME,
            appearance: &appearance::sensor::GENERIC_SENSOR,
        }))
        .expect("Failed to create GATT server"),
    );
    info!("Bluetooth ready");

    let runner_task = async {
        let _ = runner.run().await;
    };
    let ble_task = run_peripheral(peripheral, server, &CONNECTION, &NOTIFY_CH);

    match select(runner_task, ble_task).await {
        Either::First(()) => defmt::panic!("BLE runner stopped"),
        Either::Second(never) => never,
    }
}
