//! BLE GATT server for the telemetry stream
//!
//! One service with four read/notify characteristics carrying ASCII values. The connection loop
//! owns the link flag: it marks the peer connected on accept and disconnected on link loss, then
//! goes straight back to advertising.

use embassy_futures::select::select;
use embassy_time::{Duration, Timer};
use trouble_host::prelude::*;

use crate::config::DEVICE_NAME;
use crate::ipc::{ConnectionState, NotifyQueue};
use crate::telemetry::{ChannelKey, Payload, SERVICE_UUID_LE};

/// Telemetry service GATT definition
#[gatt_service(uuid = "4fafc201-1fb5-459e-8fcc-c5c9c331914b")]
pub struct TelemetryService {
    /// Front distance, base-10 ASCII
    #[descriptor(uuid = "2901", read, value = "Front")]
    #[characteristic(uuid = "beb5483e-36e1-4688-b7f5-ea07361b26a8", read, notify)]
    pub front: Payload,

    /// Left distance, base-10 ASCII
    #[descriptor(uuid = "2901", read, value = "Left")]
    #[characteristic(uuid = "1c95d5e5-0466-4aa8-b8d9-e31d0ebf8453", read, notify)]
    pub left: Payload,

    /// Right distance, base-10 ASCII
    #[descriptor(uuid = "2901", read, value = "Right")]
    #[characteristic(uuid = "aa2b5a6c-486a-4b68-b118-a61f5c6b6d3b", read, notify)]
    pub right: Payload,

    /// Angular rate `x,y,z` in °/s, two decimals each
    #[descriptor(uuid = "2901", read, value = "Gyro")]
    #[characteristic(uuid = "e9eaadd6-25f8-470c-b59e-4a608fced746", read, notify)]
    pub gyro: Payload,
}

/// GATT Server with the telemetry service
#[gatt_server(attribute_table_size = 32)]
pub struct TelemetryServer {
    pub telemetry: TelemetryService,
}

impl TelemetryServer<'_> {
    pub fn characteristic(&self, key: ChannelKey) -> &Characteristic<Payload> {
        match key {
            ChannelKey::Front => &self.telemetry.front,
            ChannelKey::Left => &self.telemetry.left,
            ChannelKey::Right => &self.telemetry.right,
            ChannelKey::Orientation => &self.telemetry.gyro,
        }
    }
}

/// Advertise until a peer connects and attach it to the GATT server.
async fn advertise<'d, 's, C: Controller>(
    peripheral: &mut Peripheral<'d, C, DefaultPacketPool>,
    server: &'s TelemetryServer<'_>,
) -> Result<GattConnection<'d, 's, DefaultPacketPool>, BleHostError<C::Error>> {
    let mut adv_data = [0u8; 31];
    let adv_len = AdStructure::encode_slice(
        &[
            AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
            AdStructure::ServiceUuids128(&[SERVICE_UUID_LE]),
        ],
        &mut adv_data[..],
    )?;

    // Name goes in the scan response, the 128-bit UUID fills most of the advertisement
    let mut scan_data = [0u8; 31];
    let scan_len = AdStructure::encode_slice(
        &[AdStructure::CompleteLocalName(DEVICE_NAME.as_bytes())],
        &mut scan_data[..],
    )?;

    let advertiser = peripheral
        .advertise(
            &Default::default(),
            Advertisement::ConnectableScannableUndirected {
                adv_data: &adv_data[..adv_len],
                scan_data: &scan_data[..scan_len],
            },
        )
        .await?;

    info!("Waiting for connection...");
    let conn = advertiser.accept().await?.with_attribute_server(server)?;
    Ok(conn)
}

/// Drain GATT events until the link drops.
async fn gatt_events(conn: &GattConnection<'_, '_, DefaultPacketPool>) {
    loop {
        if let GattConnectionEvent::Disconnected { reason } = conn.next().await {
            info!("GATT disconnected: {:?}", reason);
            break;
        }
    }
}

/// Set each queued value on its characteristic and notify the peer.
async fn forward_notifications(
    server: &TelemetryServer<'_>,
    conn: &GattConnection<'_, '_, DefaultPacketPool>,
    queue: &NotifyQueue,
) {
    loop {
        let notification = queue.receive().await;
        let characteristic = server.characteristic(notification.key);

        if characteristic.set(server, &notification.payload).is_err() {
            warn!("set on {:?} failed", notification.key);
        }
        if characteristic.notify(conn, &notification.payload).await.is_err() {
            warn!("notify on {:?} failed", notification.key);
            break;
        }
    }
}

/// Peripheral lifecycle: advertise, serve one peer, re-advertise on disconnect.
pub async fn run_peripheral<C: Controller>(
    mut peripheral: Peripheral<'_, C, DefaultPacketPool>,
    server: &TelemetryServer<'_>,
    link: &ConnectionState,
    queue: &NotifyQueue,
) -> ! {
    loop {
        info!("Starting BLE advertising...");

        let conn = match advertise(&mut peripheral, server).await {
            Ok(conn) => conn,
            Err(_e) => {
                warn!("Advertising error, retrying in 1s");
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };

        // Anything still queued predates this peer
        queue.clear();
        link.set_connected(true);
        info!("Client connected");

        select(gatt_events(&conn), forward_notifications(server, &conn, queue)).await;

        link.set_connected(false);
        info!("Client disconnected, re-advertising");
    }
}
