//! Common test fixtures for the ingest pipeline.

use storage::{Device, Instrument, MemoryBackend, Station, StationInstrument, Store};

/// Station code used by the default snapshot.
pub const STATION: &str = "lwl";

/// Device name used by the default snapshot.
pub const DEVICE: &str = "cam1";

/// Instrument paired with [`STATION`] in [`seeded_store`].
pub const INSTRUMENT: &str = "greenline";

/// 2021-08-13T04:44:00Z
pub const START_TIME: i32 = 1_628_829_840;

/// Routing attributes of a typical delivery.
pub mod routing {
    pub const NEWSGROUP: &str = "transport.mango.station.lwl.outbound.greenline";
    pub const XREF: &str = "news.example.org transport.mango.station.lwl.outbound.greenline:17";
    pub const DATE: &str = "Fri, 13 Aug 2021 04:45:00 +0000";
}

/// In-memory store holding `lwl`, `cam1`, `greenline` and the
/// `lwl`/`greenline` pairing, all with id 1.
pub async fn seeded_store() -> (Store, MemoryBackend) {
    let (store, backend) = Store::memory();

    let station = store
        .lookup_or_create(&Station::new(STATION).with_label("Low Wind Lake"), &["name"])
        .await
        .expect("seed station");
    let instrument = store
        .lookup_or_create(&Instrument::new(INSTRUMENT), &["name"])
        .await
        .expect("seed instrument");
    store
        .lookup_or_create(&Device::new(DEVICE), &["name"])
        .await
        .expect("seed device");

    let (Some(station_id), Some(instrument_id)) = (station.id, instrument.id) else {
        panic!("seeded rows have no id");
    };
    store
        .lookup_or_create(
            &StationInstrument::new(station_id, instrument_id),
            &["station_id", "instrument_id"],
        )
        .await
        .expect("seed pairing");

    (store, backend)
}
