//! Encode a small recording and decode it back for validation testing

use chrono::Utc;
use trackpack::{
    Decoder, Event, EventType, GeoLocation, MeasurementIdentifier, MeasurementSerializer,
    MetaData, Modality, Point3d, FORMAT_VERSION,
};

fn main() {
    let events = vec![
        Event::lifecycle(1_000, EventType::LifecycleStart),
        Event::modality_change(1_200, Modality::Bicycle),
        Event::lifecycle(2_000, EventType::LifecyclePause),
        Event::lifecycle(3_000, EventType::LifecycleResume),
        Event::lifecycle(4_000, EventType::LifecycleStop),
    ];
    let locations: Vec<GeoLocation> = [
        (1_000, 51.012345, 13.712000),
        (1_500, 51.012400, 13.712080),
        (3_500, 51.012500, 13.712161),
        (4_000, 51.012610, 13.712235),
    ]
    .iter()
    .map(|&(ts, lat, lon)| GeoLocation::new(ts, lat, lon, 5.0, 8.5).unwrap())
    .collect();
    let accelerations: Vec<Point3d> = (0..20)
        .map(|i| Point3d::new(1_000 + i * 100, 9.81, -0.12, 0.055))
        .collect();

    let bytes = MeasurementSerializer::new()
        .encode_compressed(&events, &locations, &[accelerations], &[], &[])
        .expect("encode");
    println!("encoded {} bytes", bytes.len());

    let metadata = MetaData::new(
        MeasurementIdentifier::new("demo-device", 1),
        "Pixel 8",
        "Android 14",
        "3.2.1",
        128.0,
        "demo-user",
        FORMAT_VERSION,
        Utc::now(),
    )
    .expect("metadata");

    match Decoder::compressed().decode(metadata, bytes.as_slice()) {
        Ok(measurement) => {
            for (index, track) in measurement.tracks.iter().enumerate() {
                println!(
                    "track {index}: {} locations, {} accelerations, modality {:?}",
                    track.locations.len(),
                    track.accelerations.len(),
                    track.locations.first().map(|l| l.modality),
                );
            }
        }
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
