use std::{collections::HashMap, error::Error};

use telemeter::schema::{Channel, ChannelError, Layout, LayoutError, SchemaError, Sensor};

fn entry(pairs: Vec<(&str, &str)>) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value.to_owned()))
        .collect()
}

fn sections(channels: Vec<(&str, Vec<(&str, &str)>)>) -> Vec<(String, HashMap<String, String>)> {
    channels
        .into_iter()
        .map(|(name, pairs)| (name.to_owned(), entry(pairs)))
        .collect()
}

#[test]
fn type_string_round_trips_every_legal_layout() {
    for storage in [8u32, 16, 32, 64] {
        for size in 1..=storage {
            for shift in 0..=(storage - size) {
                for (endian, big_endian) in [("le", false), ("be", true)] {
                    for (sign, signed) in [("u", false), ("s", true)] {
                        let repr = format!("{endian}:{sign}{size}/{storage}>>{shift}");
                        let layout: Layout = repr.parse().unwrap();

                        assert_eq!(layout.storage.bits(), storage, "{repr}");
                        assert_eq!(layout.size, size, "{repr}");
                        assert_eq!(layout.shift, shift, "{repr}");
                        assert_eq!(layout.signed, signed, "{repr}");
                        assert_eq!(layout.big_endian, big_endian, "{repr}");
                    }
                }
            }
        }
    }
}

#[test]
fn excessive_shift_is_rejected_with_the_overflow_amount() {
    assert_eq!(
        "le:u12/16>>5".parse::<Layout>(),
        Err(LayoutError::ShiftedOut(1))
    );
    assert_eq!(
        "be:s8/8>>8".parse::<Layout>(),
        Err(LayoutError::ShiftedOut(8))
    );
}

#[test]
fn unsupported_storage_is_rejected() {
    assert_eq!(
        "le:u12/24>>0".parse::<Layout>(),
        Err(LayoutError::UnsupportedStorage(24))
    );
    assert_eq!(
        "le:u12/128>>0".parse::<Layout>(),
        Err(LayoutError::UnsupportedStorage(128))
    );
}

#[test]
fn zero_storage_is_rejected() {
    assert_eq!("le:u0/0>>0".parse::<Layout>(), Err(LayoutError::ZeroStorage));
}

#[test]
fn oversized_sample_is_rejected() {
    assert_eq!(
        "le:u17/16>>0".parse::<Layout>(),
        Err(LayoutError::SampleTooLarge {
            size: 17,
            storage: 16
        })
    );
}

#[test]
fn malformed_type_strings_are_rejected() {
    let malformed = [
        "",
        "le:u12/16",
        "u12/16>>0",
        "le:x12/16>>0",
        "me:u12/16>>0",
        "le:u12>>0",
        "le:u12/16>>0 ",
        " le:u12/16>>0",
        "le:u-12/16>>0",
        "le:u12/16>>0\nle:u12/16>>0",
    ];

    for repr in malformed {
        assert!(
            matches!(repr.parse::<Layout>(), Err(LayoutError::Grammar(_))),
            "accepted {repr:?}"
        );
    }
}

#[test]
fn missing_index_is_rejected() {
    let error = Channel::from_entry("accel_x", &entry(vec![("type", "le:u12/16>>0")])).unwrap_err();

    assert!(matches!(error, ChannelError::MissingIndex(ref name) if name == "accel_x"));
    assert_eq!(error.to_string(), "Missing index for channel accel_x.");
}

#[test]
fn channel_failures_carry_the_channel_name_and_cause() {
    let error = Channel::from_entry(
        "accel_x",
        &entry(vec![("index", "0"), ("type", "le:u12/24>>0")]),
    )
    .unwrap_err();

    assert_eq!(error.to_string(), "Failed to parse channel accel_x.");
    let cause = error.source().unwrap().to_string();
    assert!(cause.contains("Unsupported storage size"), "{cause}");
}

#[test]
fn non_numeric_calibration_is_rejected() {
    for key in ["offset", "scale"] {
        let error = Channel::from_entry(
            "temp",
            &entry(vec![("index", "0"), ("type", "le:u8/8>>0"), (key, "warm")]),
        )
        .unwrap_err();

        assert_eq!(error.to_string(), "Failed to parse channel temp.");
        let cause = error.source().unwrap().to_string();
        assert!(cause.contains(key), "{cause}");
    }
}

#[test]
fn non_numeric_index_is_rejected() {
    let error = Channel::from_entry(
        "temp",
        &entry(vec![("index", "first"), ("type", "le:u8/8>>0")]),
    )
    .unwrap_err();

    assert!(matches!(error, ChannelError::Parse { .. }));
    assert!(error.source().unwrap().to_string().contains("first"));
}

#[test]
fn channels_sort_into_row_order() {
    let sensor = Sensor::from_sections(
        "imu",
        sections(vec![
            ("gyro", vec![("index", "1"), ("type", "be:s16/16>>0")]),
            ("accel", vec![("index", "0"), ("type", "le:u12/16>>4")]),
            ("count", vec![("index", "2"), ("type", "le:u8/8>>0")]),
        ]),
    )
    .unwrap();

    let names: Vec<_> = sensor.channels().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["accel", "gyro", "count"]);
    assert_eq!(sensor.row_length(), 5);
    assert_eq!(sensor.name(), "imu");
}

#[test]
fn schema_failures_carry_the_sensor_identity() {
    let error = Sensor::from_sections(
        "imu",
        sections(vec![("accel", vec![("index", "0"), ("type", "le:u0/0>>0")])]),
    )
    .unwrap_err();

    assert_eq!(error.to_string(), "imu: failed to parse sensor metadata.");
    let cause = error.source().unwrap();
    assert_eq!(cause.to_string(), "Failed to parse channel accel.");
    assert_eq!(cause.source().unwrap().to_string(), "Storage size is zero.");
}

#[test]
fn duplicate_indices_are_rejected() {
    let error = Sensor::from_sections(
        "imu",
        sections(vec![
            ("accel", vec![("index", "0"), ("type", "le:u8/8>>0")]),
            ("gyro", vec![("index", "0"), ("type", "le:u8/8>>0")]),
        ]),
    )
    .unwrap_err();

    assert!(
        matches!(error, SchemaError::DuplicateIndex { index: 0, .. }),
        "{error}"
    );
}

#[test]
fn sparse_indices_are_rejected() {
    let error = Sensor::from_sections(
        "imu",
        sections(vec![
            ("accel", vec![("index", "0"), ("type", "le:u8/8>>0")]),
            ("gyro", vec![("index", "2"), ("type", "le:u8/8>>0")]),
        ]),
    )
    .unwrap_err();

    assert!(
        matches!(error, SchemaError::SparseIndices { count: 2, .. }),
        "{error}"
    );
}

#[test]
fn schema_loads_from_an_ini_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu.ini");
    std::fs::write(
        &path,
        "[accel_x]\n\
         index = 0\n\
         type = le:s12/16>>4\n\
         scale = 0.25\n\
         \n\
         [temp]\n\
         index = 1\n\
         type = be:u16/16>>0\n\
         offset = -100\n",
    )
    .unwrap();

    let sensor = Sensor::from_ini_path(&path).unwrap();

    assert_eq!(sensor.name(), "imu");
    assert_eq!(sensor.row_length(), 4);

    let names: Vec<_> = sensor.channels().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["accel_x", "temp"]);

    let accel = &sensor.channels()[0];
    assert_eq!(accel.layout().size, 12);
    assert_eq!(accel.layout().shift, 4);
    assert!(accel.layout().signed);
    assert!(!accel.layout().big_endian);
}

#[test]
fn missing_schema_document_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let error = Sensor::from_ini_path(dir.path().join("absent.ini")).unwrap_err();

    assert!(matches!(error, SchemaError::Document(_)), "{error}");
}
