// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the orientation mapper

use prescreen_capture::pipeline::orientation::map;
use prescreen_capture::pipeline::{OrientationCell, OrientationReading, VideoOrientation};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[test]
fn test_directional_readings_ignore_previous() {
    let table = [
        (OrientationReading::Portrait, VideoOrientation::Portrait),
        (
            OrientationReading::PortraitUpsideDown,
            VideoOrientation::PortraitUpsideDown,
        ),
        (OrientationReading::LandscapeLeft, VideoOrientation::LandscapeRight),
        (OrientationReading::LandscapeRight, VideoOrientation::LandscapeLeft),
    ];

    for (reading, expected) in table {
        for previous in VideoOrientation::ALL {
            assert_eq!(
                map(reading, previous),
                expected,
                "{:?} with previous {:?}",
                reading,
                previous
            );
        }
    }
}

#[test]
fn test_flat_and_unknown_readings_keep_previous() {
    for reading in [
        OrientationReading::FaceUp,
        OrientationReading::FaceDown,
        OrientationReading::Unknown,
    ] {
        for previous in VideoOrientation::ALL {
            assert_eq!(map(reading, previous), previous);
        }
    }
}

#[test]
fn test_every_reading_maps_to_a_video_orientation() {
    for reading in OrientationReading::ALL {
        let mapped = map(reading, VideoOrientation::PortraitUpsideDown);
        assert!(VideoOrientation::ALL.contains(&mapped));
    }
}

#[test]
fn test_landscape_right_then_face_down() {
    let first = map(OrientationReading::LandscapeRight, VideoOrientation::Portrait);
    assert_eq!(first, VideoOrientation::LandscapeLeft);

    let second = map(OrientationReading::FaceDown, first);
    assert_eq!(second, VideoOrientation::LandscapeLeft);
}

#[test]
fn test_cell_follows_reading_sequence() {
    let cell = OrientationCell::default();
    let readings = [
        (OrientationReading::LandscapeRight, VideoOrientation::LandscapeLeft),
        (OrientationReading::FaceDown, VideoOrientation::LandscapeLeft),
        (OrientationReading::Unknown, VideoOrientation::LandscapeLeft),
        (OrientationReading::PortraitUpsideDown, VideoOrientation::PortraitUpsideDown),
        (OrientationReading::FaceUp, VideoOrientation::PortraitUpsideDown),
    ];

    for (reading, expected) in readings {
        assert_eq!(cell.apply(reading), expected);
        assert_eq!(cell.load(), expected);
    }
}

#[test]
fn test_cell_reads_are_never_torn() {
    let cell = OrientationCell::default();
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let cell = cell.clone();
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut reads = 0u64;
            while !done.load(Ordering::SeqCst) {
                assert!(VideoOrientation::ALL.contains(&cell.load()));
                reads += 1;
            }
            reads
        })
    };

    for _ in 0..10_000 {
        for reading in OrientationReading::ALL {
            cell.apply(reading);
        }
    }
    done.store(true, Ordering::SeqCst);

    assert!(reader.join().unwrap() > 0);
    // Last directional reading in ALL is LandscapeRight
    assert_eq!(cell.load(), VideoOrientation::LandscapeLeft);
}

#[test]
fn test_sensor_proxy_values() {
    let cases = [
        ("normal", OrientationReading::Portrait),
        ("bottom-up", OrientationReading::PortraitUpsideDown),
        ("right-up", OrientationReading::LandscapeLeft),
        ("left-up", OrientationReading::LandscapeRight),
        ("undefined", OrientationReading::Unknown),
        ("", OrientationReading::Unknown),
    ];
    for (value, expected) in cases {
        assert_eq!(OrientationReading::from_sensor_proxy(value), expected);
    }
}
