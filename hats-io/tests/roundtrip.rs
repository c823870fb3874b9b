#![allow(clippy::cast_possible_truncation)]
use hats_algorithms::{HatsConfig, HatsEngine, Polarity};
use hats_io::{infer_sensor_size, to_gray_image, EventFileReader, FrameFormat, FrameWriter};
use std::fmt::Write as _;
use tempfile::tempdir;

#[test]
fn test_events_file_to_frame() {
    let dir = tempdir().unwrap();
    let events_path = dir.path().join("events.txt");

    let mut content = String::from("# t x y p\n");
    for i in 0..400u32 {
        let x = (i * 7) % 32;
        let y = (i * 3) % 24;
        writeln!(content, "{} {} {} {}", i * 10, x, y, i % 2).unwrap();
    }
    std::fs::write(&events_path, content).unwrap();

    let reader = EventFileReader::open(&events_path).unwrap();
    let events = reader.read_all().unwrap();
    assert_eq!(events.len(), 400);

    let (width, height) = infer_sensor_size(&events).unwrap();
    let config = HatsConfig::new().with_cell_size(8).with_radius(2);
    let mut engine = HatsEngine::setup(width, height, config).unwrap();

    for batch in reader.batches(64) {
        engine.ingest(&batch.unwrap());
    }
    assert_eq!(engine.statistics().totals.processed, 400);

    let frame = engine.composite(Polarity::On).unwrap();
    let grid = (engine.lookup().grid_rows() * 5, engine.lookup().grid_cols() * 5);
    assert_eq!(frame.dim(), grid);

    let pgm_path = dir.path().join("frame.pgm");
    FrameWriter::create(&pgm_path)
        .unwrap()
        .write_frame(frame.view(), FrameFormat::from_path(&pgm_path))
        .unwrap();
    let decoded = image::open(&pgm_path).unwrap().to_luma8();
    assert_eq!(decoded.dimensions(), (grid.1 as u32, grid.0 as u32));
    assert_eq!(decoded.as_raw(), to_gray_image(frame.view()).unwrap().as_raw());

    let csv_path = dir.path().join("frame.csv");
    FrameWriter::create(&csv_path)
        .unwrap()
        .write_frame(frame.view(), FrameFormat::Csv)
        .unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), grid.0);
    assert!(csv.lines().all(|line| line.split(',').count() == grid.1));
}
