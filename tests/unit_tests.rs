use rangeread::{CatOpts, LinesOpts, ReaderOpts};
use rangeread_file::{FileSource, LocalRangeSource};
use tempfile::TempDir;

const TEST_CSV_DATA: &str = "id,name,age,active
1,Alice,30,true
2,Bob,25,false
3,Charlie,35,true";

fn write_csv(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("users.csv");
    std::fs::write(&path, TEST_CSV_DATA).unwrap();
    path
}

#[test]
fn test_reader_opts_into_options() {
    let opts = ReaderOpts {
        line_buffer_size: 25,
    };
    let options: range_reader::ReaderOptions = (&opts).into();
    assert_eq!(options.line_buffer_size, 25);
}

#[test]
fn test_cat_local_file() {
    let temp_dir = TempDir::new().unwrap();
    let source = LocalRangeSource::open(write_csv(&temp_dir)).unwrap();

    let opts = CatOpts {
        offset: 19,
        length: Some(15),
    };
    let reader_opts = ReaderOpts {
        line_buffer_size: 8,
    };
    let mut out = Vec::new();
    rangeread::cat(source, &opts, &reader_opts, &mut out).unwrap();

    assert_eq!(out, b"1,Alice,30,true");
}

#[test]
fn test_cat_past_end_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let source = LocalRangeSource::open(write_csv(&temp_dir)).unwrap();

    let opts = CatOpts {
        offset: 10_000,
        length: None,
    };
    let reader_opts = ReaderOpts {
        line_buffer_size: 8,
    };
    let mut out = Vec::new();
    assert_eq!(rangeread::cat(source, &opts, &reader_opts, &mut out).unwrap(), 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_lines_local_file_via_file_source() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_csv(&temp_dir);

    let source = FileSource::parse(path.to_str().unwrap())
        .unwrap()
        .open_range_source()
        .await
        .unwrap();

    let opts = LinesOpts {
        separator: "\n".to_string(),
        limit: None,
        offset: 0,
    };
    let reader_opts = ReaderOpts {
        line_buffer_size: 5,
    };
    let mut out = Vec::new();
    let count = rangeread::lines(source, &opts, &reader_opts, &mut out).unwrap();

    assert_eq!(count, 4);
    assert_eq!(out, TEST_CSV_DATA.as_bytes());
}

#[test]
fn test_lines_from_offset() {
    let temp_dir = TempDir::new().unwrap();
    let source = LocalRangeSource::open(write_csv(&temp_dir)).unwrap();

    let opts = LinesOpts {
        separator: "\n".to_string(),
        limit: Some(1),
        offset: 35,
    };
    let reader_opts = ReaderOpts {
        line_buffer_size: 1024,
    };
    let mut out = Vec::new();
    rangeread::lines(source, &opts, &reader_opts, &mut out).unwrap();

    assert_eq!(out, b"2,Bob,25,false\n");
}

#[test]
fn test_stat_local_file() {
    let temp_dir = TempDir::new().unwrap();
    let source = LocalRangeSource::open(write_csv(&temp_dir)).unwrap();

    let mut out = Vec::new();
    rangeread::stat(source, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains(&format!("size: {}", TEST_CSV_DATA.len())));
    assert!(text.contains("empty: false"));
}
