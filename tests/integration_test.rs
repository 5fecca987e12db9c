use conv_fixtures::fixture::{BiasLayout, FixtureConfig, Variant, DATA_FILE, OUTPUT_FILE};
use conv_fixtures::npy_reader::NpyReader;

#[test]
fn test_regenerating_is_bit_identical() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    for variant in [Variant::Plain, Variant::Filter, Variant::Biased] {
        let written = FixtureConfig::for_variant(variant).unwrap()
            .generate().unwrap()
            .write_to(first.path()).unwrap();
        FixtureConfig::for_variant(variant).unwrap()
            .generate().unwrap()
            .write_to(second.path()).unwrap();

        for path in written {
            let name = path.file_name().unwrap();
            let a = std::fs::read(first.path().join(name)).unwrap();
            let b = std::fs::read(second.path().join(name)).unwrap();
            assert_eq!(a, b, "{name:?} differs between runs");
        }
    }
}

#[test]
fn test_bias_file_holds_bias_not_filter() {
    let dir = tempfile::tempdir().unwrap();
    FixtureConfig::for_variant(Variant::Biased).unwrap()
        .generate().unwrap()
        .write_to(dir.path()).unwrap();

    let bias = NpyReader::open(dir.path().join("filter_bias.npy")).unwrap().read_array().unwrap();
    assert_eq!(bias.shape, vec![1]);
    assert_eq!(bias.values, vec![0.1]);
}

#[test]
fn test_scalar_bias_layout() {
    let dir = tempfile::tempdir().unwrap();
    FixtureConfig::for_variant(Variant::Biased).unwrap()
        .with_bias_layout(BiasLayout::Scalar)
        .generate().unwrap()
        .write_to(dir.path()).unwrap();

    let bias = NpyReader::open(dir.path().join("filter_bias.npy")).unwrap().read_array().unwrap();
    assert!(bias.shape.is_empty());
    assert_eq!(bias.values, vec![0.1]);
}

#[test]
fn test_files_read_back_as_written() {
    let dir = tempfile::tempdir().unwrap();
    let set = FixtureConfig::for_variant(Variant::Biased).unwrap().generate().unwrap();
    set.write_to(dir.path().join("nested").join("fixtures")).unwrap();

    let fixtures = dir.path().join("nested").join("fixtures");
    let data = NpyReader::open(fixtures.join(DATA_FILE)).unwrap().read_array().unwrap();
    let output = NpyReader::open(fixtures.join(OUTPUT_FILE)).unwrap().read_array().unwrap();

    assert_eq!(data.into_matrix().unwrap(), set.input);
    assert_eq!(output.into_matrix().unwrap(), set.output);
    set.verify_in(&fixtures).unwrap();
}

#[test]
fn test_verify_fails_on_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let set = FixtureConfig::for_variant(Variant::Filter).unwrap().generate().unwrap();

    assert!(set.verify_in(dir.path()).is_err());
}
