//! CelebA metadata, partitions and target assembly against on-disk fixtures.

use std::collections::HashSet;

use cgan_rs::cgan::data::{celeba, CelebADataset, ImageTransform, LabeledImageDataset, TargetType};
use cgan_rs::test_utils::{write_celeba_fixture, CelebaRow};
use cgan_rs::CganError;
use rand::{rngs::StdRng, SeedableRng};
use tempfile::TempDir;

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let partitions = [0, 0, 1, 1, 2, 0, 2];
    let rows: Vec<CelebaRow> = partitions
        .iter()
        .enumerate()
        .map(|(i, &p)| CelebaRow::with_attr(i, p, i % celeba::NUM_ATTRIBUTES))
        .collect();
    write_celeba_fixture(dir.path(), &rows, (70, 86)).unwrap();
    dir
}

#[test]
fn test_partitions_are_disjoint_and_cover_all() {
    let dir = fixture();
    let mut seen = HashSet::new();
    let mut total = 0;
    for split in ["train", "valid", "test"] {
        let ds = CelebADataset::new(dir.path(), split, &["attr"], None, None).unwrap();
        for name in ds.filenames() {
            assert!(seen.insert(name.clone()), "{} appears in two partitions", name);
        }
        total += ds.len();
    }

    let all = CelebADataset::new(dir.path(), "all", &["attr"], None, None).unwrap();
    assert_eq!(total, all.len());
    assert_eq!(all.len(), 7);
    let all_names: HashSet<String> = all.filenames().iter().cloned().collect();
    assert_eq!(seen, all_names);

    let train = CelebADataset::new(dir.path(), "Train", &["attr"], None, None).unwrap();
    assert_eq!(train.len(), 3);
}

#[test]
fn test_attribute_conditions_are_binary() {
    let dir = fixture();
    let ds = CelebADataset::new(dir.path(), "all", &["attr"], None, None).unwrap();
    assert_eq!(ds.num_classes(), 40);
    assert_eq!(ds.attr_names().len(), 40);

    let mut rng = StdRng::seed_from_u64(0);
    for i in 0..ds.len() {
        let sample = ds.get(i, &mut rng).unwrap();
        assert_eq!(sample.condition.len(), 40);
        assert!(sample.condition.iter().all(|&v| v == 0.0 || v == 1.0));
        assert_eq!(sample.condition.iter().sum::<f32>(), 1.0);
        assert_eq!(sample.condition[i % 40], 1.0);
    }
}

#[test]
fn test_targets_follow_request_order() {
    let dir = fixture();
    let ds = CelebADataset::new(dir.path(), "all", &["bbox", "attr", "landmarks"], None, None).unwrap();
    let target = ds.target(2).unwrap();
    let kinds: Vec<TargetType> = target.parts.iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![TargetType::BBox, TargetType::Attr, TargetType::Landmarks]);
    assert_eq!(target.parts[0].values, vec![2.0, 3.0, 10.0, 12.0]);
    assert_eq!(target.parts[2].values.len(), 10);
    assert_eq!(target.flatten().len(), 4 + 40 + 10);
}

#[test]
fn test_empty_target_list_yields_no_target() {
    let dir = fixture();
    let ds = CelebADataset::new(dir.path(), "all", &[], None, None).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let (_, target) = ds.get_item(0, &mut rng).unwrap();
    assert!(target.is_none());
}

#[test]
fn test_target_transform_is_applied() {
    let dir = fixture();
    let transform: cgan_rs::cgan::data::TargetTransform = Box::new(|mut t| {
        t.parts.truncate(1);
        t
    });
    let ds = CelebADataset::new(dir.path(), "all", &["attr", "bbox"], None, Some(transform)).unwrap();
    assert_eq!(ds.target(0).unwrap().parts.len(), 1);
}

#[test]
fn test_images_are_resized_and_normalised() {
    let dir = fixture();
    let ds = CelebADataset::new(
        dir.path(),
        "train",
        &["attr"],
        Some(ImageTransform::celeba(64)),
        None,
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(1);
    let sample = ds.get(0, &mut rng).unwrap();
    assert_eq!(sample.image.shape(), [3, 64, 64]);
    assert!(sample.image.pixels.iter().all(|&v| (-1.0..=1.0).contains(&v)));
}

#[test]
fn test_unknown_target_type_fails_before_loading() {
    let dir = fixture();
    // images removed: construction must still fail on the target type alone
    std::fs::remove_dir_all(dir.path().join("img_align_celeba")).unwrap();
    let err = CelebADataset::new(dir.path(), "train", &["attr", "unknown"], None, None).unwrap_err();
    assert!(matches!(err, CganError::UnrecognizedTargetType(ref t) if t == "unknown"));
    assert_eq!(err.to_string(), "Target type unknown is not recognized");
}

#[test]
fn test_unknown_split_is_rejected() {
    let dir = fixture();
    assert!(matches!(
        CelebADataset::new(dir.path(), "holdout", &["attr"], None, None),
        Err(CganError::UnrecognizedSplit(_))
    ));
}

#[test]
fn test_missing_attribute_row_is_reported() {
    let dir = fixture();
    let attr_path = dir.path().join(celeba::ATTR_FILE);
    let text = std::fs::read_to_string(&attr_path).unwrap();
    let kept: Vec<&str> = text.lines().filter(|l| !l.starts_with("000003.jpg")).collect();
    std::fs::write(&attr_path, kept.join("\n")).unwrap();

    let err = CelebADataset::new(dir.path(), "all", &["attr"], None, None).unwrap_err();
    assert!(matches!(err, CganError::MissingMetadataRow { ref image_id, .. } if image_id == "000003.jpg"));
}

#[test]
fn test_wrong_attribute_count_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut row = CelebaRow::with_attr(0, 0, 0);
    row.attrs.truncate(39);
    // header is written for 40 columns; rewrite it to match the short rows
    write_celeba_fixture(dir.path(), &[row], (8, 8)).unwrap();
    let attr_path = dir.path().join(celeba::ATTR_FILE);
    let text = std::fs::read_to_string(&attr_path).unwrap();
    let mut lines: Vec<String> = text.lines().map(String::from).collect();
    lines[0] = lines[0].rsplit_once(',').unwrap().0.to_string();
    std::fs::write(&attr_path, lines.join("\n")).unwrap();

    assert!(matches!(
        CelebADataset::new(dir.path(), "all", &["attr"], None, None),
        Err(CganError::UnexpectedAttributeCount { expected: 40, found: 39 })
    ));
}

#[test]
fn test_index_past_end_is_an_error() {
    let dir = fixture();
    let ds = CelebADataset::new(dir.path(), "valid", &["attr", "bbox"], None, None).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    assert!(ds.get(ds.len() - 1, &mut rng).is_ok());
    assert!(matches!(ds.get(ds.len(), &mut rng), Err(CganError::InvalidConfig(_))));
    assert!(ds.get_item(ds.len() + 5, &mut rng).is_err());
    assert!(ds.target(ds.len()).is_none());
}
