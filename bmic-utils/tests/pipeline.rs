use approx::assert_abs_diff_eq;
use bmic_utils::prelude::*;
use ndarray::Array3;

fn init_logger() {
    let _ = simple_logger::init_with_level(log::Level::Debug);
}

fn two_blocks() -> Array3<f32> {
    Array3::from_shape_fn((12, 10, 8), |(x, _, _)| if x < 6 { -200.0 } else { 80.0 })
}

#[test]
fn save_then_load_keeps_shape_and_affine() {
    let dir = tempfile::tempdir().unwrap();
    let affine = Affine::from([
        [0.8, 0.0, 0.0, -10.0],
        [0.0, 0.8, 0.0, 4.0],
        [0.0, 0.0, 2.5, 30.0],
        [0.0, 0.0, 0.0, 1.0],
    ]);
    let v = Array3::from_shape_fn((4, 5, 6), |(x, y, z)| (x * 100 + y * 10 + z) as f32 - 1.7);

    let path = save_nii(dir.path().join("deep/dir/scan"), &v, Some(&affine)).unwrap();
    assert_eq!(path, dir.path().join("deep/dir/scan.nii.gz"));

    let (back, back_affine) = load_nii(dir.path().join("deep/dir/scan")).unwrap();
    assert_eq!(back.dim(), (4, 5, 6));
    // 先截断再转为 int16.
    assert_eq!(back[(0, 0, 0)], -1.0);
    assert_eq!(back[(3, 4, 5)], 343.0);
    for (a, b) in back_affine.rows().iter().flatten().zip(affine.rows().iter().flatten()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
    }

    let vol = NiiVolume::open(&path).unwrap();
    assert_abs_diff_eq!(vol.voxel(), 0.8 * 0.8 * 2.5, epsilon = 1e-5);
}

#[test]
fn save_without_affine_uses_identity() {
    let dir = tempfile::tempdir().unwrap();
    let v = Array3::<u32>::ones((3, 3, 3));
    let path = save_nii(dir.path().join("labels.nii"), &v, None).unwrap();
    assert_eq!(path, dir.path().join("labels.nii"));
    let (_, affine) = load_nii(&path).unwrap();
    assert!(affine.is_identity());
}

#[test]
fn load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_nii(dir.path().join("nothing")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);

    let junk = dir.path().join("junk.nii");
    std::fs::write(&junk, b"not a nifti file").unwrap();
    assert_eq!(load_nii(&junk).unwrap_err().kind(), ErrorKind::Decode);
}

#[test]
fn segment_save_export() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let v = two_blocks();
    let params = SlicParams::default().with_n_seg(6);
    let labels = segment_3d(v.view(), &params).unwrap();
    assert!(labels.iter().all(|l| *l >= START_LABEL));

    // 单个分量不超过 3 * size / k 个体素, 因此至少有两个标签.
    assert!(labels.iter().max().copied().unwrap_or(0) >= 2);

    let seg = save_nii(dir.path().join("out/seg"), &labels, None).unwrap();
    let back = load_nii_data(&seg).unwrap();
    assert!(back.iter().zip(labels.iter()).all(|(a, b)| *a as u32 == *b));

    let ply = export_points(dir.path().join("out/seg"), &labels).unwrap();
    assert_eq!(read_ply_points(&ply).unwrap().len(), labels.len());
}

#[test]
fn windowed_segmentation() {
    init_logger();
    let v = two_blocks();
    let params = SlicParams::default()
        .with_n_seg(4)
        .with_limits(Limits::new(0.0, 100.0));
    let labels = segment_3d(v.view(), &params).unwrap();
    for ((x, y, z), l) in labels.indexed_iter() {
        assert_eq!(*l == UNLABELED, x < 6, "at {:?}", (x, y, z));
    }

    // 窗口为空时等价于对全零数据做全域分割.
    let empty = SlicParams::default()
        .with_n_seg(4)
        .with_limits(Limits::new(1000.0, 2000.0));
    let fallback = segment_3d(v.view(), &empty).unwrap();
    let zeros = Array3::<f32>::zeros(v.dim());
    let blank = segment_3d(zeros.view(), &SlicParams::default().with_n_seg(4)).unwrap();
    assert_eq!(fallback, blank);
}

#[test]
fn config_drives_params() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.yaml");
    std::fs::write(&path, "n_seg: 3\ncompactness: 0.1\nlimits: [0, 100]\n").unwrap();
    let args = yaml_read(&path, false, true).unwrap().into_easy().unwrap();
    let params: SlicParams = auto_args(&args).unwrap();
    assert_eq!(params.n_seg, 3);
    assert_eq!(params.limits, Limits::new(0.0, 100.0));

    blob_write(&params, dir.path().join("params.bin")).unwrap();
    let back: SlicParams = blob_read(dir.path().join("params.bin")).unwrap();
    assert_eq!(back, params);
}
