use needle_core::Image;
use needle_fast::pyramid::ImagePyramid;
use needle_fast::utils::{has_contiguous_arc, longest_arc};
use needle_fast::DetectorBuilder;
use proptest::prelude::*;

fn arb_image() -> impl Strategy<Value = Image> {
    (8usize..80, 8usize..80).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), w * h)
            .prop_map(move |pixels| Image::new(w, h, pixels).unwrap())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_arc_test_agrees_with_longest_run(mask in any::<u16>(), n in 1u32..=16) {
        prop_assert_eq!(has_contiguous_arc(mask, n), n <= longest_arc(mask));
    }

    #[test]
    fn prop_keypoints_inside_image(img in arb_image(), threshold in 5u8..60) {
        let detector = DetectorBuilder::new().threshold(threshold).threads(1).build().unwrap();
        let (w, h) = img.dimensions();
        let levels = ImagePyramid::generate_scale_levels(w, h, detector.config().core.n_levels);
        let keypoints = detector.detect_keypoints(&img).unwrap();

        for kp in &keypoints {
            prop_assert!(kp.x >= -0.5 && kp.x <= w as f32 - 0.5);
            prop_assert!(kp.y >= -0.5 && kp.y <= h as f32 - 0.5);
            prop_assert!(kp.octave < levels.len());
            prop_assert_eq!(kp.scale, levels[kp.octave].scale);
        }
    }

    #[test]
    fn prop_detection_is_deterministic(img in arb_image()) {
        let detector = DetectorBuilder::new().threads(2).build().unwrap();
        prop_assert_eq!(detector.detect_keypoints(&img).unwrap(), detector.detect_keypoints(&img).unwrap());
    }
}
