use std::f32::consts::PI;

use houghlab::{
    gaussian_blur, CancelToken, Circle, CircleDetectConfig, CircleDetector, EdgeConfig, EdgeMap,
    HoughError, LineDetectConfig, LineDetector, LineSegment,
};
use image::{GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Same fixtures as the crate's private `test_utils`, which integration tests
// cannot reach. Dark shapes on a white background here.
fn draw_stroke(w: u32, h: u32, a: (f32, f32), b: (f32, f32), thickness: f32) -> GrayImage {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let half = thickness * 0.5;
    GrayImage::from_fn(w, h, |x, y| {
        let (px, py) = (x as f32 - a.0, y as f32 - a.1);
        let t = ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0);
        let (ex, ey) = (px - t * dx, py - t * dy);
        Luma([if ex * ex + ey * ey <= half * half { 0 } else { 255 }])
    })
}

fn draw_disks(w: u32, h: u32, disks: &[((f32, f32), f32)]) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let inside = disks.iter().any(|&((cx, cy), r)| {
            let (dx, dy) = (x as f32 - cx, y as f32 - cy);
            dx * dx + dy * dy <= r * r
        });
        Luma([if inside { 0 } else { 255 }])
    })
}

fn add_salt_noise(img: &mut GrayImage, count: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let (w, h) = img.dimensions();
    for _ in 0..count {
        let x = rng.gen_range(0..w);
        let y = rng.gen_range(0..h);
        let v = if rng.gen_bool(0.5) { 0 } else { 255 };
        img.put_pixel(x, y, Luma([v]));
    }
}

fn smoothed(img: &GrayImage) -> GrayImage {
    gaussian_blur(img, 9, 2.0).unwrap()
}

fn line_detector(threshold: u32, min_len: u32, gap: u32) -> LineDetector {
    LineDetector::new(LineDetectConfig {
        vote_threshold: threshold,
        min_line_length: min_len,
        max_line_gap: gap,
        ..Default::default()
    })
    .unwrap()
}

fn circle_detector(threshold: u32, min_dist: f32) -> CircleDetector {
    CircleDetector::new(CircleDetectConfig {
        dp: 1.0,
        min_dist,
        canny_high: 50.0,
        accumulator_threshold: threshold,
        min_radius: 0,
        max_radius: 0,
    })
    .unwrap()
}

fn near(c: &Circle, cx: f32, cy: f32, tol: f32) -> bool {
    (c.cx as f32 - cx).abs() <= tol && (c.cy as f32 - cy).abs() <= tol
}

#[test]
fn single_line_is_found_with_matching_angle() {
    let (a, b) = ((20.0, 80.0), (180.0, 20.0));
    let gray = draw_stroke(200, 100, a, b, 3.0);
    let edges = EdgeMap::canny(&gray, &EdgeConfig::default()).unwrap();
    let segs = line_detector(30, 30, 5).detect(&edges);

    let expected = (b.1 - a.1).atan2(b.0 - a.0).rem_euclid(PI);
    assert!(
        segs.iter().any(|s| (s.angle() - expected).abs() < 0.05),
        "no segment near angle {expected}: {segs:?}"
    );

    let pad = 4;
    for s in &segs {
        for (x, y) in [(s.x1, s.y1), (s.x2, s.y2)] {
            assert!(
                (20 - pad..=180 + pad).contains(&x) && (20 - pad..=80 + pad).contains(&y),
                "endpoint ({x}, {y}) outside the stroke bbox: {s:?}"
            );
        }
    }
}

#[test]
fn single_disk_is_found_once() {
    let gray = smoothed(&draw_disks(200, 200, &[((100.0, 90.0), 40.0)]));
    let circles = circle_detector(30, 50.0).detect(&gray);

    assert_eq!(circles.len(), 1, "circles: {circles:?}");
    let c = circles[0];
    assert!(near(&c, 100.0, 90.0, 2.0), "{c:?}");
    assert!(c.radius.abs_diff(40) <= 3, "{c:?}");
}

#[test]
fn single_disk_with_default_config() {
    let gray = smoothed(&draw_disks(200, 200, &[((100.0, 90.0), 40.0)]));
    let circles = CircleDetector::new(CircleDetectConfig::default())
        .unwrap()
        .detect(&gray);

    assert_eq!(circles.len(), 1, "circles: {circles:?}");
    assert!(near(&circles[0], 100.0, 90.0, 2.0), "{:?}", circles[0]);
    assert!(circles[0].radius.abs_diff(40) <= 3, "{:?}", circles[0]);
}

#[test]
fn repeated_runs_are_identical() {
    let mut gray = draw_stroke(160, 120, (10.0, 10.0), (150.0, 100.0), 3.0);
    add_salt_noise(&mut gray, 300, 7);
    let edges = EdgeMap::canny(&gray, &EdgeConfig::default()).unwrap();
    let lines = line_detector(20, 10, 3);
    assert_eq!(lines.detect(&edges), lines.detect(&edges));

    let disks = smoothed(&draw_disks(
        160,
        120,
        &[((50.0, 60.0), 25.0), ((115.0, 55.0), 18.0)],
    ));
    let circles = circle_detector(20, 20.0);
    assert_eq!(circles.detect(&disks), circles.detect(&disks));
}

#[test]
fn raising_thresholds_never_adds_detections() {
    let mut gray = draw_stroke(200, 150, (10.0, 140.0), (190.0, 20.0), 3.0);
    add_salt_noise(&mut gray, 500, 11);
    let edges = EdgeMap::canny(&gray, &EdgeConfig::default()).unwrap();
    let line_counts: Vec<usize> = [5, 10, 20, 40, 80, 160]
        .iter()
        .map(|&t| line_detector(t, 5, 3).detect(&edges).len())
        .collect();
    assert!(
        line_counts.windows(2).all(|w| w[0] >= w[1]),
        "line counts: {line_counts:?}"
    );

    let mut disks = draw_disks(
        200,
        150,
        &[((60.0, 70.0), 30.0), ((150.0, 80.0), 22.0)],
    );
    add_salt_noise(&mut disks, 400, 13);
    let disks = smoothed(&disks);
    let circle_counts: Vec<usize> = [2, 5, 10, 20, 40, 80]
        .iter()
        .map(|&t| circle_detector(t, 10.0).detect(&disks).len())
        .collect();
    assert!(
        circle_counts.windows(2).all(|w| w[0] >= w[1]),
        "circle counts: {circle_counts:?}"
    );
}

#[test]
fn empty_inputs_give_empty_results() {
    let lines = line_detector(1, 0, 0).detect(&EdgeMap::empty(320, 240));
    assert!(lines.is_empty());

    let black = GrayImage::new(320, 240);
    assert!(circle_detector(1, 10.0).detect(&black).is_empty());
    assert!(CircleDetector::new(CircleDetectConfig::default())
        .unwrap()
        .detect(&black)
        .is_empty());
}

#[test]
fn close_circles_are_suppressed_by_min_dist() {
    let gray = smoothed(&draw_disks(
        200,
        200,
        &[((70.0, 100.0), 20.0), ((115.0, 100.0), 20.0)],
    ));

    let suppressed = circle_detector(30, 60.0).detect(&gray);
    assert!(suppressed.len() <= 1, "circles: {suppressed:?}");

    let both = circle_detector(30, 20.0).detect(&gray);
    assert!(both.iter().any(|c| near(c, 70.0, 100.0, 3.0)), "{both:?}");
    assert!(both.iter().any(|c| near(c, 115.0, 100.0, 3.0)), "{both:?}");
}

#[test]
fn detections_stay_inside_noisy_images() {
    let (w, h) = (180, 130);
    let mut gray = draw_disks(w, h, &[((40.0, 40.0), 35.0), ((150.0, 110.0), 30.0)]);
    add_salt_noise(&mut gray, 2000, 23);

    let edges = EdgeMap::canny(&gray, &EdgeConfig::default()).unwrap();
    for s in line_detector(8, 3, 2).detect(&edges) {
        assert!(s.x1 < w && s.x2 < w && s.y1 < h && s.y2 < h, "{s:?}");
        assert!(edges.is_edge(s.x1, s.y1) && edges.is_edge(s.x2, s.y2), "{s:?}");
    }

    let cfg = CircleDetectConfig {
        dp: 1.5,
        min_dist: 8.0,
        accumulator_threshold: 3,
        min_radius: 5,
        max_radius: 60,
        ..Default::default()
    };
    for c in CircleDetector::new(cfg).unwrap().detect(&smoothed(&gray)) {
        assert!(c.cx < w && c.cy < h, "{c:?}");
        assert!((5..=60).contains(&c.radius), "{c:?}");
    }
}

#[test]
fn cancellation_stops_both_detectors() {
    let token = CancelToken::new();
    token.cancel();

    let gray = draw_stroke(100, 100, (5.0, 5.0), (95.0, 95.0), 3.0);
    let edges = EdgeMap::canny(&gray, &EdgeConfig::default()).unwrap();
    assert_eq!(
        line_detector(10, 10, 2).detect_cancellable(&edges, &token),
        Err(HoughError::Cancelled)
    );

    let disk = smoothed(&draw_disks(100, 100, &[((50.0, 50.0), 20.0)]));
    assert_eq!(
        circle_detector(10, 20.0).detect_cancellable(&disk, &token),
        Err(HoughError::Cancelled)
    );
}

#[test]
fn free_functions_validate_before_detecting() {
    let edges = EdgeMap::from_fn(50, 50, |x, y| x == y);
    let bad = LineDetectConfig {
        rho_resolution: -1.0,
        ..Default::default()
    };
    assert!(matches!(
        houghlab::detect_lines(&edges, &bad),
        Err(HoughError::InvalidParameter {
            param: "lines.rho_resolution",
            ..
        })
    ));

    let ok = LineDetectConfig {
        vote_threshold: 20,
        min_line_length: 20,
        max_line_gap: 0,
        ..Default::default()
    };
    let segs = houghlab::detect_lines(&edges, &ok).unwrap();
    assert!(segs.contains(&LineSegment::new(0, 0, 49, 49)), "{segs:?}");

    let bad = CircleDetectConfig {
        dp: 0.9,
        ..Default::default()
    };
    assert!(matches!(
        houghlab::detect_circles(&GrayImage::new(10, 10), &bad),
        Err(HoughError::InvalidParameter {
            param: "circles.dp",
            ..
        })
    ));
}
