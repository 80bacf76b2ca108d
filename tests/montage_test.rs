//! Integration tests: generate synthetic montages with known defects, serve
//! them through the in-memory source, and verify every section is
//! classified as constructed.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use montage_qc::{
    analyze_sections, analyze_sections_with_cancel, select_z_values, AnalysisConfig,
    BoundingBox, FixtureSource, Point2, PointMatch, ResidualAttribution, SectionSource, StitchState,
    TileRecord, TileTransform, Transform, Vector2, ZValue,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

const TILE: f64 = 100.0;
const STEP: f64 = 90.0;
const POINTS_PER_MATCH: usize = 30;

/// Defects built into one synthetic section.
#[derive(Debug, Clone, Default)]
struct SectionLayout {
    rows: usize,
    cols: usize,
    /// Tile removed from the post-stitch layout.
    drop: Option<(usize, usize)>,
    /// Column moved right by the given amount after stitching.
    shift_column: Option<(usize, f64)>,
    /// Tile whose match with its right neighbour is offset by 15 px.
    seam_at: Option<(usize, usize)>,
}

impl SectionLayout {
    fn grid(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Default::default()
        }
    }
}

fn tile_id(z: ZValue, r: usize, c: usize) -> String {
    format!("z{z}-r{r}c{c}")
}

/// Add section `z` to the source: pre and post tiles, post transforms, and
/// point matches between right and lower neighbours that still overlap.
fn add_section(
    mut source: FixtureSource,
    z: ZValue,
    layout: &SectionLayout,
    rng: &mut StdRng,
) -> FixtureSource {
    let group = format!("{z}.0");
    let noise = Normal::new(0.0, 0.5).unwrap();

    let mut pre = Vec::new();
    let mut post = Vec::new();
    let mut placed: Vec<Vec<Option<BoundingBox>>> = vec![vec![None; layout.cols]; layout.rows];

    for r in 0..layout.rows {
        for c in 0..layout.cols {
            let id = tile_id(z, r, c);
            let (x, y) = (c as f64 * STEP, r as f64 * STEP);
            pre.push(TileRecord::new(id.as_str(), [x, y, x + TILE, y + TILE], group.as_str()));

            if layout.drop == Some((r, c)) {
                continue;
            }
            let dx = match layout.shift_column {
                Some((col, d)) if col == c => d,
                _ => 0.0,
            };
            let bbox = BoundingBox::new(x + dx, y, x + dx + TILE, y + TILE);
            post.push(TileRecord::new(id.as_str(), bbox, group.as_str()));
            source = source.with_transform(id, TileTransform::translation(bbox.min_x, bbox.min_y));
            placed[r][c] = Some(bbox);
        }
    }

    let mut matches = Vec::new();
    for r in 0..layout.rows {
        for c in 0..layout.cols {
            let Some(a) = placed[r][c] else { continue };
            let neighbours = [(r, c + 1), (r + 1, c)];
            for (nr, nc) in neighbours {
                let Some(b) = placed.get(nr).and_then(|row| row.get(nc)).copied().flatten() else {
                    continue;
                };
                let seam = layout.seam_at == Some((r, c)) && nr == r;
                if let Some(m) = overlap_match(z, (r, c), a, (nr, nc), b, seam, &noise, rng) {
                    matches.push(m);
                }
            }
        }
    }

    source
        .with_tiles(StitchState::Pre, z, pre)
        .with_tiles(StitchState::Post, z, post)
        .with_matches(group, matches)
}

/// Correspondences sampled uniformly in the overlap of two placed tiles.
#[allow(clippy::too_many_arguments)]
fn overlap_match(
    z: ZValue,
    p_cell: (usize, usize),
    a: BoundingBox,
    q_cell: (usize, usize),
    b: BoundingBox,
    seam: bool,
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Option<PointMatch> {
    let min_x = a.min_x.max(b.min_x);
    let max_x = a.max_x.min(b.max_x);
    let min_y = a.min_y.max(b.min_y);
    let max_y = a.max_y.min(b.max_y);
    if max_x <= min_x || max_y <= min_y {
        return None;
    }
    let seam_offset = if seam { Vector2::new(15.0, 0.0) } else { Vector2::zeros() };

    let mut p = Vec::with_capacity(POINTS_PER_MATCH);
    let mut q = Vec::with_capacity(POINTS_PER_MATCH);
    for _ in 0..POINTS_PER_MATCH {
        let m = Point2::new(
            rng.random_range(min_x..max_x),
            rng.random_range(min_y..max_y),
        );
        let jitter = Vector2::new(noise.sample(rng), noise.sample(rng));
        p.push(m - Vector2::new(a.min_x, a.min_y));
        q.push(m - Vector2::new(b.min_x, b.min_y) + jitter + seam_offset);
    }
    Some(PointMatch::new(
        tile_id(z, p_cell.0, p_cell.1),
        tile_id(z, q_cell.0, q_cell.1),
        p,
        q,
    ))
}

fn config(pool_size: usize) -> AnalysisConfig {
    AnalysisConfig {
        pool_size,
        ..Default::default()
    }
}

#[test]
fn test_clean_montage_passes() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut rng = StdRng::seed_from_u64(42);

    let mut source = FixtureSource::new();
    for z in 100..104 {
        source = add_section(source, z, &SectionLayout::grid(4, 5), &mut rng);
    }

    let report = analyze_sections(&[100, 101, 102, 103], &source, &config(4)).unwrap();
    assert!(report.qc_passed());
    assert_eq!(report.clean_sections, BTreeSet::from([100, 101, 102, 103]));

    for verdict in report.verdicts.values() {
        assert!(verdict.warnings.is_empty());
        // every tile except the bottom-right one has a right or lower neighbour
        assert_eq!(verdict.tiles_with_residuals, 4 * 5 - 1);
        // 4 rows × 4 horizontal + 3 rows × 5 vertical
        assert_eq!(verdict.matches_used, 16 + 15);
    }
}

#[test]
fn test_dropped_tile_is_a_hole() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut rng = StdRng::seed_from_u64(1);

    let layout = SectionLayout {
        drop: Some((1, 1)),
        ..SectionLayout::grid(3, 3)
    };
    let source = add_section(FixtureSource::new(), 7, &layout, &mut rng);
    let report = analyze_sections(&[7], &source, &config(1)).unwrap();

    assert_eq!(report.hole_sections, BTreeSet::from([7]));
    assert!(report.clean_sections.is_empty());

    let verdict = &report.verdicts[&7];
    assert_eq!(verdict.disconnected_tile_ids, vec![tile_id(7, 1, 1)]);
    // the eight surrounding tiles each lost their overlap with the centre
    assert_eq!(verdict.gap_tile_ids.len(), 8);
    let holes: BTreeSet<&String> = verdict.disconnected_tile_ids.iter().collect();
    assert!(verdict.gap_tile_ids.iter().all(|id| !holes.contains(id)));
    assert!(verdict.seam_centroids.is_empty());
}

#[test]
fn test_separated_column_is_a_gap() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut rng = StdRng::seed_from_u64(2);

    let layout = SectionLayout {
        shift_column: Some((2, 50.0)),
        ..SectionLayout::grid(3, 4)
    };
    let source = add_section(FixtureSource::new(), 3, &layout, &mut rng);
    let report = analyze_sections(&[3], &source, &config(1)).unwrap();

    assert_eq!(report.gap_sections, BTreeSet::from([3]));
    assert!(report.hole_sections.is_empty());
    assert!(report.seam_sections.is_empty());

    // columns 1 and 2 lost their shared overlaps; columns 2 and 3 still touch
    let mut gaps = report.verdicts[&3].gap_tile_ids.clone();
    gaps.sort();
    let mut expected: Vec<String> = (0..3)
        .flat_map(|r| [tile_id(3, r, 1), tile_id(3, r, 2)])
        .collect();
    expected.sort();
    assert_eq!(gaps, expected);
}

#[test]
fn test_misaligned_overlap_is_a_seam() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut rng = StdRng::seed_from_u64(3);

    let layout = SectionLayout {
        seam_at: Some((0, 0)),
        ..SectionLayout::grid(3, 3)
    };
    let source = add_section(FixtureSource::new(), 11, &layout, &mut rng);
    let report = analyze_sections(&[11], &source, &config(1)).unwrap();

    assert_eq!(report.seam_sections, BTreeSet::from([11]));
    assert!(report.hole_sections.is_empty());
    assert!(report.gap_sections.is_empty());

    let centroids = report.seam_centroids(11);
    assert_eq!(centroids.len(), 1);
    // overlap of r0c0 and r0c1 is x 90..100, midpoints sit 7.5 px to the right
    let c = centroids[0];
    assert!(c.x > 97.0 && c.x < 108.0, "centroid x = {}", c.x);
    assert!(c.y > 0.0 && c.y < 100.0, "centroid y = {}", c.y);
    assert_eq!(report.verdicts[&11].seam_clusters[0].size(), POINTS_PER_MATCH);
}

#[test]
fn test_seam_needs_enough_points() {
    let mut rng = StdRng::seed_from_u64(4);
    let layout = SectionLayout {
        seam_at: Some((0, 0)),
        ..SectionLayout::grid(2, 2)
    };
    let source = add_section(FixtureSource::new(), 1, &layout, &mut rng);

    let mut strict = config(1);
    strict.seam.min_cluster_size = POINTS_PER_MATCH;
    let report = analyze_sections(&[1], &source, &strict).unwrap();
    assert!(report.seam_sections.is_empty());
    assert_eq!(report.clean_sections, BTreeSet::from([1]));
}

#[test]
fn test_failed_section_is_isolated() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut rng = StdRng::seed_from_u64(5);

    let mut source = FixtureSource::new();
    for z in 0..5 {
        source = add_section(source, z, &SectionLayout::grid(2, 3), &mut rng);
    }
    let source = source.fail_section(2);

    let report = analyze_sections(&[0, 1, 2, 3, 4], &source, &config(3)).unwrap();
    assert_eq!(report.failed_sections, BTreeSet::from([2]));
    assert_eq!(report.clean_sections, BTreeSet::from([0, 1, 3, 4]));
    assert!(!report.verdicts.contains_key(&2));
    assert_eq!(report.failures[&2].z, 2);
    assert!(!report.qc_passed());
}

#[test]
fn test_both_sides_attribution_credits_every_matched_tile() {
    let mut rng = StdRng::seed_from_u64(6);
    let source = add_section(FixtureSource::new(), 0, &SectionLayout::grid(3, 3), &mut rng);

    let p_side = analyze_sections(&[0], &source, &config(1)).unwrap();
    assert_eq!(p_side.verdicts[&0].tiles_with_residuals, 8);

    let mut both = config(1);
    both.residual.attribution = ResidualAttribution::BothSides;
    let both_sides = analyze_sections(&[0], &source, &both).unwrap();
    assert_eq!(both_sides.verdicts[&0].tiles_with_residuals, 9);
    assert!(both_sides.clean_sections.contains(&0));
}

#[test]
fn test_report_independent_of_pool_size_and_order() {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();
    let mut rng = StdRng::seed_from_u64(7);

    let layouts = [
        SectionLayout::grid(3, 3),
        SectionLayout {
            drop: Some((0, 2)),
            ..SectionLayout::grid(3, 3)
        },
        SectionLayout {
            shift_column: Some((1, 40.0)),
            ..SectionLayout::grid(3, 3)
        },
        SectionLayout {
            seam_at: Some((2, 0)),
            ..SectionLayout::grid(3, 3)
        },
    ];
    let mut source = FixtureSource::new();
    for z in 0..12 {
        source = add_section(source, z, &layouts[z as usize % layouts.len()], &mut rng);
    }

    let forward: Vec<ZValue> = (0..12).collect();
    let backward: Vec<ZValue> = (0..12).rev().collect();
    let serial = analyze_sections(&forward, &source, &config(1)).unwrap();
    let parallel = analyze_sections(&backward, &source, &config(8)).unwrap();

    assert_eq!(serial.hole_sections, parallel.hole_sections);
    assert_eq!(serial.gap_sections, parallel.gap_sections);
    assert_eq!(serial.seam_sections, parallel.seam_sections);
    assert_eq!(serial.clean_sections, parallel.clean_sections);
    for (z, v) in &serial.verdicts {
        let w = &parallel.verdicts[z];
        assert_eq!(v.disconnected_tile_ids, w.disconnected_tile_ids);
        assert_eq!(v.gap_tile_ids, w.gap_tile_ids);
        assert_eq!(v.seam_centroids, w.seam_centroids);
    }

    assert_eq!(serial.clean_sections, BTreeSet::from([0, 4, 8]));
    assert_eq!(serial.hole_sections, BTreeSet::from([1, 5, 9]));
    assert_eq!(serial.seam_sections, BTreeSet::from([3, 7, 11]));
    // a dropped tile also costs its neighbours overlaps
    assert_eq!(serial.gap_sections, BTreeSet::from([1, 2, 5, 6, 9, 10]));
}

/// Source that raises the cancel flag as soon as any section is fetched.
struct CancelOnFirstFetch<'a> {
    inner: FixtureSource,
    cancel: &'a AtomicBool,
}

impl SectionSource for CancelOnFirstFetch<'_> {
    fn tile_records(&self, state: StitchState, z: ZValue) -> anyhow::Result<Vec<TileRecord>> {
        self.cancel.store(true, Ordering::Release);
        self.inner.tile_records(state, z)
    }

    fn point_matches(&self, group_id: &str) -> anyhow::Result<Vec<PointMatch>> {
        self.inner.point_matches(group_id)
    }

    fn resolve_transform(&self, tile: &TileRecord) -> Option<Arc<dyn Transform>> {
        self.inner.resolve_transform(tile)
    }
}

#[test]
fn test_cancel_discards_only_unstarted_sections() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
    let mut rng = StdRng::seed_from_u64(8);

    let mut inner = FixtureSource::new();
    for z in 0..6 {
        inner = add_section(inner, z, &SectionLayout::grid(3, 3), &mut rng);
    }
    let cancel = AtomicBool::new(false);
    let source = CancelOnFirstFetch {
        inner,
        cancel: &cancel,
    };

    let zs: Vec<ZValue> = (0..6).collect();
    let report = analyze_sections_with_cancel(&zs, &source, &config(1), &cancel).unwrap();

    // single worker: the first section runs to completion, the rest never start
    assert_eq!(report.verdicts.len(), 1);
    assert_eq!(report.cancelled_sections.len(), 5);
    let (z, verdict) = report.verdicts.iter().next().unwrap();
    assert!(report.clean_sections.contains(z));
    assert_eq!(verdict.matches_used, 12);
    assert!(!report.qc_passed());
}

#[test]
fn test_select_sections_from_stack() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut source = FixtureSource::new();
    for z in [1020, 1025, 1028, 1029, 1040] {
        source = add_section(source, z, &SectionLayout::grid(2, 2), &mut rng);
    }

    let zs = select_z_values(&source.post_z_values(), 1025, 1030).unwrap();
    assert_eq!(zs, vec![1025, 1028, 1029]);
    let report = analyze_sections(&zs, &source, &config(2)).unwrap();
    assert_eq!(report.clean_sections, BTreeSet::from([1025, 1028, 1029]));

    assert!(select_z_values(&source.post_z_values(), 0, 100).is_err());
}

/// Randomized sections with randomly chosen defects; every classification
/// must match the construction.
#[test]
fn test_statistical_random_defects() {
    let _ = tracing_subscriber::fmt().with_env_filter("warn").try_init();
    let mut rng = StdRng::seed_from_u64(2024);

    let n_sections = 40;
    let mut source = FixtureSource::new();
    let mut expected_holes = BTreeSet::new();
    let mut expected_seams = BTreeSet::new();
    let mut expected_gaps = BTreeSet::new();

    for z in 0..n_sections {
        let rows = rng.random_range(3..7usize);
        let cols = rng.random_range(3..7usize);
        let mut layout = SectionLayout::grid(rows, cols);
        match rng.random_range(0..4u32) {
            0 => {}
            1 => {
                layout.drop = Some((rng.random_range(0..rows), rng.random_range(0..cols)));
                expected_holes.insert(z);
                expected_gaps.insert(z);
            }
            2 => {
                layout.shift_column = Some((rng.random_range(1..cols), rng.random_range(20.0..80.0)));
                expected_gaps.insert(z);
            }
            _ => {
                layout.seam_at = Some((rng.random_range(0..rows), rng.random_range(0..cols - 1)));
                expected_seams.insert(z);
            }
        }
        source = add_section(source, z, &layout, &mut rng);
    }

    let zs: Vec<ZValue> = (0..n_sections).collect();
    let report = analyze_sections(&zs, &source, &config(8)).unwrap();

    assert_eq!(report.hole_sections, expected_holes);
    assert_eq!(report.gap_sections, expected_gaps);
    assert_eq!(report.seam_sections, expected_seams);
    let defective: BTreeSet<ZValue> = expected_gaps.union(&expected_seams).copied().collect();
    let expected_clean: BTreeSet<ZValue> = (0..n_sections).filter(|z| !defective.contains(z)).collect();
    assert_eq!(report.clean_sections, expected_clean);
    println!(
        "{} sections: {} holes, {} gaps, {} seams, {} clean",
        n_sections,
        report.hole_sections.len(),
        report.gap_sections.len(),
        report.seam_sections.len(),
        report.clean_sections.len()
    );
}
