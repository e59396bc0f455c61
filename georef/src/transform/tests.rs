use std::str::FromStr;

use glam::{DVec2, DVec3};

use super::*;
use crate::footprint::{Building, BuildingPart, Footprint, Ring};
use crate::point::{GrPoint, Point4Values, RowColumn};
use crate::store::CorrespondenceStore;

const EPSILON: f64 = 1e-6;

fn approx_eq(a: DVec2, b: DVec2) -> bool {
    (a - b).abs().max_element() < EPSILON
}

fn store_from(pairs: &[(DVec2, DVec2)]) -> CorrespondenceStore {
    let mut store = CorrespondenceStore::new();
    for (i, &(fp, gr)) in pairs.iter().enumerate() {
        let fp = GrPoint::new(ViewportKind::Footprint, fp);
        let gr = GrPoint::new(ViewportKind::Georeferenced, gr);
        store
            .add(
                Point4Values::new(fp, fp, RowColumn::for_kind(i, ViewportKind::Footprint)),
                Point4Values::new(gr, gr, RowColumn::for_kind(i, ViewportKind::Georeferenced)),
            )
            .unwrap();
    }
    store
}

fn solve(
    kind: TransformationType,
    order: u32,
    store: &CorrespondenceStore,
    footprint: &Footprint,
) -> crate::error::Result<TransformationResult> {
    create_method(kind, order, SolverInput::new(store, footprint))?.solve()
}

#[test]
fn pure_translation_has_zero_affine_residuals() {
    let store = store_from(&[
        (DVec2::new(0.0, 0.0), DVec2::new(10.0, 10.0)),
        (DVec2::new(1.0, 0.0), DVec2::new(11.0, 10.0)),
        (DVec2::new(0.0, 1.0), DVec2::new(10.0, 11.0)),
    ]);
    let footprint = Footprint::default();
    let method = create_method(
        TransformationType::Affine,
        1,
        SolverInput::new(&store, &footprint),
    )
    .unwrap();

    let residuals = method.compute_residuals().unwrap();
    assert_eq!(residuals.len(), 3);
    for r in residuals {
        assert!(r.length() < EPSILON, "{r:?}");
    }

    let FittedTransform::Affine(params) = method.fit().unwrap() else {
        panic!("expected an affine transform");
    };
    assert!(approx_eq(params.apply(DVec2::new(5.0, -3.0)), DVec2::new(15.0, 7.0)));
}

#[test]
fn single_point_helmert_is_underdetermined() {
    let store = store_from(&[(DVec2::new(0.0, 0.0), DVec2::new(10.0, 10.0))]);
    let err = solve(TransformationType::Helmert4, 1, &store, &Footprint::default()).unwrap_err();
    assert!(matches!(
        err,
        GeorefError::UnderdeterminedTransform {
            kind: TransformationType::Helmert4,
            points: 1,
            required: 2,
        }
    ));
    assert!(err.is_underdetermined());
}

#[test]
fn minimum_point_counts() {
    let two = store_from(&[
        (DVec2::new(0.0, 0.0), DVec2::new(0.0, 0.0)),
        (DVec2::new(1.0, 0.0), DVec2::new(1.0, 0.0)),
    ]);
    let empty = Footprint::default();
    assert!(solve(TransformationType::Helmert4, 1, &two, &empty).is_ok());
    assert!(solve(TransformationType::Affine, 1, &two, &empty)
        .unwrap_err()
        .is_underdetermined());
    assert!(solve(TransformationType::Polynomial, 1, &two, &empty)
        .unwrap_err()
        .is_underdetermined());

    let method = create_method(
        TransformationType::Polynomial,
        3,
        SolverInput::new(&two, &empty),
    )
    .unwrap();
    assert_eq!(method.min_points(), 10);
}

#[test]
fn helmert_recovers_similarity() {
    let truth = HelmertParams::new(DVec2::new(3_500_000.0, 5_600_000.0), 0.5, 2.5);
    let src = [
        DVec2::new(0.0, 0.0),
        DVec2::new(40.0, 0.0),
        DVec2::new(40.0, 25.0),
        DVec2::new(0.0, 25.0),
        DVec2::new(13.0, 7.0),
    ];
    let pairs: Vec<_> = src.iter().map(|&p| (p, truth.apply(p))).collect();
    let store = store_from(&pairs);

    let result = solve(TransformationType::Helmert4, 1, &store, &Footprint::default()).unwrap();
    let FittedTransform::Helmert4(fitted) = result.transform else {
        panic!("expected a helmert transform");
    };
    assert!((fitted.scale() - 2.5).abs() < 1e-9);
    assert!((fitted.rotation() - 0.5).abs() < 1e-9);
    assert!(approx_eq(fitted.translation(), truth.translation()));
    assert!(result.rmse < EPSILON);
}

#[test]
fn fitted_helmert_georeferences_buildings() {
    let transform = FittedTransform::Helmert4(HelmertParams::new(
        DVec2::new(1000.0, 2000.0),
        std::f64::consts::FRAC_PI_2,
        2.0,
    ));
    let building = Building {
        id: "tower".to_string(),
        parts: vec![BuildingPart {
            outline: vec![DVec3::new(1.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 30.0)],
        }],
    };

    let moved = transform.apply_to_buildings(&[building]);
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].id, "tower");
    let outline = &moved[0].parts[0].outline;
    assert!(approx_eq(outline[0].truncate(), DVec2::new(1000.0, 2002.0)));
    assert_eq!(outline[0].z, 0.0);
    assert_eq!(outline[1].z, 30.0);
}

#[test]
fn helmert_residuals_are_observed_minus_predicted() {
    // translation by (100, 200); last point is off by (+0.4, -0.4)
    let store = store_from(&[
        (DVec2::new(0.0, 0.0), DVec2::new(100.0, 200.0)),
        (DVec2::new(10.0, 0.0), DVec2::new(110.0, 200.0)),
        (DVec2::new(10.0, 10.0), DVec2::new(110.0, 210.0)),
        (DVec2::new(0.0, 10.0), DVec2::new(100.4, 209.6)),
    ]);
    let result = solve(TransformationType::Helmert4, 1, &store, &Footprint::default()).unwrap();

    let sum = result
        .residuals
        .iter()
        .fold(DVec2::ZERO, |acc, r| acc + DVec2::new(r.dx, r.dy));
    assert!(approx_eq(sum, DVec2::ZERO));
    assert!(result.residuals[3].dx > 0.0);
    assert!(result.residuals[3].dy < 0.0);
    assert!(result.rmse > 0.0);
    assert!((result.rmse - rmse(&result.residuals)).abs() < 1e-12);
}

#[test]
fn collinear_affine_is_singular() {
    let store = store_from(&[
        (DVec2::new(0.0, 0.0), DVec2::new(0.0, 0.0)),
        (DVec2::new(1.0, 1.0), DVec2::new(2.0, 2.0)),
        (DVec2::new(2.0, 2.0), DVec2::new(4.0, 4.0)),
        (DVec2::new(3.0, 3.0), DVec2::new(6.0, 6.0)),
    ]);
    let err = solve(TransformationType::Affine, 1, &store, &Footprint::default()).unwrap_err();
    assert!(matches!(
        err,
        GeorefError::SingularConfiguration(TransformationType::Affine)
    ));
}

#[test]
fn polynomial_order_two_fits_quadratic_warp() {
    let warp = |p: DVec2| DVec2::new(500.0 + p.x + 0.01 * p.x * p.y, 800.0 + p.y - 0.02 * p.x * p.x);
    let mut pairs = Vec::new();
    for x in [0.0, 20.0, 45.0, 70.0] {
        for y in [0.0, 30.0, 60.0] {
            let p = DVec2::new(x, y);
            pairs.push((p, warp(p)));
        }
    }
    let store = store_from(&pairs);

    let result = solve(TransformationType::Polynomial, 2, &store, &Footprint::default()).unwrap();
    assert!(result.rmse < 1e-6, "rmse {}", result.rmse);
    let probe = DVec2::new(33.0, 17.0);
    assert!((result.transform.apply(probe) - warp(probe)).length() < 1e-6);
}

#[test]
fn ring_list_is_mapped_into_world() {
    let store = store_from(&[
        (DVec2::new(0.0, 0.0), DVec2::new(10.0, 10.0)),
        (DVec2::new(1.0, 0.0), DVec2::new(11.0, 10.0)),
        (DVec2::new(0.0, 1.0), DVec2::new(10.0, 11.0)),
    ]);
    let footprint = Footprint::new(vec![Ring::new(vec![
        DVec2::new(0.0, 0.0),
        DVec2::new(4.0, 0.0),
        DVec2::new(4.0, 2.0),
    ])]);
    let method = create_method(
        TransformationType::Affine,
        1,
        SolverInput::new(&store, &footprint),
    )
    .unwrap();

    let rings = method.compute_ring_list().unwrap();
    assert_eq!(rings.len(), 1);
    let expected = [
        DVec2::new(10.0, 10.0),
        DVec2::new(14.0, 10.0),
        DVec2::new(14.0, 12.0),
    ];
    for (got, want) in rings[0].points.iter().zip(expected) {
        assert!(approx_eq(*got, want), "{got} != {want}");
    }
}

#[test]
fn polynomial_order_is_validated() {
    let store = CorrespondenceStore::new();
    let footprint = Footprint::default();
    for order in [0, 4] {
        let err = create_method(
            TransformationType::Polynomial,
            order,
            SolverInput::new(&store, &footprint),
        )
        .err()
        .unwrap();
        assert!(matches!(err, GeorefError::InputValidation(_)));
    }
}

#[test]
fn transformation_type_names() {
    assert_eq!(TransformationType::default(), TransformationType::Helmert4);
    assert_eq!(
        TransformationType::from_str("AFFINE").unwrap(),
        TransformationType::Affine
    );
    assert_eq!(
        TransformationType::from_str("helmert4").unwrap(),
        TransformationType::Helmert4
    );
    assert!(TransformationType::from_str("projective").is_err());
    assert_eq!(TransformationType::Polynomial.to_string(), "polynomial");
}
