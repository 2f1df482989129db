mod common;

use common::{assert_close, strip};
use dasymetric::{
    constrained_allocate, ClassRule, Error, Layer, Options, OutputNaming, PlanarOverlay, ThresholdMap,
    UnlistedClass,
};
use polars::df;

fn single_source(value: f64, width: f64) -> Layer {
    let data = df!("id" => ["s1"], "pop" => [value]).unwrap();
    Layer::new("source", vec![strip(0.0, width)], data, "id").unwrap()
}

#[test]
fn worked_example_caps_then_fills_unconstrained() {
    let source = single_source(100.0, 10.0);
    let regions = Layer::new(
        "regions",
        vec![strip(0.0, 3.0), strip(3.0, 10.0)],
        df!("rid" => ["A", "B"], "landuse" => ["urban", "park"]).unwrap(),
        "rid",
    ).unwrap();
    let thresholds = ThresholdMap::from_json(r#"{"urban": 2, "park": null}"#).unwrap();

    let outcome = constrained_allocate(
        &source, &regions, "landuse", &thresholds, &["pop"], &Options::default(), &PlanarOverlay::default(),
    ).unwrap();

    let table = &outcome.table;
    assert_eq!(table.len(), 2);
    assert_close(table.value("s1", "A", "pop").unwrap(), 6.0);
    assert_close(table.value("s1", "B", "pop").unwrap(), 94.0);
    assert_close(table.source_total("s1", "pop").unwrap(), 100.0);
    assert!(outcome.diagnostics.is_clean());
}

#[test]
fn classes_are_processed_lowest_threshold_first_whatever_the_map_order() {
    let source = single_source(90.0, 12.0);
    let regions = Layer::new(
        "regions",
        vec![strip(0.0, 4.0), strip(4.0, 8.0), strip(8.0, 12.0)],
        df!("rid" => ["ra", "rb", "rc"], "class" => ["A", "B", "C"]).unwrap(),
        "rid",
    ).unwrap();

    for json in [
        r#"{"A": 5, "B": 1, "C": 10}"#,
        r#"{"C": 10, "B": 1, "A": 5}"#,
        r#"{"B": 1, "C": 10, "A": 5}"#,
    ] {
        let thresholds = ThresholdMap::from_json(json).unwrap();
        let outcome = constrained_allocate(
            &source, &regions, "class", &thresholds, &["pop"], &Options::default(), &PlanarOverlay::default(),
        ).unwrap();

        // B takes 4 of its 30 share, A then takes 20 of 43, C takes 40 of 66
        assert_close(outcome.table.value("s1", "rb", "pop").unwrap(), 4.0);
        assert_close(outcome.table.value("s1", "ra", "pop").unwrap(), 20.0);
        assert_close(outcome.table.value("s1", "rc", "pop").unwrap(), 40.0);

        // no unconstrained class: the rest is lost capacity, reported not dropped
        assert_eq!(outcome.diagnostics.residuals.len(), 1);
        assert_close(outcome.diagnostics.unallocated("pop"), 26.0);
        assert!(outcome.diagnostics.failures.is_empty());
    }
}

fn two_sources() -> Layer {
    let data = df!("id" => ["s1", "s2"], "pop" => [100.0, 50.0], "hh" => [40.0, 10.0]).unwrap();
    Layer::new("source", vec![strip(0.0, 10.0), strip(10.0, 20.0)], data, "id").unwrap()
}

#[test]
fn value_is_conserved_and_caps_hold_with_enough_capacity() {
    let source = two_sources();
    let regions = Layer::new(
        "regions",
        vec![strip(0.0, 5.0), strip(5.0, 15.0), strip(15.0, 20.0)],
        df!("rid" => ["r1", "r2", "r3"], "class" => ["res", "park", "res"]).unwrap(),
        "rid",
    ).unwrap();
    let thresholds: ThresholdMap = [("res", ClassRule::Threshold(4.0)), ("park", ClassRule::Unconstrained)]
        .into_iter()
        .collect();

    let outcome = constrained_allocate(
        &source, &regions, "class", &thresholds, &["pop", "hh"], &Options::default(), &PlanarOverlay::default(),
    ).unwrap();
    let table = &outcome.table;

    assert_eq!(table.len(), 4);
    assert_close(table.value("s1", "r1", "pop").unwrap(), 20.0);
    assert_close(table.value("s1", "r2", "pop").unwrap(), 80.0);
    assert_close(table.value("s2", "r3", "pop").unwrap(), 20.0);
    assert_close(table.value("s2", "r2", "pop").unwrap(), 30.0);
    // hh stays below the cap: plain areal shares
    assert_close(table.value("s1", "r1", "hh").unwrap(), 20.0);
    assert_close(table.value("s2", "r3", "hh").unwrap(), 5.0);

    for (source_id, attribute, expected) in [("s1", "pop", 100.0), ("s2", "pop", 50.0), ("s1", "hh", 40.0), ("s2", "hh", 10.0)] {
        assert_close(table.source_total(source_id, attribute).unwrap(), expected);
    }
    for row in table.rows().iter().filter(|row| row.class.as_deref() == Some("res")) {
        for &value in &row.values {
            assert!(value <= 4.0 * row.area + 1e-9);
        }
    }
    assert!(outcome.diagnostics.is_clean());
}

fn water_regions() -> Layer {
    Layer::new(
        "regions",
        vec![strip(0.0, 10.0), strip(10.0, 20.0)],
        df!("rid" => ["r1", "r2"], "class" => ["res", "water"]).unwrap(),
        "rid",
    ).unwrap()
}

#[test]
fn unlisted_class_fails_only_its_source_unit() {
    let thresholds = ThresholdMap::from_json(r#"{"res": null}"#).unwrap();
    let outcome = constrained_allocate(
        &two_sources(), &water_regions(), "class", &thresholds, &["pop"], &Options::default(), &PlanarOverlay::default(),
    ).unwrap();

    assert_eq!(outcome.table.len(), 1);
    assert_close(outcome.table.value("s1", "r1", "pop").unwrap(), 100.0);

    assert_eq!(outcome.diagnostics.failures.len(), 1);
    match &outcome.diagnostics.failures[0] {
        Error::UnclassifiedRegion { source_id, region, class } => {
            assert_eq!((source_id.as_str(), region.as_str(), class.as_str()), ("s2", "r2", "water"));
        }
        other => panic!("unexpected failure {other:?}"),
    }
}

#[test]
fn strict_mode_aborts_on_the_first_failed_unit() {
    let thresholds = ThresholdMap::from_json(r#"{"res": null}"#).unwrap();
    let result = constrained_allocate(
        &two_sources(), &water_regions(), "class", &thresholds, &["pop"], &Options::default().strict(), &PlanarOverlay::default(),
    );
    assert!(matches!(result, Err(Error::UnclassifiedRegion { .. })));
}

#[test]
fn excluded_classes_receive_nothing_and_surface_as_residuals() {
    let thresholds = ThresholdMap::from_json(r#"{"res": null}"#).unwrap();
    let options = Options::default().with_unlisted(UnlistedClass::Exclude);
    let outcome = constrained_allocate(
        &two_sources(), &water_regions(), "class", &thresholds, &["pop"], &options, &PlanarOverlay::default(),
    ).unwrap();

    assert_eq!(outcome.table.value("s2", "r2", "pop"), Some(0.0));
    assert!(outcome.diagnostics.failures.is_empty());
    assert_eq!(outcome.diagnostics.residuals.len(), 1);
    assert_eq!(outcome.diagnostics.residuals[0].source_id, "s2");
    assert_close(outcome.diagnostics.residuals[0].unallocated, 50.0);
}

#[test]
fn unlisted_classes_can_join_the_unconstrained_split() {
    let thresholds = ThresholdMap::from_json(r#"{"res": 1}"#).unwrap();
    let options = Options::default().with_unlisted(UnlistedClass::Unconstrained);
    let outcome = constrained_allocate(
        &two_sources(), &water_regions(), "class", &thresholds, &["pop"], &options, &PlanarOverlay::default(),
    ).unwrap();

    assert_close(outcome.table.value("s1", "r1", "pop").unwrap(), 10.0);
    assert_close(outcome.table.value("s2", "r2", "pop").unwrap(), 50.0);
    // s1 has only a capped region: 90 lost
    assert_close(outcome.diagnostics.unallocated("pop"), 90.0);
}

#[test]
fn missing_value_column_fails_the_whole_call() {
    let thresholds = ThresholdMap::from_json(r#"{"res": null}"#).unwrap();
    let result = constrained_allocate(
        &two_sources(), &water_regions(), "class", &thresholds, &["jobs"], &Options::default(), &PlanarOverlay::default(),
    );
    assert!(matches!(result, Err(Error::MissingColumn { ref column, .. }) if column == "jobs"));

    let result = constrained_allocate(
        &two_sources(), &water_regions(), "landuse", &thresholds, &["pop"], &Options::default(), &PlanarOverlay::default(),
    );
    assert!(matches!(result, Err(Error::MissingColumn { ref layer, .. }) if layer == "regions"));
}

#[test]
fn output_frame_uses_the_naming_option() {
    let thresholds = ThresholdMap::from_json(r#"{"res": null, "water": 0}"#).unwrap();
    let options = Options::default().with_naming(OutputNaming::Suffix("_lv".into()));
    let outcome = constrained_allocate(
        &two_sources(), &water_regions(), "class", &thresholds, &["pop", "hh"], &options, &PlanarOverlay::default(),
    ).unwrap();

    let df = outcome.table.to_dataframe().unwrap();
    assert_eq!(df.height(), 2);
    let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
    assert_eq!(names, vec!["source_id", "region_id", "class", "area", "pop_lv", "hh_lv"]);

    let pop = df.column("pop_lv").unwrap().f64().unwrap();
    assert_eq!(pop.null_count(), 0);
    assert!(pop.into_iter().flatten().all(f64::is_finite));

    let csv = outcome.table.to_csv_string().unwrap();
    assert!(csv.starts_with("source_id,region_id,class,area,pop_lv,hh_lv"));
}
