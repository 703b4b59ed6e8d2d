use chart_graph::api::{
    BandingDescriptor, STYLE_JSON_SCHEMA_V1, StyleDescriptor, TargetDef, TrendStyle,
};
use chart_graph::core::{Axis, Color, TargetStrategy, TrendFit};
use chart_graph::ChartError;

fn styled() -> StyleDescriptor {
    let mut style = StyleDescriptor::default();
    style.plot.stack_values = true;
    style.plot.waterfall_total_label = "Grand total".to_owned();
    style.y_axis.log = true;
    style.trend = Some(TrendStyle {
        fit: TrendFit::Exponential,
        ..TrendStyle::default()
    });
    style.targets.push(TargetDef {
        measure: Some("Sum(Sales)".to_owned()),
        strategy: TargetStrategy::Percentile(90.0),
        label: Some("P90".to_owned()),
        color: Color::BLACK,
    });
    style.banding = Some(BandingDescriptor {
        axis: Axis::Y,
        colors: vec![Color::GRAY],
    });
    style
        .formats
        .insert("Sum(Sales)".to_owned(), "#,##0.00".to_owned());
    style
}

#[test]
fn style_json_roundtrip() {
    let style = styled();
    let json = style
        .to_json_pretty()
        .expect("style should serialize to json");
    let restored = StyleDescriptor::from_json_str(&json).expect("style should deserialize");
    assert_eq!(restored, style);
}

#[test]
fn missing_fields_take_defaults() {
    let style = StyleDescriptor::from_json_str("{\"plot\": {\"sparkline\": true}}")
        .expect("partial style should deserialize");
    assert!(style.plot.sparkline);
    assert!(style.plot.fill_gaps);
    assert_eq!(style.plot.waterfall_total_label, "Total");
    assert_eq!(style.palette, StyleDescriptor::default().palette);
}

#[test]
fn contract_v1_carries_schema_version() {
    let json = styled()
        .to_json_contract_v1_pretty()
        .expect("contract should serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(
        value["schema_version"].as_u64(),
        Some(u64::from(STYLE_JSON_SCHEMA_V1))
    );

    let restored = StyleDescriptor::from_json_compat_str(&json).expect("contract should load");
    assert_eq!(restored, styled());
}

#[test]
fn compat_loader_accepts_bare_style() {
    let json = styled().to_json_pretty().expect("serialize");
    let restored = StyleDescriptor::from_json_compat_str(&json).expect("bare style should load");
    assert_eq!(restored, styled());
}

#[test]
fn unknown_schema_version_is_rejected() {
    let json = "{\"schema_version\": 99, \"style\": {}}";
    let err = StyleDescriptor::from_json_compat_str(json).expect_err("unsupported version");
    assert!(matches!(err, ChartError::InvalidStyle(message) if message.contains("99")));
}

#[test]
fn out_of_range_color_fails_validation() {
    let json = "{\"palette\": [{\"red\": 2.0, \"green\": 0.0, \"blue\": 0.0}]}";
    let err = StyleDescriptor::from_json_str(json).expect_err("invalid color");
    assert!(err.is_configuration_error());
}

#[test]
fn empty_palette_fails_validation() {
    let mut style = StyleDescriptor::default();
    style.palette.clear();
    assert!(matches!(style.validate(), Err(ChartError::InvalidStyle(_))));
}

#[test]
fn percentile_target_must_be_in_range() {
    let mut style = StyleDescriptor::default();
    style.targets.push(TargetDef {
        measure: None,
        strategy: TargetStrategy::Percentile(120.0),
        label: None,
        color: Color::ACCENT,
    });
    assert!(style.validate().is_err());
}
