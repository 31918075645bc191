use serde_json::{Value, json};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use cvwim::config::{
    Config, HeadwatersInput, ImportanceInput, Inputs, LayerSource, PrecipitationInput, SinkholeInput, SoilInput,
    Stage,
};
use cvwim::readers::read_raster;
use cvwim::workflow::WorkflowRunner;

const ROWS: usize = 8;
const COLS: usize = 8;

/// ASCII grid of 10 m cells covering x 1000..1080, y 2000..2080
fn write_grid<F>(dir: &Path, name: &str, f: F) -> PathBuf
where
    F: Fn(usize, usize) -> f64,
{
    let path = dir.join(name);
    let mut file = File::create(&path).unwrap();
    writeln!(file, "ncols {}\nnrows {}", COLS, ROWS).unwrap();
    writeln!(file, "xllcorner 1000\nyllcorner 2000\ncellsize 10\nNODATA_value -9999").unwrap();
    for row in 0..ROWS {
        let line: Vec<String> = (0..COLS)
            .map(|col| {
                let v = f(row, col);
                if v.is_nan() { "-9999".to_string() } else { v.to_string() }
            })
            .collect();
        writeln!(file, "{}", line.join(" ")).unwrap();
    }
    path
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Value {
    json!({
        "type": "Polygon",
        "coordinates": [[[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]]
    })
}

fn write_layer(dir: &Path, name: &str, features: Vec<(Value, Value)>) -> PathBuf {
    let features: Vec<Value> = features
        .into_iter()
        .map(|(geometry, properties)| json!({ "type": "Feature", "properties": properties, "geometry": geometry }))
        .collect();
    let path = dir.join(name);
    fs::write(&path, json!({ "type": "FeatureCollection", "features": features }).to_string()).unwrap();
    path
}

/// Study area whose soils, headwaters, karst, sinkholes, rainfall and
/// resources all come from vector layers. West is x < 1040, north is y > 2040.
fn vector_study_area(dir: &Path) -> Inputs {
    let elevation = write_grid(dir, "elev.asc", |r, c| 300.0 + (c * c) as f64 * 0.6 + (r * r) as f64 * 0.3);
    let r_factor = write_grid(dir, "rfactor.asc", |r, c| 150.0 + (r * 3 + c) as f64);
    let flow_length = write_grid(dir, "flowlen.asc", |r, c| ((r + c) * 40) as f64);
    // Last row lies outside the processing area
    let process_mask = write_grid(dir, "procmask.asc", |r, _| if r < ROWS - 1 { 1.0 } else { f64::NAN });
    let conservation = write_grid(dir, "cons.asc", |_, c| if c < 4 { 1.0 } else { f64::NAN });
    let restoration = write_grid(dir, "rest.asc", |r, _| if r < 4 { 1.0 } else { 0.0 });

    let soils_west = write_layer(
        dir,
        "soils_va.geojson",
        vec![(
            rect(1000.0, 2000.0, 1040.0, 2080.0),
            json!({ "MUKEY": "1", "HYDROLGRP_DCD": "B", "KFACTWS_DCD": "0.28" }),
        )],
    );
    let soils_east = write_layer(
        dir,
        "soils_wv.geojson",
        vec![(
            rect(1040.0, 2000.0, 1080.0, 2080.0),
            json!({ "MUKEY": "2", "HYDROLGRP_DCD": "C/D", "KFACTWS_DCD": "0.43" }),
        )],
    );
    let soils = vec![soils_west, soils_east];

    let pmp = write_layer(
        dir,
        "pmp_points.geojson",
        vec![
            (json!({ "type": "Point", "coordinates": [1005.0, 2075.0] }), json!({ "PMP": 24.0 })),
            (json!({ "type": "Point", "coordinates": [1075.0, 2005.0] }), json!({ "PMP": 30.0 })),
        ],
    );

    let flowlines = write_layer(
        dir,
        "flowlines.geojson",
        vec![
            (
                json!({ "type": "LineString", "coordinates": [[1020.0, 2080.0], [1020.0, 2000.0]] }),
                json!({ "NHDPlusID": 60000200012345i64, "StartFlag": 1 }),
            ),
            (
                json!({ "type": "LineString", "coordinates": [[1060.0, 2080.0], [1060.0, 2000.0]] }),
                json!({ "NHDPlusID": 60000200012346i64, "StartFlag": 0 }),
            ),
        ],
    );
    let catchments = write_layer(
        dir,
        "catchments.geojson",
        vec![
            (rect(1000.0, 2000.0, 1040.0, 2080.0), json!({ "NHDPlusID": 60000200012345i64 })),
            (rect(1040.0, 2000.0, 1080.0, 2080.0), json!({ "NHDPlusID": 60000200012346i64 })),
        ],
    );
    let boundary = write_layer(dir, "huc12.geojson", vec![(rect(990.0, 1990.0, 1090.0, 2090.0), json!({}))]);

    let karst = write_layer(
        dir,
        "karst.geojson",
        vec![(rect(1000.0, 2060.0, 1020.0, 2080.0), json!({ "ROCKTYPE": "limestone" }))],
    );
    let sinkholes = write_layer(
        dir,
        "sinkholes.geojson",
        vec![
            (rect(1050.0, 2010.0, 1070.0, 2030.0), json!({ "SqMeters": 400.0 })),
            (rect(1005.0, 2045.0, 1035.0, 2075.0), json!({ "SqMeters": 900.0 })),
        ],
    );

    let streams = write_layer(dir, "streams.geojson", vec![(rect(1000.0, 2000.0, 1080.0, 2080.0), json!({}))]);
    let wells = write_layer(dir, "wells.geojson", vec![(rect(1000.0, 2040.0, 1080.0, 2080.0), json!({}))]);

    let mut inputs = Inputs::new(elevation);
    inputs.r_factor = Some(r_factor);
    inputs.k_factor = Some(SoilInput::Soils(soils.clone()));
    inputs.hydro_group = Some(SoilInput::Soils(soils));
    inputs.precipitation = Some(PrecipitationInput::Points {
        path: pmp,
        field: "PMP".to_string(),
    });
    inputs.process_mask = Some(process_mask);
    inputs.flow_length = Some(flow_length);
    inputs.headwaters = Some(HeadwatersInput::Vector {
        flowlines,
        catchments,
        boundary,
    });
    inputs.karst = Some(LayerSource::Vector(karst));
    inputs.sinkholes = Some(SinkholeInput {
        path: sinkholes,
        area_field: "SqMeters".to_string(),
    });
    inputs.importance = Some(vec![
        ImportanceInput {
            path: streams,
            weight: 1.0,
        },
        ImportanceInput {
            path: wells,
            weight: 2.0,
        },
    ]);
    inputs.conservation_mask = Some(conservation);
    inputs.restoration_mask = Some(restoration);
    inputs
}

fn product(out: &Path, name: &str) -> cvwim::Raster {
    read_raster(out.join(format!("{}.tif", name))).unwrap()
}

#[test]
fn test_vector_inputs_drive_every_stage() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let config = Config::new(&out, vector_study_area(dir.path()));

    let manifest = WorkflowRunner::new(config).unwrap().run().unwrap();
    assert_eq!(manifest.stages, Stage::ALL.to_vec());
    for record in &manifest.products {
        assert_eq!(record.path.extension().unwrap(), "tif");
    }

    // Soils burned per survey area and merged
    let k = product(&out, "rusleK");
    assert!((k.get(0, 0).unwrap() - 0.28).abs() < 1e-9);
    assert!((k.get(5, 7).unwrap() - 0.43).abs() < 1e-9);
    let hydro = product(&out, "HydroGrp");
    assert_eq!(hydro.get(2, 1).unwrap(), 2.0);
    assert_eq!(hydro.get(2, 6).unwrap(), 4.0);
    let cn = product(&out, "curvNum_bare");
    assert_eq!(cn.get(2, 1).unwrap(), 86.0);
    assert_eq!(cn.get(2, 6).unwrap(), 94.0);

    // Rainfall interpolated from the two points
    let precip = product(&out, "maxPrecip");
    let near_wet = precip.get(7, 7).unwrap();
    let near_dry = precip.get(0, 0).unwrap();
    assert!(near_dry >= 24.0 && near_wet <= 30.0);
    assert!(near_wet > near_dry);

    // Headwaters joined from flowlines and limited to the processing area
    let hw = product(&out, "Hdwtrs");
    assert_eq!(hw.get(0, 0).unwrap(), 1.0);
    assert_eq!(hw.get(0, 7).unwrap(), 0.0);
    assert!(hw.get(ROWS - 1, 0).unwrap().is_nan());
    assert!(product(&out, "FlowScore").get(ROWS - 1, 3).unwrap().is_nan());
    assert!(product(&out, "soilSens_Score_bare").get(ROWS - 1, 3).unwrap().is_nan());

    // Karst polygon covers the north-west 2 x 2 cells
    let karst = product(&out, "karst_Raster");
    assert_eq!(karst.get(0, 0).unwrap(), 1.0);
    assert_eq!(karst.get(1, 1).unwrap(), 1.0);
    assert!(karst.get(3, 3).unwrap().is_nan());
    assert!((product(&out, "karst_distScore").get(0, 0).unwrap() - 100.0).abs() < 1e-9);
    // Sinkhole density is too low to rescale, so its score is 1 everywhere
    assert!(product(&out, "sinkScore").valid_values().all(|v| v == 1.0));
    assert!((product(&out, "KarstScore").get(0, 0).unwrap() - 50.5).abs() < 1e-9);

    // Weighted overlap count: streams everywhere, wells (x2) in the north
    let importance = product(&out, "ImportanceScore");
    assert!((importance.get(0, 0).unwrap() - 100.0).abs() < 1e-9);
    assert!((importance.get(7, 0).unwrap() - 100.0 / 3.0).abs() < 1e-9);

    let general = product(&out, "genPriority");
    let impact = product(&out, "ImpactScore");
    let expected = impact.get(6, 2).unwrap() / 3.0;
    assert!((general.get(6, 2).unwrap() - expected).abs() < 1e-9);

    let cons = product(&out, "consPriority");
    assert!(!cons.get(0, 0).unwrap().is_nan());
    assert!(cons.get(0, 7).unwrap().is_nan());
    let rest = product(&out, "restPriority");
    assert!(!rest.get(0, 7).unwrap().is_nan());
    assert!(rest.get(6, 0).unwrap().is_nan());
    assert!(manifest.product("mgmtPriority").is_none());
}

#[test]
fn test_geotiff_products_read_back_by_later_run() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");

    let mut first = Config::new(&out, vector_study_area(dir.path()));
    first
        .set_stages(vec![Stage::SoilLoss, Stage::Runoff, Stage::SoilSensitivity, Stage::Flow, Stage::Karst])
        .unwrap();
    WorkflowRunner::new(first).unwrap().run().unwrap();
    let karst_first = product(&out, "KarstScore");

    let mut second = Config::new(&out, vector_study_area(dir.path()));
    second
        .set_stages(vec![Stage::Position, Stage::Impact, Stage::Priority])
        .unwrap();
    let manifest = WorkflowRunner::new(second).unwrap().run().unwrap();

    assert!(manifest.product("KarstScore").is_none());
    assert!(manifest.product("genPriority_slice").is_some());

    // Position is the cell maximum of the flow and karst scores read from disk
    let position = product(&out, "PositionScore");
    let flow = product(&out, "FlowScore");
    let (r, c) = (3, 3);
    let expected = flow.get(r, c).unwrap().max(karst_first.get(r, c).unwrap());
    assert!((position.get(r, c).unwrap() - expected).abs() < 1e-9);
}
