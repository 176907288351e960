//! Engine client round trips against a local mock server.
//!
//! The client is blocking, so each test owns a tokio runtime that only hosts
//! the mock server; requests are made from the test thread.

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use etm_client::config::EngineConfig;
use etm_client::domain::{Carrier, ParameterTable, ScenarioId};
use etm_client::engine::{EngineSession, NewSavedScenario, NewScenario, OrderKind};
use etm_client::error::{AppError, EngineError};
use etm_client::myc::ScenarioPool;
use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ID: ScenarioId = ScenarioId(101);

fn start() -> (Runtime, MockServer) {
    let rt = Runtime::new().unwrap();
    let server = rt.block_on(MockServer::start());
    (rt, server)
}

fn session(server: &MockServer) -> EngineSession {
    EngineSession::new(EngineConfig {
        engine_url: format!("{}/api/v3", server.uri()),
        token: Some("secret".to_string()),
        timeout: Duration::from_secs(5),
        ..EngineConfig::default()
    })
    .unwrap()
}

fn mount(rt: &Runtime, server: &MockServer, mock: Mock) {
    rt.block_on(mock.mount(server));
}

fn merit_order_setting(rt: &Runtime, server: &MockServer, enabled: f64) {
    mount(
        rt,
        server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101/inputs/settings_enable_merit_order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "min": 0.0, "max": 1.0, "default": 1.0, "user": enabled
            }))),
    );
}

#[test]
fn electricity_curves_are_indexed_by_time() {
    let (rt, server) = start();
    merit_order_setting(&rt, &server, 1.0);
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101/curves/merit_order"))
            .respond_with(ResponseTemplate::new(200).set_body_string(common::MERIT_ORDER_CSV))
            .expect(1),
    );

    let curves = session(&server).hourly_curves(ID, Carrier::Electricity).unwrap();

    assert_eq!(curves.n_rows(), 3);
    assert_eq!(curves.index()[0], "2050-01-01 00:00");
    assert_eq!(curves.n_columns(), 3);
    assert!(curves.position("Time").is_none());
    assert_eq!(
        curves.column("households_final_demand_electricity.input (MW)").unwrap(),
        [100.0, 100.0, 110.5]
    );
}

#[test]
fn disabled_merit_order_blocks_electricity_curves() {
    let (rt, server) = start();
    merit_order_setting(&rt, &server, 0.0);
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101/curves/merit_order"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0),
    );

    let err = session(&server).hourly_curves(ID, Carrier::Electricity).unwrap_err();
    assert!(matches!(err, EngineError::MeritOrderDisabled(101)));
}

#[test]
fn heat_curves_skip_the_merit_order_check() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101/curves/heat_network"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Time,a.output (MW)\n0,1.5\n1,2.5\n")),
    );

    let curves = session(&server).hourly_curves(ID, Carrier::Heat).unwrap();
    assert_eq!(curves.column("a.output (MW)").unwrap(), [1.5, 2.5]);
}

#[test]
fn user_values_are_put_on_the_scenario() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/api/v3/scenarios/101"))
            .and(body_json(json!({
                "scenario": {"user_values": {"capacity_of_wind": 1200.0, "share_of_ev": 0.5}},
                "detailed": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"scenario": {"id": 101}})))
            .expect(1),
    );

    let values = BTreeMap::from([
        ("capacity_of_wind".to_string(), 1200.0),
        ("share_of_ev".to_string(), 0.5),
    ]);
    session(&server).set_user_values(ID, &values).unwrap();
}

#[test]
fn unprocessable_entity_lists_engine_errors() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/api/v3/scenarios/101"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "errors": [
                    "Input unknown_key does not exist",
                    "\"heating_households\" group does not balance: group sums to 101.0 using households_heater_gas_share=60.0, households_heater_oil_share=41.0"
                ]
            }))),
    );

    let values = BTreeMap::from([("unknown_key".to_string(), 1.0)]);
    let err = session(&server).set_user_values(ID, &values).unwrap_err();

    let EngineError::Unprocessable(messages) = &err else {
        panic!("expected unprocessable entity, got {err:?}");
    };
    assert_eq!(messages[0], "Input unknown_key does not exist");
    assert!(messages[1].starts_with("Share_group 'heating_households' sums to 101.0"));

    let app: AppError = err.into();
    assert_eq!(app.exit_code(), 4);
    assert!(app.to_string().starts_with("ETEngine returned the following error(s):\n > Input"));
}

#[test]
fn other_statuses_become_status_errors() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101"))
            .respond_with(ResponseTemplate::new(404)),
    );

    let err = session(&server).scenario_header(ID).unwrap_err();
    assert!(matches!(err, EngineError::Status { status, .. } if status.as_u16() == 404));
}

#[test]
fn created_scenario_receives_its_settings() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/api/v3/scenarios"))
            .and(body_json(json!({"scenario": {"area_code": "nl2019", "end_year": 2050}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 101, "area_code": "nl2019", "start_year": 2019, "end_year": 2050
            })))
            .expect(1),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/api/v3/scenarios/101"))
            .and(body_json(json!({"scenario": {"metadata": {"title": "demo"}, "private": true}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 101, "area_code": "nl2019", "end_year": 2050,
                "private": true, "metadata": {"title": "demo"}
            }))),
    );

    let mut metadata = serde_json::Map::new();
    metadata.insert("title".to_string(), json!("demo"));
    let header = session(&server)
        .create_scenario(&NewScenario {
            area_code: "nl2019".to_string(),
            end_year: 2050,
            metadata: Some(metadata),
            private: Some(true),
            ..NewScenario::default()
        })
        .unwrap();

    assert_eq!(header.id, ID);
    assert_eq!(header.private, Some(true));
    assert_eq!(header.metadata["title"], "demo");
}

#[test]
fn copies_reference_the_source_scenario() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/api/v3/scenarios"))
            .and(body_json(json!({"scenario": {"scenario_id": "101"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 202, "end_year": 2050}))),
    );

    let header = session(&server).copy_scenario(ID, None, None, None).unwrap();
    assert_eq!(header.id, ScenarioId(202));
}

#[test]
fn interpolation_requires_a_2050_scenario() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 101, "end_year": 2040}))),
    );

    let err = session(&server).interpolate_scenario(ID, 2030).unwrap_err();
    assert!(matches!(err, EngineError::Invalid(_)));
}

#[test]
fn order_changes_must_reuse_known_items() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101/heat_network_order"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"order": ["boiler", "heat_pump"]}))),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/api/v3/scenarios/101/heat_network_order"))
            .and(body_json(json!({"order": ["heat_pump", "boiler"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"order": ["heat_pump", "boiler"]})))
            .expect(1),
    );

    let session = session(&server);
    let err = session
        .set_order(ID, OrderKind::HeatNetwork, &["geothermal".to_string()])
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOrder { item, .. } if item == "geothermal"));

    session
        .set_order(ID, OrderKind::HeatNetwork, &["heat_pump".to_string(), "boiler".to_string()])
        .unwrap();
}

#[test]
fn custom_curve_upload_sends_a_multipart_file() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/scenarios/101/custom_curves"))
            .and(query_param("include_unattached", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"key": "interconnector_1_price", "attached": false, "overrides": []}
            ]))),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/api/v3/scenarios/101/custom_curves/interconnector_1_price"))
            .and(body_string_contains("name=\"file\""))
            .and(body_string_contains("filename=\"prices.csv\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "key": "interconnector_1_price", "attached": true, "name": "prices.csv", "overrides": []
            })))
            .expect(1),
    );

    let session = session(&server);

    let too_short = session
        .upload_custom_curve(ID, "interconnector_1_price", &[1.0; 10], None)
        .unwrap_err();
    assert!(matches!(too_short, EngineError::Invalid(_)));

    let unknown = session
        .upload_custom_curve(ID, "no_such_curve", &[1.0; 8760], None)
        .unwrap_err();
    assert!(matches!(unknown, EngineError::Invalid(_)));

    let attached = session
        .upload_custom_curve(ID, "interconnector_1_price", &[42.0; 8760], Some("prices.csv"))
        .unwrap();
    assert!(attached.attached);
    assert_eq!(attached.name.as_deref(), Some("prices.csv"));
}

#[test]
fn gquery_results_keep_numbers_and_curves() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/api/v3/scenarios/101"))
            .and(body_json(json!({"gqueries": ["dashboard_co2_emissions"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "scenario": {"id": 101},
                "gqueries": {"dashboard_co2_emissions": {"unit": "MT", "present": 160.5, "future": 12.25}}
            }))),
    );

    let results = session(&server)
        .gquery_results(ID, &["dashboard_co2_emissions"])
        .unwrap();
    assert_eq!(results["dashboard_co2_emissions"].unit, "MT");
}

#[test]
fn myc_pool_applies_every_scenario_column() {
    let (rt, server) = start();
    for (id, value) in [(11, 0.25), (12, 0.75)] {
        mount(
            &rt,
            &server,
            Mock::given(method("PUT"))
                .and(path(format!("/api/v3/scenarios/{id}")))
                .and(body_json(json!({
                    "scenario": {"user_values": {"share_of_ev": value}},
                    "detailed": true
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
                .expect(1),
        );
    }

    let table = ParameterTable::new(
        vec!["share_of_ev".to_string()],
        vec!["11".to_string(), "12".to_string()],
        vec![vec![Some(0.25), Some(0.75)]],
    )
    .unwrap();

    let session = session(&server);
    let pool = ScenarioPool::new(&session, 2).unwrap();
    let ids = pool.apply(&table).unwrap();
    assert_eq!(ids, [ScenarioId(11), ScenarioId(12)]);
}

#[test]
fn myc_pool_collects_user_values_in_id_order() {
    let (rt, server) = start();
    for (id, body) in [
        (11, json!({"share_of_ev": {"default": 0.1, "user": 0.25}, "capacity_of_wind": {"default": 5.0}})),
        (12, json!({"capacity_of_wind": {"default": 5.0, "user": 9.0}, "old_input": {"user": 1.0, "disabled": true}})),
    ] {
        mount(
            &rt,
            &server,
            Mock::given(method("GET"))
                .and(path(format!("/api/v3/scenarios/{id}/inputs")))
                .respond_with(ResponseTemplate::new(200).set_body_json(body)),
        );
    }

    let session = session(&server);
    let pool = ScenarioPool::new(&session, 2).unwrap();
    let ids = [ScenarioId(12), ScenarioId(11)];

    let table = pool.collect(&ids, false, None).unwrap();
    assert_eq!(table.scenarios(), ["12", "11"]);
    assert_eq!(table.keys(), ["capacity_of_wind", "share_of_ev"]);
    assert_eq!(table.get(0, 0), Some(9.0));
    assert_eq!(table.get(0, 1), None);
    assert_eq!(table.get(1, 1), Some(0.25));

    let complete = pool.collect(&ids, true, None).unwrap();
    assert_eq!(complete.get(0, 1), Some(5.0));
}

#[test]
fn myc_pool_downloads_carrier_curves_per_scenario() {
    let (rt, server) = start();
    for (id, value) in [(11, 1.5), (12, 4.0)] {
        mount(
            &rt,
            &server,
            Mock::given(method("GET"))
                .and(path(format!("/api/v3/scenarios/{id}/curves/heat_network")))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!("Time,a.output (MW)\n0,{value}\n")))
                .expect(1),
        );
    }

    let session = session(&server);
    let pool = ScenarioPool::new(&session, 2).unwrap();
    let sets = pool.carrier_curves(&[ScenarioId(12), ScenarioId(11)], Carrier::Heat).unwrap();

    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].column("a.output (MW)").unwrap(), [4.0]);
    assert_eq!(sets[1].column("a.output (MW)").unwrap(), [1.5]);
}

#[test]
fn account_scenarios_follow_every_page() {
    let (rt, server) = start();
    for (page, ids) in [("1", vec![101, 102]), ("2", vec![103])] {
        let data: Vec<_> = ids.iter().map(|id| json!({"id": id, "area_code": "nl2019", "end_year": 2050})).collect();
        mount(
            &rt,
            &server,
            Mock::given(method("GET"))
                .and(path("/api/v3/scenarios"))
                .and(query_param("page", page))
                .and(query_param("limit", "25"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "data": data,
                    "meta": {"total": 3, "total_pages": 2, "current_page": page}
                })))
                .expect(1),
        );
    }

    let scenarios = session(&server).my_scenarios().unwrap();
    let ids: Vec<_> = scenarios.iter().map(|s| s.id).collect();
    assert_eq!(ids, [ScenarioId(101), ScenarioId(102), ScenarioId(103)]);
    assert_eq!(scenarios[2].area_code.as_deref(), Some("nl2019"));
}

#[test]
fn saved_scenarios_list_without_page_meta() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/saved_scenarios"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": 7, "scenario_id": 101, "title": "Regional", "scenario_id_history": [99, 100]}]
            })))
            .expect(1),
    );

    let saved = session(&server).my_saved_scenarios().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title.as_deref(), Some("Regional"));
    assert_eq!(saved[0].scenario_id_history, [ScenarioId(99), ScenarioId(100)]);
}

#[test]
fn saved_scenario_creation_posts_title_and_privacy() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("POST"))
            .and(path("/api/v3/saved_scenarios"))
            .and(body_json(json!({"scenario_id": 101, "title": "Regional", "private": true})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 7, "scenario_id": 101, "title": "Regional", "private": true
            })))
            .expect(1),
    );

    let saved = session(&server)
        .create_saved_scenario(&NewSavedScenario {
            scenario_id: ID,
            title: "Regional".to_string(),
            private: true,
            description: None,
        })
        .unwrap();
    assert_eq!(saved.id, 7);
    assert_eq!(saved.private, Some(true));
}

#[test]
fn saved_scenario_moves_to_a_new_scenario() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/saved_scenarios/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "scenario_id": 101, "scenario_id_history": [100]
            }))),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/api/v3/saved_scenarios/7"))
            .and(body_json(json!({"scenario_id": 102})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "scenario_id": 102, "scenario_id_history": [100, 101]
            })))
            .expect(1),
    );

    let updated = session(&server).to_saved_scenario(7, ScenarioId(102)).unwrap();
    assert_eq!(updated.scenario_id, ScenarioId(102));
    assert_eq!(updated.scenario_id_history, [ScenarioId(100), ScenarioId(101)]);
}

#[test]
fn saved_scenario_rejects_scenarios_from_its_history() {
    let (rt, server) = start();
    mount(
        &rt,
        &server,
        Mock::given(method("GET"))
            .and(path("/api/v3/saved_scenarios/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 7, "scenario_id": 101, "scenario_id_history": [100]
            }))),
    );
    mount(
        &rt,
        &server,
        Mock::given(method("PUT"))
            .and(path("/api/v3/saved_scenarios/7"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0),
    );

    let session = session(&server);
    for id in [100, 101] {
        let err = session.to_saved_scenario(7, ScenarioId(id)).unwrap_err();
        assert!(matches!(err, EngineError::Invalid(_)));
        assert_eq!(AppError::from(err).exit_code(), 2);
    }
}
