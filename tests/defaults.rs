/// Validate configuring a load test with custom defaults, and rejecting invalid options.
use httpmock::{
    Method::{DELETE, GET},
    MockServer,
};
use serial_test::serial;

mod common;

use gosling::config::GoslingConfiguration;
use gosling::prelude::*;

// Paths used in load tests performed during these tests.
const INDEX_PATH: &str = "/";
const ITEM_PATH: &str = "/item/1";

#[test]
#[serial]
/// Configure the whole load test with defaults.
fn test_defaults() {
    let server = MockServer::start();
    let item = server.mock(|when, then| {
        when.method(DELETE).path(ITEM_PATH);
        then.status(204);
    });

    let url = server.url(ITEM_PATH);
    let gosling_metrics = common::run_load_test(
        *common::build_load_test(GoslingConfiguration::default())
            .set_default(GoslingDefault::Url, url.as_str())
            .unwrap()
            .set_default(GoslingDefault::Method, "delete")
            .unwrap()
            .set_default(GoslingDefault::Requests, 12)
            .unwrap()
            .set_default(GoslingDefault::Concurrency, 3)
            .unwrap(),
    );

    assert_eq!(item.hits(), 12);
    assert_eq!(gosling_metrics.records.len(), 12);
    assert!(gosling_metrics
        .records
        .iter()
        .all(|record| record.code == Some(204)));
}

#[test]
#[serial]
/// Options set on the command line override defaults.
fn test_defaults_overridden() {
    let server = MockServer::start();
    let index = server.mock(|when, then| {
        when.method(GET).path(INDEX_PATH);
        then.status(200);
    });
    let item = server.mock(|when, then| {
        when.method(DELETE).path(ITEM_PATH);
        then.status(204);
    });

    let item_url = server.url(ITEM_PATH);
    let configuration = common::build_configuration(&server, vec!["-n", "2", "-m", "GET"]);
    let gosling_metrics = common::run_load_test(
        *common::build_load_test(configuration)
            .set_default(GoslingDefault::Url, item_url.as_str())
            .unwrap()
            .set_default(GoslingDefault::Method, "DELETE")
            .unwrap()
            .set_default(GoslingDefault::Duration, 60)
            .unwrap(),
    );

    assert_eq!(index.hits(), 2);
    assert_eq!(item.hits(), 0);
    assert_eq!(gosling_metrics.records.len(), 2);
}

#[test]
#[serial]
/// Invalid options are rejected before any request is made.
fn test_invalid_options() {
    let server = MockServer::start();
    let index = server.mock(|when, then| {
        when.method(GET).path(INDEX_PATH);
        then.status(200);
    });

    let invalid = vec![
        vec!["-n", "1", "-d", "1"],
        vec!["-b", "not allowed with GET"],
        vec!["-H", "missing separator"],
        vec!["-m", "CONNECT"],
        vec!["-c", "0"],
        vec!["--timeout", "0"],
        vec!["--timeout", "1e20"],
        vec!["-d", "tomorrow"],
        vec!["-d", "1e20"],
    ];
    for custom in invalid {
        let configuration = common::build_configuration(&server, custom.clone());
        match common::build_load_test(configuration).execute() {
            Err(GoslingError::InvalidOption { .. }) => (),
            other => panic!("{:?} should be invalid, got {:?}", custom, other.is_ok()),
        }
    }

    // The url must be valid.
    let configuration = common::build_configuration(&server, vec!["http://"]);
    assert!(matches!(
        common::build_load_test(configuration).execute(),
        Err(GoslingError::InvalidHost { .. })
    ));

    assert_eq!(index.hits(), 0);
}

#[test]
/// Setting a default with the wrong type of value is an error.
fn test_invalid_default_type() {
    let gosling_attack = GoslingAttack::initialize_with_config(GoslingConfiguration::default())
        .unwrap()
        .set_default(GoslingDefault::Drain, "yes");
    match gosling_attack {
        Err(GoslingError::InvalidOption { detail, .. }) => assert_eq!(
            detail,
            "set_default(GoslingDefault::Drain, yes) expected bool value, received &str"
        ),
        _ => panic!("expected GoslingError::InvalidOption"),
    }
}
