use gumdrop::Options;
use httpmock::MockServer;
use std::io;

use gosling::config::GoslingConfiguration;
use gosling::metrics::GoslingMetrics;
use gosling::report::CsvReporter;
use gosling::GoslingAttack;

/// Not all functions are used by all tests, so we enable allow(dead_code) to avoid
/// compiler warnings during testing.

/// The following options are configured by default, if not set to a custom value:
///  <mock-server>/
///  -n 1
pub fn build_configuration(server: &MockServer, custom: Vec<&str>) -> GoslingConfiguration {
    // Start with an empty configuration.
    let mut configuration: Vec<&str> = vec![];
    // Declare server_url here no matter what, so its lifetime is sufficient when needed.
    let server_url = server.url("/");

    // Merge in all custom options first.
    configuration.extend_from_slice(&custom);

    // Default to load testing the mock server if no url is configured.
    if !configuration.iter().any(|option| option.contains("://")) {
        configuration.push(&server_url);
    }

    // Default to making a single request if no stop condition is configured.
    if !configuration.contains(&"-n") && !configuration.contains(&"-d") {
        configuration.extend_from_slice(&["-n", "1"]);
    }

    // Parse these options to generate a GoslingConfiguration.
    GoslingConfiguration::parse_args_default(&configuration)
        .expect("failed to parse options and generate a configuration")
}

/// Create a GoslingAttack from the configuration, discarding its report.
pub fn build_load_test(configuration: GoslingConfiguration) -> GoslingAttack {
    GoslingAttack::initialize_with_config(configuration)
        .unwrap()
        .set_reporter(Box::new(CsvReporter::new(io::sink())))
}

/// Run the actual load test, returning the GoslingMetrics.
pub fn run_load_test(gosling_attack: GoslingAttack) -> GoslingMetrics {
    // Execute the load test.
    gosling_attack.execute().unwrap()
}
